//! One run of the notification pipeline per database event.
//!
//! decode -> resolve -> filter -> compose -> fan-out. Every failure is
//! local to the run: it is logged, reported as a [`DispatchOutcome`] and
//! never retried.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::Instrument;
use uuid::Uuid;
use zapnotify_core::access::AccessFilter;
use zapnotify_core::composer::MessageComposer;
use zapnotify_core::error::{ComposeError, DecodeError, ResolveError};
use zapnotify_core::identity::resolve_identity;
use zapnotify_core::payload::decode_payload;
use zapnotify_relay::{PublishReport, RelayPublisher};

/// How a single dispatch ended.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// The payload was not valid notification JSON.
    DecodeFailed(DecodeError),
    /// The recipient identifier could not be resolved.
    Unresolvable(ResolveError),
    /// The access filter declined the recipient. Not an error.
    Filtered,
    /// Secret derivation, encryption or signing failed.
    ComposeFailed(ComposeError),
    /// The envelope was handed to the relays; see the report for results.
    Delivered(PublishReport),
}

/// Something that consumes raw notification payloads.
#[async_trait]
pub trait NotificationHandler: Send + Sync {
    async fn handle(&self, payload: String);
}

/// The notification pipeline.
pub struct Dispatcher {
    filter: Arc<dyn AccessFilter>,
    composer: Arc<dyn MessageComposer>,
    publisher: Arc<RelayPublisher>,
}

impl Dispatcher {
    pub fn new(
        filter: Arc<dyn AccessFilter>,
        composer: Arc<dyn MessageComposer>,
        publisher: Arc<RelayPublisher>,
    ) -> Self {
        Self {
            filter,
            composer,
            publisher,
        }
    }

    /// Run the pipeline for one raw payload.
    pub async fn dispatch(&self, payload: &str) -> DispatchOutcome {
        let dispatch_id = Uuid::now_v7();
        self.run(payload)
            .instrument(tracing::info_span!("dispatch", %dispatch_id))
            .await
    }

    async fn run(&self, payload: &str) -> DispatchOutcome {
        let descriptor = match decode_payload(payload) {
            Ok(descriptor) => descriptor,
            Err(e) => {
                tracing::warn!(error = %e, raw_payload = %payload, "Dropping undecodable notification");
                return DispatchOutcome::DecodeFailed(e);
            }
        };

        let recipient = match resolve_identity(&descriptor) {
            Ok(recipient) => recipient,
            Err(e) => {
                tracing::warn!(error = %e, "Dropping notification with unresolvable recipient");
                return DispatchOutcome::Unresolvable(e);
            }
        };

        if !self.filter.allowed(&recipient) {
            tracing::debug!(recipient = %recipient, "Recipient not eligible, skipping");
            return DispatchOutcome::Filtered;
        }

        let envelope = match self.composer.compose(&recipient, descriptor.amount_sats) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(recipient = %recipient, error = %e, "Failed to compose notification");
                return DispatchOutcome::ComposeFailed(e);
            }
        };

        tracing::info!(
            recipient = %recipient,
            amount_sats = descriptor.amount_sats,
            event_id = %envelope.id_hex(),
            "Sending payment notification",
        );

        let report = self.publisher.publish(&envelope).await;
        if report.succeeded() == 0 {
            tracing::warn!(event_id = %envelope.id_hex(), "No relay accepted the notification");
        }
        DispatchOutcome::Delivered(report)
    }
}

#[async_trait]
impl NotificationHandler for Dispatcher {
    async fn handle(&self, payload: String) {
        self.dispatch(&payload).await;
    }
}
