//! Shared fakes for worker integration tests.
#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use nostr::Keys;
use tokio::sync::mpsc;
use zapnotify_core::access::{AccessFilter, AllowAll, AllowList};
use zapnotify_core::composer::{MessageComposer, MessageEnvelope, Nip04Composer};
use zapnotify_core::error::ComposeError;
use zapnotify_core::keys::ServiceIdentity;
use zapnotify_core::types::{AmountSats, CanonicalIdentity};
use zapnotify_db::NotificationSource;
use zapnotify_relay::{RelayConnector, RelayError, RelayPool, RelayPublisher, RelaySession};
use zapnotify_worker::dispatch::Dispatcher;

pub const A: &str = "wss://a.example";
pub const B: &str = "wss://b.example";
pub const C: &str = "wss://c.example";

/// Records every connect and every published envelope.
#[derive(Default)]
pub struct RecordingConnector {
    failing: HashSet<String>,
    pub connects: Mutex<Vec<String>>,
    pub published: Arc<Mutex<Vec<(String, MessageEnvelope)>>>,
}

impl RecordingConnector {
    pub fn failing(urls: &[&str]) -> Self {
        Self {
            failing: urls.iter().map(|u| u.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn publish_count(&self) -> usize {
        self.published.lock().unwrap().len()
    }

    pub fn published_urls(&self) -> Vec<String> {
        let mut urls: Vec<_> = self
            .published
            .lock()
            .unwrap()
            .iter()
            .map(|(url, _)| url.clone())
            .collect();
        urls.sort();
        urls
    }

    pub fn envelopes(&self) -> Vec<MessageEnvelope> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .map(|(_, e)| e.clone())
            .collect()
    }
}

#[async_trait]
impl RelayConnector for RecordingConnector {
    async fn connect(&self, url: &str) -> Result<Arc<dyn RelaySession>, RelayError> {
        self.connects.lock().unwrap().push(url.to_string());
        if self.failing.contains(url) {
            return Err(RelayError::Connect {
                url: url.to_string(),
                reason: "connection refused".into(),
            });
        }
        Ok(Arc::new(RecordingSession {
            url: url.to_string(),
            published: Arc::clone(&self.published),
        }))
    }
}

struct RecordingSession {
    url: String,
    published: Arc<Mutex<Vec<(String, MessageEnvelope)>>>,
}

#[async_trait]
impl RelaySession for RecordingSession {
    fn url(&self) -> &str {
        &self.url
    }

    fn is_connected(&self) -> bool {
        true
    }

    async fn publish(&self, envelope: &MessageEnvelope) -> Result<(), RelayError> {
        self.published
            .lock()
            .unwrap()
            .push((self.url.clone(), envelope.clone()));
        Ok(())
    }

    async fn close(&self) {}
}

/// Counts composer invocations while delegating to the real NIP-04 composer.
pub struct CountingComposer {
    inner: Nip04Composer,
    pub calls: AtomicUsize,
}

impl CountingComposer {
    pub fn new(identity: Arc<ServiceIdentity>) -> Self {
        Self {
            inner: Nip04Composer::new(identity),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl MessageComposer for CountingComposer {
    fn compose(
        &self,
        recipient: &CanonicalIdentity,
        amount_sats: AmountSats,
    ) -> Result<MessageEnvelope, ComposeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.compose(recipient, amount_sats)
    }
}

/// A fully wired dispatcher plus handles on its fakes.
pub struct Harness {
    pub dispatcher: Dispatcher,
    pub connector: Arc<RecordingConnector>,
    pub composer: Arc<CountingComposer>,
    pub service_keys: Keys,
}

pub fn harness(connector: RecordingConnector, filter: Arc<dyn AccessFilter>) -> Harness {
    let service_keys = Keys::generate();
    let identity = Arc::new(ServiceIdentity::from_keys(service_keys.clone()));
    let connector = Arc::new(connector);
    let composer = Arc::new(CountingComposer::new(identity));

    let urls = [A, B, C].iter().map(|u| u.to_string()).collect();
    let pool = Arc::new(RelayPool::new(urls, Arc::clone(&connector) as Arc<dyn RelayConnector>));
    let publisher = Arc::new(RelayPublisher::new(pool, Duration::from_secs(10)));

    Harness {
        dispatcher: Dispatcher::new(
            filter,
            Arc::clone(&composer) as Arc<dyn MessageComposer>,
            publisher,
        ),
        connector,
        composer,
        service_keys,
    }
}

pub fn allow_all() -> Arc<dyn AccessFilter> {
    Arc::new(AllowAll)
}

pub fn allow_only(identities: &[&str]) -> Arc<dyn AccessFilter> {
    Arc::new(AllowList::new(identities).unwrap())
}

/// Channel-backed notification source; closes when the sender is dropped.
pub struct ChannelSource(pub mpsc::UnboundedReceiver<String>);

#[async_trait]
impl NotificationSource for ChannelSource {
    async fn next_payload(&mut self) -> Option<String> {
        self.0.recv().await
    }
}

pub fn payload(pubkey: &str, amount: u64) -> String {
    format!(r#"{{"Is_npub": false, "Pubkey": "{pubkey}", "Amount": {amount}}}"#)
}
