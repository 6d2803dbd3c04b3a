//! Best-effort fan-out of one envelope to every configured relay.
//!
//! Endpoints are attempted concurrently and independently. A single
//! deadline, shared by all endpoints, gates whether new connect or publish
//! attempts start; it does not recall frames already written to a socket.
//! Partial success counts as success: the caller only gets a report.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::time::Instant;
use zapnotify_core::composer::MessageEnvelope;

use crate::error::RelayError;
use crate::pool::RelayPool;

/// Default overall deadline for one dispatch.
pub const DEFAULT_DISPATCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest deadline a publisher will honour; larger timeouts are clamped.
pub const MAX_DISPATCH_TIMEOUT: Duration = Duration::from_secs(3600);

/// What happened at one endpoint.
#[derive(Debug)]
pub enum EndpointOutcome {
    Published,
    ConnectFailed(RelayError),
    PublishFailed(RelayError),
    /// The deadline passed before an attempt could start or complete.
    DeadlineExceeded,
}

#[derive(Debug)]
pub struct EndpointReport {
    pub url: String,
    pub outcome: EndpointOutcome,
}

/// Per-endpoint results of one fan-out, in configured endpoint order.
#[derive(Debug, Default)]
pub struct PublishReport {
    pub endpoints: Vec<EndpointReport>,
}

impl PublishReport {
    /// Endpoints that acknowledged the event.
    pub fn succeeded(&self) -> usize {
        self.endpoints
            .iter()
            .filter(|r| matches!(r.outcome, EndpointOutcome::Published))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.endpoints.len() - self.succeeded()
    }

    pub fn outcome_for(&self, url: &str) -> Option<&EndpointOutcome> {
        self.endpoints
            .iter()
            .find(|r| r.url == url)
            .map(|r| &r.outcome)
    }
}

/// Publishes envelopes through a shared [`RelayPool`].
pub struct RelayPublisher {
    pool: Arc<RelayPool>,
    timeout: Duration,
}

impl RelayPublisher {
    pub fn new(pool: Arc<RelayPool>, timeout: Duration) -> Self {
        Self {
            pool,
            timeout: timeout.min(MAX_DISPATCH_TIMEOUT),
        }
    }

    /// Deliver `envelope` to every endpoint within the dispatch deadline.
    pub async fn publish(&self, envelope: &MessageEnvelope) -> PublishReport {
        let deadline = Instant::now() + self.timeout;
        let attempts = self
            .pool
            .urls()
            .iter()
            .map(|url| self.publish_to(url, envelope, deadline));

        let report = PublishReport {
            endpoints: join_all(attempts).await,
        };

        tracing::info!(
            event_id = %envelope.id_hex(),
            succeeded = report.succeeded(),
            failed = report.failed(),
            "Fan-out complete",
        );
        report
    }

    async fn publish_to(
        &self,
        url: &str,
        envelope: &MessageEnvelope,
        deadline: Instant,
    ) -> EndpointReport {
        let outcome = self.attempt(url, envelope, deadline).await;
        EndpointReport {
            url: url.to_string(),
            outcome,
        }
    }

    async fn attempt(
        &self,
        url: &str,
        envelope: &MessageEnvelope,
        deadline: Instant,
    ) -> EndpointOutcome {
        if Instant::now() >= deadline {
            return EndpointOutcome::DeadlineExceeded;
        }

        // Connects are bounded by the connector's own timeout and are never
        // abandoned midway, so a repaired session still lands in the pool.
        let session = match self.pool.ensure_connected(url).await {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(url, error = %e, "Relay unavailable, skipping");
                return EndpointOutcome::ConnectFailed(e);
            }
        };

        if Instant::now() >= deadline {
            tracing::warn!(url, "Dispatch deadline passed before publishing");
            return EndpointOutcome::DeadlineExceeded;
        }

        match tokio::time::timeout_at(deadline, session.publish(envelope)).await {
            Ok(Ok(())) => {
                tracing::info!(url, event_id = %envelope.id_hex(), "Published to relay");
                EndpointOutcome::Published
            }
            Ok(Err(e)) => {
                tracing::warn!(url, error = %e, "Publish failed");
                EndpointOutcome::PublishFailed(e)
            }
            Err(_) => {
                tracing::warn!(url, "Relay did not acknowledge before the dispatch deadline");
                EndpointOutcome::DeadlineExceeded
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::fake::{envelope, Behavior, FakeConnector};

    const A: &str = "wss://a.example";
    const B: &str = "wss://b.example";
    const C: &str = "wss://c.example";

    fn publisher(connector: Arc<FakeConnector>, timeout: Duration) -> RelayPublisher {
        let urls = [A, B, C].iter().map(|u| u.to_string()).collect();
        RelayPublisher::new(Arc::new(RelayPool::new(urls, connector)), timeout)
    }

    #[tokio::test]
    async fn publishes_to_every_endpoint() {
        let connector = Arc::new(FakeConnector::default());
        let report = publisher(Arc::clone(&connector), DEFAULT_DISPATCH_TIMEOUT)
            .publish(&envelope())
            .await;

        assert_eq!(report.succeeded(), 3);
        assert_eq!(connector.published_to(), vec![A, B, C]);
    }

    #[tokio::test]
    async fn connect_failure_is_isolated() {
        let connector = Arc::new(FakeConnector::with(&[(B, Behavior::FailConnect)]));
        let report = publisher(Arc::clone(&connector), DEFAULT_DISPATCH_TIMEOUT)
            .publish(&envelope())
            .await;

        assert_eq!(connector.published_to(), vec![A, C]);
        assert_matches!(report.outcome_for(A), Some(EndpointOutcome::Published));
        assert_matches!(report.outcome_for(B), Some(EndpointOutcome::ConnectFailed(_)));
        assert_matches!(report.outcome_for(C), Some(EndpointOutcome::Published));
    }

    #[tokio::test]
    async fn rejection_is_isolated() {
        let connector = Arc::new(FakeConnector::with(&[(A, Behavior::Reject)]));
        let report = publisher(connector, DEFAULT_DISPATCH_TIMEOUT)
            .publish(&envelope())
            .await;

        assert_matches!(
            report.outcome_for(A),
            Some(EndpointOutcome::PublishFailed(RelayError::Rejected { .. }))
        );
        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failed(), 1);
    }

    #[tokio::test]
    async fn hanging_relay_is_cut_off_by_shared_deadline() {
        let connector = Arc::new(FakeConnector::with(&[(C, Behavior::Hang)]));
        let publisher = publisher(connector, Duration::from_millis(200));

        let started = std::time::Instant::now();
        let report = publisher.publish(&envelope()).await;

        assert!(started.elapsed() < Duration::from_secs(2));
        assert_matches!(report.outcome_for(C), Some(EndpointOutcome::DeadlineExceeded));
        assert_eq!(report.succeeded(), 2);
    }

    #[tokio::test]
    async fn slow_connect_past_deadline_skips_publish() {
        let connector = Arc::new(
            FakeConnector::default().with_connect_delay(Duration::from_millis(150)),
        );
        let report = publisher(Arc::clone(&connector), Duration::from_millis(50))
            .publish(&envelope())
            .await;

        assert!(connector.published_to().is_empty());
        assert!(report
            .endpoints
            .iter()
            .all(|r| matches!(r.outcome, EndpointOutcome::DeadlineExceeded)));
        // The repaired sessions stay pooled for the next dispatch.
        assert_eq!(connector.connect_count(A), 1);
    }

    #[tokio::test]
    async fn sessions_are_reused_across_dispatches() {
        let connector = Arc::new(FakeConnector::default());
        let publisher = publisher(Arc::clone(&connector), DEFAULT_DISPATCH_TIMEOUT);

        publisher.publish(&envelope()).await;
        publisher.publish(&envelope()).await;

        assert_eq!(connector.connect_count(A), 1);
        assert_eq!(connector.published_to().len(), 6);
    }

    #[tokio::test]
    async fn oversized_timeout_is_clamped() {
        let connector = Arc::new(FakeConnector::default());
        let publisher = publisher(Arc::clone(&connector), Duration::from_secs(u64::MAX));
        assert_eq!(publisher.timeout, MAX_DISPATCH_TIMEOUT);

        let report = publisher.publish(&envelope()).await;
        assert_eq!(report.succeeded(), 3);
    }
}
