//! In-memory relay doubles for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use nostr::{EventBuilder, Keys, Kind};
use zapnotify_core::composer::MessageEnvelope;

use crate::error::RelayError;
use crate::session::{RelayConnector, RelaySession};

/// How a fake endpoint behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Behavior {
    #[default]
    Accept,
    FailConnect,
    Reject,
    /// Never acknowledges a publish.
    Hang,
}

#[derive(Default)]
pub struct FakeConnector {
    behaviors: HashMap<String, Behavior>,
    connect_delay: Duration,
    pub connects: Mutex<Vec<String>>,
    pub publishes: Arc<Mutex<Vec<String>>>,
    pub sessions: Mutex<Vec<Arc<FakeSession>>>,
}

impl FakeConnector {
    pub fn with(behaviors: &[(&str, Behavior)]) -> Self {
        Self {
            behaviors: behaviors
                .iter()
                .map(|(url, b)| (url.to_string(), *b))
                .collect(),
            ..Default::default()
        }
    }

    pub fn with_connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = delay;
        self
    }

    pub fn connect_count(&self, url: &str) -> usize {
        self.connects.lock().unwrap().iter().filter(|u| *u == url).count()
    }

    pub fn published_to(&self) -> Vec<String> {
        let mut urls = self.publishes.lock().unwrap().clone();
        urls.sort();
        urls
    }
}

#[async_trait]
impl RelayConnector for FakeConnector {
    async fn connect(&self, url: &str) -> Result<Arc<dyn RelaySession>, RelayError> {
        self.connects.lock().unwrap().push(url.to_string());
        if !self.connect_delay.is_zero() {
            tokio::time::sleep(self.connect_delay).await;
        }
        let behavior = self.behaviors.get(url).copied().unwrap_or_default();
        if behavior == Behavior::FailConnect {
            return Err(RelayError::Connect {
                url: url.to_string(),
                reason: "connection refused".into(),
            });
        }
        let session = Arc::new(FakeSession {
            url: url.to_string(),
            behavior,
            connected: AtomicBool::new(true),
            publishes: Arc::clone(&self.publishes),
        });
        self.sessions.lock().unwrap().push(Arc::clone(&session));
        Ok(session)
    }
}

pub struct FakeSession {
    url: String,
    behavior: Behavior,
    pub connected: AtomicBool,
    publishes: Arc<Mutex<Vec<String>>>,
}

impl FakeSession {
    /// A connected, accepting session outside any connector.
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            behavior: Behavior::Accept,
            connected: AtomicBool::new(true),
            publishes: Arc::default(),
        }
    }

    pub fn drop_connection(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl RelaySession for FakeSession {
    fn url(&self) -> &str {
        &self.url
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn publish(&self, _envelope: &MessageEnvelope) -> Result<(), RelayError> {
        self.publishes.lock().unwrap().push(self.url.clone());
        match self.behavior {
            Behavior::Reject => Err(RelayError::Rejected {
                url: self.url.clone(),
                reason: "blocked".into(),
            }),
            Behavior::Hang => {
                futures::future::pending::<()>().await;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    async fn close(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }
}

pub fn envelope() -> MessageEnvelope {
    EventBuilder::new(Kind::EncryptedDirectMessage, "ciphertext?iv=abc")
        .sign_with_keys(&Keys::generate())
        .unwrap()
        .into()
}
