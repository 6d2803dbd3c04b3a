//! Process-wide pool of relay sessions.
//!
//! [`RelayPool`] holds one slot per configured endpoint. The endpoint set is
//! fixed at construction, so the slot map itself is never mutated; each slot
//! is guarded by its own async mutex. Concurrent dispatches that find the
//! same endpoint disconnected therefore queue behind a single reconnect
//! instead of racing, while other endpoints stay unaffected.
//!
//! After [`RelayPool::close_all`] the pool refuses to open new sessions.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Mutex;

use crate::error::RelayError;
use crate::session::{RelayConnector, RelaySession};

type Slot = Mutex<Option<Arc<dyn RelaySession>>>;

/// Shared registry of relay sessions keyed by endpoint URL.
pub struct RelayPool {
    /// Configured endpoints in configured order, deduplicated.
    urls: Vec<String>,
    slots: HashMap<String, Slot>,
    connector: Arc<dyn RelayConnector>,
    closed: AtomicBool,
}

impl RelayPool {
    /// Create an empty pool for the given endpoints. Nothing is connected yet.
    pub fn new(urls: Vec<String>, connector: Arc<dyn RelayConnector>) -> Self {
        let mut ordered = Vec::with_capacity(urls.len());
        let mut slots = HashMap::with_capacity(urls.len());
        for url in urls {
            if slots.contains_key(&url) {
                continue;
            }
            slots.insert(url.clone(), Mutex::new(None));
            ordered.push(url);
        }
        Self {
            urls: ordered,
            slots,
            connector,
            closed: AtomicBool::new(false),
        }
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    /// Return a live session for `url`, reconnecting if needed.
    ///
    /// A failed connect leaves the slot empty so the next caller retries.
    pub async fn ensure_connected(&self, url: &str) -> Result<Arc<dyn RelaySession>, RelayError> {
        let slot = self
            .slots
            .get(url)
            .ok_or_else(|| RelayError::UnknownEndpoint(url.to_string()))?;

        let mut guard = slot.lock().await;
        if self.closed.load(Ordering::Acquire) {
            return Err(RelayError::PoolClosed(url.to_string()));
        }
        if let Some(session) = guard.as_ref() {
            if session.is_connected() {
                return Ok(Arc::clone(session));
            }
            tracing::info!(url, ?session, "Relay session is not connected, reconnecting");
        }

        *guard = None;
        let session = self.connector.connect(url).await?;
        *guard = Some(Arc::clone(&session));
        Ok(session)
    }

    /// Eagerly connect every endpoint, concurrently.
    ///
    /// Failures are logged and left for lazy repair. Returns the number of
    /// endpoints that connected.
    pub async fn connect_all(&self) -> usize {
        let results = join_all(self.urls.iter().map(|url| self.ensure_connected(url))).await;

        let mut connected = 0;
        for (url, result) in self.urls.iter().zip(results) {
            match result {
                Ok(_) => connected += 1,
                Err(e) => tracing::warn!(url = %url, error = %e, "Could not connect to relay"),
            }
        }
        tracing::info!(connected, total = self.urls.len(), "Relay pool initialised");
        connected
    }

    /// Number of slots currently holding a live session.
    pub async fn connected_count(&self) -> usize {
        let mut count = 0;
        for slot in self.slots.values() {
            if slot.lock().await.as_ref().is_some_and(|s| s.is_connected()) {
                count += 1;
            }
        }
        count
    }

    /// Close every pooled session, empty all slots and stop further connects.
    pub async fn close_all(&self) {
        self.closed.store(true, Ordering::Release);
        let mut closed = 0;
        for url in &self.urls {
            let Some(slot) = self.slots.get(url) else {
                continue;
            };
            if let Some(session) = slot.lock().await.take() {
                session.close().await;
                closed += 1;
            }
        }
        tracing::info!(closed, "Closed all relay sessions");
    }
}
