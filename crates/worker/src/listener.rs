//! Receive loop bridging the database channel to the dispatch pipeline.
//!
//! Each payload is handed to its own task on a [`TaskTracker`]; the loop
//! never waits for a dispatch to finish before receiving the next event.
//! Concurrency is unbounded and dispatches are not ordered.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use zapnotify_db::NotificationSource;

use crate::dispatch::NotificationHandler;

/// Receive payloads until `cancel` fires or the source closes.
///
/// Returns the number of dispatches spawned.
pub async fn run_listener<S>(
    mut source: S,
    handler: Arc<dyn NotificationHandler>,
    tracker: TaskTracker,
    cancel: CancellationToken,
) -> usize
where
    S: NotificationSource,
{
    let mut spawned = 0;
    tracing::info!("Notification listener started");

    loop {
        let payload = tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!(spawned, "Notification listener stopping");
                break;
            }
            payload = source.next_payload() => payload,
        };

        let Some(payload) = payload else {
            tracing::warn!(spawned, "Notification source closed");
            break;
        };

        spawned += 1;
        tracing::debug!(spawned, "Notification received");
        let handler = Arc::clone(&handler);
        tracker.spawn(async move {
            handler.handle(payload).await;
        });
    }

    spawned
}
