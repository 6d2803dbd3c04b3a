//! `zapnotify-worker` -- payment notification daemon.
//!
//! Subscribes to the Postgres payment notification channel and, for every
//! payment event, sends the recipient an encrypted Nostr direct message
//! through the configured relays.
//!
//! See [`WorkerConfig::from_env`] for the environment variables.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use zapnotify_core::composer::Nip04Composer;
use zapnotify_db::PgNotificationListener;
use zapnotify_relay::{RelayPool, RelayPublisher, WsConnector};
use zapnotify_worker::config::WorkerConfig;
use zapnotify_worker::dispatch::{Dispatcher, NotificationHandler};
use zapnotify_worker::listener::run_listener;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "zapnotify_worker=info,zapnotify_relay=info,zapnotify_db=info,zapnotify_core=info"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = WorkerConfig::from_env().unwrap_or_else(|e| {
        tracing::error!(error = %e, "Could not create service: invalid configuration");
        std::process::exit(1);
    });
    tracing::info!(
        public_key = %config.identity.public_key_hex(),
        relays = config.relay_urls.len(),
        channel = %config.channel,
        allow_list = config.allow_list.as_ref().map_or(0, |l| l.len()),
        "Loaded worker configuration",
    );

    // --- Relays ---
    let pool = Arc::new(RelayPool::new(
        config.relay_urls.clone(),
        Arc::new(WsConnector::new(config.relay_connect_timeout)),
    ));
    pool.connect_all().await;
    let publisher = Arc::new(RelayPublisher::new(Arc::clone(&pool), config.dispatch_timeout));

    // --- Pipeline ---
    let composer = Arc::new(Nip04Composer::new(Arc::new(config.identity.clone())));
    let dispatcher: Arc<dyn NotificationHandler> =
        Arc::new(Dispatcher::new(config.access_filter(), composer, publisher));

    // --- Database listener ---
    let source = PgNotificationListener::connect(
        &config.db_conn_string,
        &config.channel,
        config.listener_backoff.clone(),
    )
    .await
    .unwrap_or_else(|e| {
        tracing::error!(error = %e, "Could not subscribe to payment notifications");
        std::process::exit(1);
    });

    let cancel = CancellationToken::new();
    let tracker = TaskTracker::new();
    let listener_handle = tokio::spawn(run_listener(
        source,
        Arc::clone(&dispatcher),
        tracker.clone(),
        cancel.clone(),
    ));

    shutdown_signal().await;

    // --- Shutdown ---
    cancel.cancel();
    let _ = listener_handle.await;

    tracker.close();
    if tokio::time::timeout(config.dispatch_timeout, tracker.wait())
        .await
        .is_err()
    {
        tracing::warn!(in_flight = tracker.len(), "Abandoning in-flight dispatches");
    }

    pool.close_all().await;
    tracing::info!("Shutdown complete");
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), shutting down");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, shutting down");
        }
    }
}
