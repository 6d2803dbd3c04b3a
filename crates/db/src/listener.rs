//! `LISTEN`-based subscription to the payment notification channel.
//!
//! State machine: `Disconnected -> Listening`, and on connection loss
//! `Listening -> Reconnecting -> Listening`. Reconnects are retried forever
//! with exponential backoff; every transition is logged.
//!
//! [`NotificationListener`] is generic over the [`ChannelOpener`] that
//! produces live connections; [`PgNotificationListener`] is the Postgres one.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgListener, PgPoolOptions};

use crate::reconnect::{next_delay, ReconnectConfig, MIN_RECONNECT_DELAY};

/// How long a single open waits for the database before failing.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// A stream of raw notification payloads.
#[async_trait]
pub trait NotificationSource: Send {
    /// Wait for the next payload. `None` means the source is closed for good.
    async fn next_payload(&mut self) -> Option<String>;
}

/// Connection state of the database subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    Disconnected,
    Listening,
    Reconnecting,
}

impl fmt::Display for ListenerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Disconnected => "disconnected",
            Self::Listening => "listening",
            Self::Reconnecting => "reconnecting",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    #[error("Failed to connect notification listener: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("Failed to LISTEN on channel {channel}: {source}")]
    Listen {
        channel: String,
        #[source]
        source: sqlx::Error,
    },
}

/// A live `LISTEN` connection.
#[async_trait]
pub trait ChannelConnection: Send {
    /// The next payload. `Ok(None)` means the connection was lost.
    async fn recv(&mut self) -> Result<Option<String>, sqlx::Error>;
}

/// Opens subscribed connections to one channel.
#[async_trait]
pub trait ChannelOpener: Send + Sync {
    type Connection: ChannelConnection;

    fn channel(&self) -> &str;

    async fn open(&self) -> Result<Self::Connection, ListenerError>;
}

/// Channel subscription with backoff-driven reconnects.
pub struct NotificationListener<O: ChannelOpener> {
    opener: O,
    connection: O::Connection,
    reconnect: ReconnectConfig,
    state: ListenerState,
}

/// The production listener over Postgres `LISTEN`.
pub type PgNotificationListener = NotificationListener<PgOpener>;

impl PgNotificationListener {
    /// Connect and subscribe to `channel`.
    ///
    /// Fails if the database is unreachable right now; later connection
    /// losses are handled internally.
    pub async fn connect(
        conn_string: &str,
        channel: &str,
        reconnect: ReconnectConfig,
    ) -> Result<Self, ListenerError> {
        Self::start(PgOpener::new(conn_string, channel), reconnect).await
    }
}

impl<O: ChannelOpener> NotificationListener<O> {
    /// Open the first connection. Failure here is not retried.
    pub async fn start(opener: O, reconnect: ReconnectConfig) -> Result<Self, ListenerError> {
        let connection = opener.open().await?;
        let mut this = Self {
            opener,
            connection,
            reconnect,
            state: ListenerState::Disconnected,
        };
        this.transition(ListenerState::Listening);
        Ok(this)
    }

    pub fn state(&self) -> ListenerState {
        self.state
    }

    fn transition(&mut self, next: ListenerState) {
        if self.state != next {
            tracing::info!(
                channel = %self.opener.channel(),
                from = %self.state,
                to = %next,
                "Database listener state changed",
            );
            self.state = next;
        }
    }

    /// Replace the dead connection, backing off between attempts.
    async fn reconnect(&mut self) {
        self.transition(ListenerState::Reconnecting);
        let mut delay = self.reconnect.initial_delay.max(MIN_RECONNECT_DELAY);
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            tracing::info!(
                channel = %self.opener.channel(),
                attempt,
                delay_ms = delay.as_millis() as u64,
                "Reconnecting database listener",
            );
            tokio::time::sleep(delay).await;

            match self.opener.open().await {
                Ok(connection) => {
                    self.connection = connection;
                    self.transition(ListenerState::Listening);
                    return;
                }
                Err(e) => {
                    tracing::warn!(
                        channel = %self.opener.channel(),
                        error = %e,
                        "Database listener reconnect attempt {attempt} failed",
                    );
                    delay = next_delay(delay, &self.reconnect);
                }
            }
        }
    }
}

#[async_trait]
impl<O: ChannelOpener> NotificationSource for NotificationListener<O> {
    async fn next_payload(&mut self) -> Option<String> {
        loop {
            match self.connection.recv().await {
                Ok(Some(payload)) => return Some(payload),
                Ok(None) => {
                    tracing::warn!(channel = %self.opener.channel(), "Database subscription connection lost");
                    self.reconnect().await;
                }
                Err(e) => {
                    tracing::error!(channel = %self.opener.channel(), error = %e, "Database subscription error");
                    self.reconnect().await;
                }
            }
        }
    }
}

/// Opens Postgres `LISTEN` connections.
pub struct PgOpener {
    conn_string: String,
    channel: String,
    connect_timeout: Duration,
}

impl PgOpener {
    pub fn new(conn_string: &str, channel: &str) -> Self {
        Self {
            conn_string: conn_string.to_string(),
            channel: channel.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

#[async_trait]
impl ChannelOpener for PgOpener {
    type Connection = PgListener;

    fn channel(&self) -> &str {
        &self.channel
    }

    async fn open(&self) -> Result<PgListener, ListenerError> {
        // One connection, detached into the listener; the pool only bounds
        // how long acquiring it may take.
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(self.connect_timeout)
            .connect_lazy(&self.conn_string)
            .map_err(ListenerError::Connect)?;
        let mut listener = PgListener::connect_with(&pool)
            .await
            .map_err(ListenerError::Connect)?;
        listener
            .listen(&self.channel)
            .await
            .map_err(|source| ListenerError::Listen {
                channel: self.channel.clone(),
                source,
            })?;
        Ok(listener)
    }
}

#[async_trait]
impl ChannelConnection for PgListener {
    async fn recv(&mut self) -> Result<Option<String>, sqlx::Error> {
        Ok(self
            .try_recv()
            .await?
            .map(|notification| notification.payload().to_string()))
    }
}
