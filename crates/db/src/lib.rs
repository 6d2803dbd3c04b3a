//! Postgres notification channel subscription.
//!
//! [`PgNotificationListener`](listener::PgNotificationListener) wraps a
//! `sqlx` `LISTEN` connection that survives connection loss by reconnecting
//! with exponential backoff. The receive loop consumes it through the
//! [`NotificationSource`](listener::NotificationSource) trait. Opening a
//! connection sits behind [`ChannelOpener`](listener::ChannelOpener).

pub mod listener;
pub mod reconnect;

pub use listener::{
    ChannelConnection, ChannelOpener, ListenerError, ListenerState, NotificationListener,
    NotificationSource, PgNotificationListener, PgOpener,
};
pub use reconnect::ReconnectConfig;
