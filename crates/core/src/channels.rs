//! Well-known channel and endpoint constants.
//!
//! The channel name must match the `pg_notify` call issued by the payment
//! trigger in the database.

/// Postgres notification channel the payment trigger publishes on.
pub const PAYMENT_NOTIFICATION_CHANNEL: &str = "payment_notifs";

/// Relay used when no relay list is configured.
pub const DEFAULT_RELAY_URL: &str = "wss://relay.damus.io";
