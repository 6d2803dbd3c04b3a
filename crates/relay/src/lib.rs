//! Nostr relay client library.
//!
//! Provides the NIP-01 wire messages, WebSocket relay sessions, a
//! process-wide connection pool keyed by endpoint URL, and the fan-out
//! publisher that delivers one envelope to every configured relay.

pub mod error;
pub mod messages;
pub mod pool;
pub mod publisher;
pub mod session;

#[cfg(test)]
mod fake;

pub use error::RelayError;
pub use pool::RelayPool;
pub use publisher::{EndpointOutcome, PublishReport, RelayPublisher, MAX_DISPATCH_TIMEOUT};
pub use session::{RelayConnector, RelaySession, WsConnector};
