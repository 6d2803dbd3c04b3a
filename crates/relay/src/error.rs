use std::time::Duration;

/// Errors raised while connecting or publishing to a single relay.
///
/// Every variant is scoped to one endpoint; none of them abort delivery to
/// sibling relays.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// The WebSocket handshake failed.
    #[error("Failed to connect to relay {url}: {reason}")]
    Connect { url: String, reason: String },

    /// The handshake did not complete within the connect timeout.
    #[error("Connecting to relay {url} timed out after {timeout:?}")]
    ConnectTimeout { url: String, timeout: Duration },

    /// The session ended before the relay acknowledged the event.
    #[error("Relay {0} disconnected")]
    Disconnected(String),

    /// Writing the frame to the socket failed.
    #[error("Failed to send to relay {url}: {reason}")]
    Send { url: String, reason: String },

    /// The relay answered `OK false`.
    #[error("Relay {url} rejected event: {reason}")]
    Rejected { url: String, reason: String },

    /// The envelope could not be serialized into an `EVENT` frame.
    #[error("Failed to encode event frame: {0}")]
    Encode(#[from] serde_json::Error),

    /// The URL is not part of the configured relay list.
    #[error("Relay {0} is not configured")]
    UnknownEndpoint(String),

    /// The pool was shut down; no new sessions are opened.
    #[error("Relay pool is closed, not connecting to {0}")]
    PoolClosed(String),
}
