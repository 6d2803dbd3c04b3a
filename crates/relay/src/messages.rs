//! NIP-01 relay wire messages.
//!
//! Clients publish with `["EVENT", <event>]`. Relays answer with JSON arrays
//! whose first element names the message type, e.g.
//! `["OK", <event id>, <accepted>, <message>]`. This module encodes the
//! outgoing frame and parses incoming frames into [`RelayMessage`].

use nostr::Event;
use serde_json::Value;

/// Messages a relay may send to a publishing client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayMessage {
    /// Acknowledgement for a published event.
    Ok {
        event_id: String,
        accepted: bool,
        message: String,
    },
    /// Human-readable notice from the relay operator.
    Notice { message: String },
    /// A subscription was closed by the relay.
    Closed {
        subscription_id: String,
        message: String,
    },
    /// End of stored events for a subscription.
    Eose { subscription_id: String },
    /// An event delivered for a subscription.
    Event { subscription_id: String },
    /// NIP-42 authentication challenge.
    Auth { challenge: String },
}

/// Errors produced by [`parse_relay_message`].
#[derive(Debug, thiserror::Error)]
pub enum RelayMessageError {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Relay message is not a non-empty JSON array")]
    NotAnArray,

    #[error("Unknown relay message type: {0}")]
    UnknownType(String),

    #[error("{kind} message is missing or has a malformed element {index}")]
    MalformedField { kind: &'static str, index: usize },
}

/// Encode the `["EVENT", <event>]` frame for publishing.
pub fn event_frame(event: &Event) -> Result<String, serde_json::Error> {
    serde_json::to_string(&serde_json::json!(["EVENT", event]))
}

/// Parse a relay text frame.
pub fn parse_relay_message(text: &str) -> Result<RelayMessage, RelayMessageError> {
    let value: Value = serde_json::from_str(text)?;
    let items = match value {
        Value::Array(items) if !items.is_empty() => items,
        _ => return Err(RelayMessageError::NotAnArray),
    };

    let kind = items[0].as_str().ok_or(RelayMessageError::NotAnArray)?;
    match kind {
        "OK" => Ok(RelayMessage::Ok {
            event_id: string_at(&items, 1, "OK")?,
            accepted: items
                .get(2)
                .and_then(Value::as_bool)
                .ok_or(RelayMessageError::MalformedField { kind: "OK", index: 2 })?,
            message: optional_string_at(&items, 3),
        }),
        "NOTICE" => Ok(RelayMessage::Notice {
            message: string_at(&items, 1, "NOTICE")?,
        }),
        "CLOSED" => Ok(RelayMessage::Closed {
            subscription_id: string_at(&items, 1, "CLOSED")?,
            message: optional_string_at(&items, 2),
        }),
        "EOSE" => Ok(RelayMessage::Eose {
            subscription_id: string_at(&items, 1, "EOSE")?,
        }),
        "EVENT" => Ok(RelayMessage::Event {
            subscription_id: string_at(&items, 1, "EVENT")?,
        }),
        "AUTH" => Ok(RelayMessage::Auth {
            challenge: string_at(&items, 1, "AUTH")?,
        }),
        other => Err(RelayMessageError::UnknownType(other.to_string())),
    }
}

fn string_at(items: &[Value], index: usize, kind: &'static str) -> Result<String, RelayMessageError> {
    items
        .get(index)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(RelayMessageError::MalformedField { kind, index })
}

fn optional_string_at(items: &[Value], index: usize) -> String {
    items
        .get(index)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
