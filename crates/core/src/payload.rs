//! Decoder for the JSON payload emitted by the payment trigger.
//!
//! The trigger sends `{"Is_npub": bool, "Pubkey": string, "Amount": int}`.
//! Every field is optional on the wire; absent or `null` fields fall back to
//! `false`, the empty string and `0` respectively.

use serde::Deserialize;

use crate::error::DecodeError;
use crate::types::AmountSats;

/// Who to notify and for how much, as decoded from one notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipientDescriptor {
    /// `true` when `identifier` is a bech32 (`npub`) encoding.
    pub is_alternate_encoding: bool,
    /// Hex public key or its bech32 encoding.
    pub identifier: String,
    pub amount_sats: AmountSats,
}

/// Wire shape of the trigger payload.
#[derive(Debug, Deserialize)]
struct NotificationPayload {
    #[serde(rename = "Is_npub", alias = "is_npub", default)]
    is_npub: Option<bool>,
    #[serde(rename = "Pubkey", alias = "pubkey", default)]
    pubkey: Option<String>,
    #[serde(rename = "Amount", alias = "amount", default)]
    amount: Option<AmountSats>,
}

impl From<NotificationPayload> for RecipientDescriptor {
    fn from(payload: NotificationPayload) -> Self {
        Self {
            is_alternate_encoding: payload.is_npub.unwrap_or(false),
            identifier: payload.pubkey.unwrap_or_default(),
            amount_sats: payload.amount.unwrap_or(0),
        }
    }
}

/// Decode a raw notification string.
///
/// Returns `Err` for malformed JSON, a non-object payload, or fields of the
/// wrong type (including negative amounts).
pub fn decode_payload(raw: &str) -> Result<RecipientDescriptor, DecodeError> {
    let payload: NotificationPayload = serde_json::from_str(raw)?;
    Ok(payload.into())
}
