//! Encrypted direct-message composition.
//!
//! [`Nip04Composer`] renders the notification text, encrypts it to the
//! recipient with NIP-04 and signs a kind-4 event as the service identity.
//! Any failure here aborts only the current dispatch.

use std::sync::Arc;

use nostr::nips::nip04;
use nostr::{Event, EventBuilder, Kind, PublicKey, Tag, Timestamp};

use crate::error::ComposeError;
use crate::keys::ServiceIdentity;
use crate::types::{AmountSats, CanonicalIdentity};

/// Render the human-readable notification text.
pub fn render_message(amount_sats: AmountSats) -> String {
    format!(
        "Someone zapped your npub.cash address: Received {amount_sats} SATS \n\
         Go to https://npub.cash/claim to claim them"
    )
}

/// A signed, encrypted direct message ready to be published.
#[derive(Debug, Clone)]
pub struct MessageEnvelope {
    event: Event,
}

impl MessageEnvelope {
    /// Hex event id, used to correlate relay acknowledgements.
    pub fn id_hex(&self) -> String {
        self.event.id.to_hex()
    }

    pub fn created_at(&self) -> Timestamp {
        self.event.created_at
    }

    pub fn event(&self) -> &Event {
        &self.event
    }
}

impl From<Event> for MessageEnvelope {
    fn from(event: Event) -> Self {
        Self { event }
    }
}

/// Turns a recipient and amount into a publishable envelope.
pub trait MessageComposer: Send + Sync {
    fn compose(
        &self,
        recipient: &CanonicalIdentity,
        amount_sats: AmountSats,
    ) -> Result<MessageEnvelope, ComposeError>;
}

/// NIP-04 composer signing as the service identity.
pub struct Nip04Composer {
    identity: Arc<ServiceIdentity>,
}

impl Nip04Composer {
    pub fn new(identity: Arc<ServiceIdentity>) -> Self {
        Self { identity }
    }

    /// Compose with an explicit creation timestamp.
    pub fn compose_at(
        &self,
        recipient: &CanonicalIdentity,
        amount_sats: AmountSats,
        created_at: Timestamp,
    ) -> Result<MessageEnvelope, ComposeError> {
        // The recipient key must be a valid curve point for ECDH.
        let recipient_key =
            PublicKey::from_hex(recipient.as_str()).map_err(|e| ComposeError::SharedSecret {
                recipient: recipient.to_string(),
                reason: e.to_string(),
            })?;

        let plaintext = render_message(amount_sats);
        let keys = self.identity.keys();
        let content = nip04::encrypt(keys.secret_key(), &recipient_key, &plaintext)
            .map_err(|e| ComposeError::Encryption(e.to_string()))?;

        let event = EventBuilder::new(Kind::EncryptedDirectMessage, content)
            .tag(Tag::public_key(recipient_key))
            .custom_created_at(created_at)
            .sign_with_keys(keys)
            .map_err(|e| ComposeError::Signing(e.to_string()))?;

        tracing::debug!(
            event_id = %event.id,
            recipient = %recipient,
            amount_sats,
            "Composed encrypted direct message",
        );

        Ok(MessageEnvelope { event })
    }
}

impl MessageComposer for Nip04Composer {
    fn compose(
        &self,
        recipient: &CanonicalIdentity,
        amount_sats: AmountSats,
    ) -> Result<MessageEnvelope, ComposeError> {
        self.compose_at(recipient, amount_sats, Timestamp::now())
    }
}
