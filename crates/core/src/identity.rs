//! Recipient identity resolution.
//!
//! A descriptor carries either a hex public key, used verbatim, or its
//! NIP-19 `npub` encoding. Only the plain `npub` form resolves: profile
//! pointers, secret keys and event references abort the dispatch.

use nostr::nips::nip19::{FromBech32, Nip19};

use crate::error::ResolveError;
use crate::payload::RecipientDescriptor;
use crate::types::CanonicalIdentity;

/// Resolve the canonical identity for a decoded descriptor.
pub fn resolve_identity(descriptor: &RecipientDescriptor) -> Result<CanonicalIdentity, ResolveError> {
    if descriptor.is_alternate_encoding {
        decode_npub(&descriptor.identifier)
    } else {
        Ok(CanonicalIdentity::new(descriptor.identifier.clone()))
    }
}

/// Decode a bech32 `npub` into its hex identity.
pub fn decode_npub(encoded: &str) -> Result<CanonicalIdentity, ResolveError> {
    let decoded = Nip19::from_bech32(encoded).map_err(|e| ResolveError::InvalidEncoding {
        encoded: encoded.to_string(),
        reason: e.to_string(),
    })?;

    match decoded {
        Nip19::Pubkey(public_key) => Ok(public_key.into()),
        _ => Err(ResolveError::NotPlainIdentifier {
            hrp: human_readable_part(encoded).to_string(),
        }),
    }
}

/// The bech32 prefix is everything before the last `1` separator.
fn human_readable_part(encoded: &str) -> &str {
    encoded.rsplit_once('1').map_or(encoded, |(hrp, _)| hrp)
}
