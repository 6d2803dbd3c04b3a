//! The service's own signing identity.

use std::fmt;

use nostr::{Keys, PublicKey};

use crate::error::IdentityError;

/// Process-wide key pair used to encrypt to recipients and sign envelopes.
///
/// Loaded once at startup and shared read-only (typically behind an `Arc`).
/// `Debug` prints only the public key.
#[derive(Clone)]
pub struct ServiceIdentity {
    keys: Keys,
}

impl ServiceIdentity {
    /// Parse a hex (or `nsec` bech32) secret key.
    pub fn from_secret_key(secret_key: &str) -> Result<Self, IdentityError> {
        let secret_key = secret_key.trim();
        if secret_key.is_empty() {
            return Err(IdentityError::Missing);
        }
        let keys = Keys::parse(secret_key).map_err(|e| IdentityError::Invalid(e.to_string()))?;
        Ok(Self { keys })
    }

    pub fn from_keys(keys: Keys) -> Self {
        Self { keys }
    }

    pub fn public_key(&self) -> PublicKey {
        self.keys.public_key()
    }

    pub fn public_key_hex(&self) -> String {
        self.keys.public_key().to_hex()
    }

    pub(crate) fn keys(&self) -> &Keys {
        &self.keys
    }
}

impl fmt::Debug for ServiceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceIdentity")
            .field("public_key", &self.public_key_hex())
            .finish_non_exhaustive()
    }
}
