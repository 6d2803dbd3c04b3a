use std::fmt;

/// Amount carried by a payment notification, in satoshis.
pub type AmountSats = u64;

/// Hex-encoded public identity of a notification recipient.
///
/// Built once per dispatch by the identity resolver and never mutated.
/// No format validation happens at construction: the composer's key
/// parsing is the effective validator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalIdentity(String);

impl CanonicalIdentity {
    /// Wrap an identifier verbatim.
    pub fn new(identifier: impl Into<String>) -> Self {
        Self(identifier.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CanonicalIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<nostr::PublicKey> for CanonicalIdentity {
    fn from(public_key: nostr::PublicKey) -> Self {
        Self(public_key.to_hex())
    }
}
