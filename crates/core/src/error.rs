/// The raw notification payload could not be decoded.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("Malformed notification payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// The recipient descriptor could not be turned into a canonical identity.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("Invalid bech32 identity '{encoded}': {reason}")]
    InvalidEncoding { encoded: String, reason: String },

    #[error("Bech32 value with prefix '{hrp}' is not a plain public key")]
    NotPlainIdentifier { hrp: String },
}

/// The service signing identity could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("No secret key provided")]
    Missing,

    #[error("Invalid secret key: {0}")]
    Invalid(String),
}

/// Building the encrypted direct message failed.
#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    #[error("Failed to derive shared secret for recipient {recipient}: {reason}")]
    SharedSecret { recipient: String, reason: String },

    #[error("Failed to encrypt message: {0}")]
    Encryption(String),

    #[error("Failed to sign message: {0}")]
    Signing(String),
}
