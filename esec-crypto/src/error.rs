//! Error types for envelope encryption.

use thiserror::Error;

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors that can occur while generating keys or sealing/opening envelopes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Authentication failed. Deliberately carries no detail so a caller
    /// cannot tell a wrong key apart from corrupted or tampered data.
    #[error("decryption failed")]
    DecryptionFailed,

    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("randomness source unavailable: {0}")]
    Entropy(String),
}
