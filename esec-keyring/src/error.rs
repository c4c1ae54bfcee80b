//! Error types for key resolution.

use esec_crypto::CryptoError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for key resolution.
pub type KeyringResult<T> = Result<T, KeyringError>;

/// Errors that can occur while locating a private key.
#[derive(Debug, Error)]
pub enum KeyringError {
    #[error("private key {name} not found in environment or {}", path.display())]
    KeyNotFound { name: String, path: PathBuf },

    #[error("keyring file not found: {} (looking for {name})", path.display())]
    KeyringFileMissing { path: PathBuf, name: String },

    #[error("cannot read keyring file {} (looking for {name}): {message}", path.display())]
    KeyringFileUnreadable {
        path: PathBuf,
        name: String,
        message: String,
    },

    #[error("ambiguous private keys: {}", .0.join(", "))]
    AmbiguousKey(Vec<String>),

    #[error("ESEC_ACTIVE_KEY and ESEC_ACTIVE_ENVIRONMENT are both set")]
    ConflictingActiveKeyConfig,

    #[error("ESEC_ACTIVE_KEY must name an ESEC_PRIVATE_KEY variable, got `{0}`")]
    InvalidActiveKey(String),

    #[error("no usable private key in {}", .0.display())]
    NoUsableKey(PathBuf),

    #[error("invalid key directory: {}", .0.display())]
    InvalidKeyDir(PathBuf),

    #[error("invalid private key {name}: {source}")]
    InvalidKey {
        name: String,
        #[source]
        source: CryptoError,
    },

    #[error("malformed keyring file {}: {message}", path.display())]
    Malformed { path: PathBuf, message: String },
}
