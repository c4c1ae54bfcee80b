//! Top-level error type.

use esec_crypto::CryptoError;
use esec_format::FormatError;
use esec_keyring::KeyringError;
use thiserror::Error;

/// Result type for esec operations.
pub type EsecResult<T> = Result<T, EsecError>;

/// Errors surfaced by the esec entry points.
#[derive(Debug, Error)]
pub enum EsecError {
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("invalid environment name `{0}`: only lowercase letters and digits are allowed")]
    InvalidEnvironment(String),

    #[error("file name `{0}` does not follow the <format>[.<environment>] convention")]
    InvalidFilename(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Keyring(#[from] KeyringError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
