//! Error types for document handlers.

use esec_crypto::CryptoError;
use thiserror::Error;

/// Result type for format operations.
pub type FormatResult<T> = Result<T, FormatError>;

/// Errors that can occur while reading or transforming a document.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("public key field ESEC_PUBLIC_KEY not found in document")]
    PublicKeyMissing,

    #[error("invalid public key: {0}")]
    PublicKeyInvalid(String),

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A dotenv line that looks like a key with no `=`.
    #[error("malformed entry on line {line}: `{key}` has no '=' separator")]
    MalformedDocumentEntry { line: usize, key: String },

    #[error("YAML anchors and aliases are not supported")]
    AnchorsNotSupported,

    #[error("top-level YAML sequences are not supported; a mapping is required")]
    TopLevelArrayNotSupported,

    #[error("invalid replacement bounds {start}..{end} in document of {len} bytes")]
    InvalidReplacementBounds { start: usize, end: usize, len: usize },

    #[error("{format} parse error: {message}")]
    Parse { format: &'static str, message: String },

    #[error("document is not valid UTF-8")]
    InvalidUtf8,

    #[error(transparent)]
    Transform(#[from] CryptoError),

    #[error("transform worker failed: {0}")]
    Worker(String),
}

impl FormatError {
    pub(crate) fn parse(format: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Parse {
            format,
            message: err.to_string(),
        }
    }
}
