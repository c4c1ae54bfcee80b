//! Format-preserving value transforms for esec documents.
//!
//! Each supported grammar has a [`FormatHandler`] that can:
//! - extract the document's `ESEC_PUBLIC_KEY` (or `_ESEC_PUBLIC_KEY`)
//! - run a caller-supplied transform over every encryptable string value,
//!   reproducing the rest of the document unchanged
//!
//! The transform is usually an encrypt or decrypt closure from
//! `esec-crypto`; handlers never touch key material themselves.
//!
//! # Skip rule
//!
//! A key/value pair is left untouched when its own key starts with `_` or
//! equals `ESEC_PUBLIC_KEY`. The decision is local to that pair: values
//! nested under a skipped key are evaluated again at their own level, and
//! sequence items are always transformed.

pub mod dotenv;
mod error;
pub mod json;
mod quote;
pub mod splice;
pub mod toml;
pub mod yaml;

use async_trait::async_trait;
use esec_crypto::{CryptoResult, KEY_SIZE, parse_key};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

pub use dotenv::DotenvHandler;
pub use error::{FormatError, FormatResult};
pub use json::JsonHandler;
pub use splice::{ReplacementSpan, apply_replacements};
pub use toml::TomlHandler;
pub use yaml::YamlHandler;

/// Name of the public key field.
pub const PUBLIC_KEY_FIELD: &str = "ESEC_PUBLIC_KEY";

/// Opted-out spelling of the public key field, preferred when both exist.
pub const UNDERSCORED_PUBLIC_KEY_FIELD: &str = "_ESEC_PUBLIC_KEY";

/// Value transform applied to every encryptable scalar.
pub type ScalarTransform = Arc<dyn Fn(&[u8]) -> CryptoResult<Vec<u8>> + Send + Sync>;

/// Returns true if the value under `key` must be left as-is.
pub fn is_skipped(key: &str) -> bool {
    key.starts_with('_') || key == PUBLIC_KEY_FIELD
}

/// Per-grammar public key extraction and scalar transformation.
#[async_trait]
pub trait FormatHandler: Send + Sync {
    fn format(&self) -> Format;

    /// Reads the document's public key.
    fn extract_public_key(&self, document: &[u8]) -> FormatResult<[u8; KEY_SIZE]>;

    /// Applies `transform` to every encryptable scalar and returns the new
    /// document. Nothing is returned unless every scalar succeeded.
    async fn transform_scalars(
        &self,
        document: &[u8],
        transform: ScalarTransform,
    ) -> FormatResult<Vec<u8>>;
}

/// Supported document grammars.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Dotenv,
    Ejson,
    Eyaml,
    Etoml,
}

/// Known file extensions, most specific first.
const EXTENSIONS: &[(&str, Format)] = &[
    (".ejson", Format::Ejson),
    (".eyaml", Format::Eyaml),
    (".eyml", Format::Eyaml),
    (".etoml", Format::Etoml),
    (".env", Format::Dotenv),
];

impl Format {
    pub const ALL: [Format; 4] = [Format::Dotenv, Format::Ejson, Format::Eyaml, Format::Etoml];

    /// Canonical file extension, including the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            Format::Dotenv => ".env",
            Format::Ejson => ".ejson",
            Format::Eyaml => ".eyaml",
            Format::Etoml => ".etoml",
        }
    }

    /// All extensions accepted for this format.
    pub fn extensions(self) -> impl Iterator<Item = &'static str> {
        EXTENSIONS
            .iter()
            .filter(move |(_, f)| *f == self)
            .map(|(ext, _)| *ext)
    }

    /// Finds the format extension `name` ends with, if any.
    pub fn from_extension_suffix(name: &str) -> Option<(Format, &'static str)> {
        EXTENSIONS
            .iter()
            .find(|(ext, _)| name.ends_with(ext))
            .map(|(ext, f)| (*f, *ext))
    }

    /// Detects the format from a file name ending in a format extension,
    /// optionally followed by one `.<environment>` segment.
    pub fn from_path(path: &Path) -> FormatResult<Format> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| FormatError::UnsupportedFormat(path.display().to_string()))?;
        Format::from_extension_suffix(name)
            .or_else(|| {
                let (stem, _env) = name.rsplit_once('.')?;
                Format::from_extension_suffix(stem)
            })
            .map(|(f, _)| f)
            .ok_or_else(|| FormatError::UnsupportedFormat(name.to_string()))
    }

    /// Handler implementing this grammar.
    pub fn handler(self) -> &'static dyn FormatHandler {
        match self {
            Format::Dotenv => &DotenvHandler,
            Format::Ejson => &JsonHandler,
            Format::Eyaml => &YamlHandler,
            Format::Etoml => &TomlHandler,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.extension()[1..])
    }
}

impl FromStr for Format {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "env" | "dotenv" => Ok(Format::Dotenv),
            "ejson" | "json" => Ok(Format::Ejson),
            "eyaml" | "eyml" | "yaml" | "yml" => Ok(Format::Eyaml),
            "etoml" | "toml" => Ok(Format::Etoml),
            _ => Err(FormatError::UnsupportedFormat(s.to_string())),
        }
    }
}

/// Raw value found under a public key field.
pub(crate) enum FieldValue {
    Str(String),
    NonString,
}

/// Picks `_ESEC_PUBLIC_KEY` over `ESEC_PUBLIC_KEY` and decodes it.
pub(crate) fn decode_public_key(
    underscored: Option<FieldValue>,
    plain: Option<FieldValue>,
) -> FormatResult<[u8; KEY_SIZE]> {
    match underscored.or(plain) {
        None => Err(FormatError::PublicKeyMissing),
        Some(FieldValue::NonString) => Err(FormatError::PublicKeyInvalid(
            "public key must be a string".to_string(),
        )),
        Some(FieldValue::Str(value)) => {
            parse_key(&value).map_err(|e| FormatError::PublicKeyInvalid(e.to_string()))
        }
    }
}

/// Converts transform output back into text for re-quoting.
pub(crate) fn transformed_text(bytes: Vec<u8>) -> FormatResult<String> {
    String::from_utf8(bytes).map_err(|_| FormatError::InvalidUtf8)
}
