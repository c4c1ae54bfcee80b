//! esec configuration.

use crate::error::{EsecError, EsecResult};
use esec_format::Format;
use esec_keyring::{EnvProvider, KEYRING_FILE};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable overriding [`EsecConfig::key_dir`].
pub const KEY_DIR_VAR: &str = "ESEC_KEY_DIR";

/// Settings shared by every esec operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EsecConfig {
    /// Directory holding the keyring file.
    pub key_dir: PathBuf,

    /// Format used when a file name is derived from an environment alone.
    pub default_format: Format,

    /// Keyring file name inside `key_dir`.
    pub keyring_file: String,
}

impl Default for EsecConfig {
    fn default() -> Self {
        Self {
            key_dir: PathBuf::from("."),
            default_format: Format::Ejson,
            keyring_file: KEYRING_FILE.to_string(),
        }
    }
}

impl EsecConfig {
    /// Parses an `esec.toml` document. Missing fields keep their defaults.
    pub fn from_toml_str(text: &str) -> EsecResult<Self> {
        toml::from_str(text).map_err(|e| EsecError::Config(e.to_string()))
    }

    /// Applies `ESEC_KEY_DIR` when it is set and non-empty.
    pub fn with_env_overrides(mut self, env: &dyn EnvProvider) -> Self {
        if let Some(dir) = env.var(KEY_DIR_VAR).filter(|d| !d.is_empty()) {
            self.key_dir = PathBuf::from(dir);
        }
        self
    }
}
