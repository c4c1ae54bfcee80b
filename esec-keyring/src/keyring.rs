//! The `.esec-keyring` file and key naming.
//!
//! A keyring is a dotenv-shaped file holding `ESEC_PRIVATE_KEY[_ENV]` lines
//! and optionally one of `ESEC_ACTIVE_ENVIRONMENT` / `ESEC_ACTIVE_KEY`.

use crate::error::{KeyringError, KeyringResult};
use esec_crypto::PrivateKey;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tracing::debug;
use zeroize::Zeroizing;

/// Default keyring file name inside the key directory.
pub const KEYRING_FILE: &str = ".esec-keyring";

/// Name of the private key for the default environment, and the prefix of
/// every per-environment key.
pub const PRIVATE_KEY_PREFIX: &str = "ESEC_PRIVATE_KEY";

pub const ACTIVE_KEY: &str = "ESEC_ACTIVE_KEY";
pub const ACTIVE_ENVIRONMENT: &str = "ESEC_ACTIVE_ENVIRONMENT";

/// Variable holding the private key for `environment`.
pub fn lookup_name(environment: &str) -> String {
    if environment.is_empty() {
        PRIVATE_KEY_PREFIX.to_string()
    } else {
        format!("{PRIVATE_KEY_PREFIX}_{}", environment.to_uppercase())
    }
}

/// Inverse of [`lookup_name`]: `ESEC_PRIVATE_KEY` gives the default
/// environment, `ESEC_PRIVATE_KEY_QA` gives `qa`. Other names give `None`.
pub fn environment_from_key_name(name: &str) -> Option<String> {
    let rest = name.strip_prefix(PRIVATE_KEY_PREFIX)?;
    if rest.is_empty() {
        return Some(String::new());
    }
    let suffix = rest.strip_prefix('_')?;
    if suffix.is_empty() {
        return None;
    }
    Some(suffix.to_lowercase())
}

/// Keyring line storing `key` for `environment`.
pub fn keyring_line(environment: &str, key: &PrivateKey) -> Zeroizing<String> {
    Zeroizing::new(format!(
        "{}={}",
        lookup_name(environment),
        hex::encode(key.as_bytes())
    ))
}

/// Rejects key directories that climb out through `..`.
pub fn validate_key_dir(key_dir: &Path) -> KeyringResult<()> {
    if key_dir.components().any(|c| c == Component::ParentDir) {
        return Err(KeyringError::InvalidKeyDir(key_dir.to_path_buf()));
    }
    Ok(())
}

/// A parsed keyring file.
#[derive(Clone)]
pub struct Keyring {
    path: PathBuf,
    entries: Vec<(String, String)>,
}

impl Keyring {
    /// Reads `key_dir/file_name`. `searched` names the key the caller is
    /// after and is only used in errors.
    pub fn load(key_dir: &Path, file_name: &str, searched: &str) -> KeyringResult<Self> {
        validate_key_dir(key_dir)?;
        let path = key_dir.join(file_name);

        let load_error = |e: dotenv::Error| match e {
            dotenv::Error::Io(io) if io.kind() == ErrorKind::NotFound => {
                KeyringError::KeyringFileMissing {
                    path: path.clone(),
                    name: searched.to_string(),
                }
            }
            dotenv::Error::Io(io) => KeyringError::KeyringFileUnreadable {
                path: path.clone(),
                name: searched.to_string(),
                message: io.to_string(),
            },
            // the offending line may hold key material, so it is not echoed
            dotenv::Error::LineParse(_, column) => KeyringError::Malformed {
                path: path.clone(),
                message: format!("unparsable entry at column {column}"),
            },
            other => KeyringError::Malformed {
                path: path.clone(),
                message: other.to_string(),
            },
        };
        let entries = dotenv::from_path_iter(&path)
            .map_err(&load_error)?
            .collect::<Result<Vec<(String, String)>, _>>()
            .map_err(&load_error)?;

        debug!(path = %path.display(), entries = entries.len(), "loaded keyring");
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Value of `name`; the last assignment wins.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Like [`get`](Self::get), treating an empty value as unset.
    pub fn get_non_empty(&self, name: &str) -> Option<&str> {
        self.get(name).map(str::trim).filter(|v| !v.is_empty())
    }

    /// Distinct private key names, in file order.
    pub fn private_key_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for (key, _) in &self.entries {
            if environment_from_key_name(key).is_some() && !names.contains(&key.as_str()) {
                names.push(key);
            }
        }
        names
    }
}

impl std::fmt::Debug for Keyring {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keyring")
            .field("path", &self.path)
            .field("entries", &self.entries.len())
            .finish()
    }
}
