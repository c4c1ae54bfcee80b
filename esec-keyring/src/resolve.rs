//! Private key and environment resolution.

use crate::env::{EnvProvider, ProcessEnv};
use crate::error::{KeyringError, KeyringResult};
use crate::keyring::{
    ACTIVE_ENVIRONMENT, ACTIVE_KEY, KEYRING_FILE, Keyring, environment_from_key_name,
    lookup_name,
};
use esec_crypto::PrivateKey;
use std::path::Path;
use tracing::debug;

/// Key name reported when any private key would do.
const ANY_PRIVATE_KEY: &str = "ESEC_PRIVATE_KEY*";

/// Finds private keys by precedence: explicit key, then process
/// environment, then the keyring file in the key directory.
pub struct KeyResolver<'a> {
    env: &'a dyn EnvProvider,
    keyring_file: String,
}

impl<'a> KeyResolver<'a> {
    pub fn new(env: &'a dyn EnvProvider) -> Self {
        Self {
            env,
            keyring_file: KEYRING_FILE.to_string(),
        }
    }

    /// Overrides the keyring file name (default `.esec-keyring`).
    pub fn with_keyring_file(mut self, name: impl Into<String>) -> Self {
        self.keyring_file = name.into();
        self
    }

    pub fn resolve_private_key(
        &self,
        key_dir: &Path,
        environment: &str,
        user_supplied: Option<&str>,
    ) -> KeyringResult<PrivateKey> {
        if let Some(key) = user_supplied.map(str::trim).filter(|k| !k.is_empty()) {
            debug!(source = "user", "using supplied private key");
            return parse("user-supplied key", key);
        }

        let name = lookup_name(environment);
        if let Some(value) = self.env.var(&name).filter(|v| !v.trim().is_empty()) {
            debug!(source = "environment", name = %name, "resolved private key");
            return parse(&name, value.trim());
        }

        let keyring = Keyring::load(key_dir, &self.keyring_file, &name)?;
        match keyring.get_non_empty(&name) {
            Some(value) => {
                debug!(source = "keyring", name = %name, path = %keyring.path().display(), "resolved private key");
                parse(&name, value)
            }
            None => Err(KeyringError::KeyNotFound {
                name,
                path: keyring.path().to_path_buf(),
            }),
        }
    }

    /// Derives the environment from the `ESEC_PRIVATE_KEY*` variables that
    /// are set. None set means the default environment.
    pub fn sniff_environment_name(&self) -> KeyringResult<String> {
        let mut names: Vec<String> = self
            .env
            .vars()
            .into_iter()
            .map(|(name, _)| name)
            .filter(|name| environment_from_key_name(name).is_some())
            .collect();
        names.sort();

        match names.as_slice() {
            [] => Ok(String::new()),
            [only] => Ok(environment_from_key_name(only).unwrap_or_default()),
            _ => Err(KeyringError::AmbiguousKey(names)),
        }
    }

    /// Derives the environment from the keyring file's active-key
    /// directives, falling back to the single key it stores.
    pub fn sniff_environment_from_keyring(&self, key_dir: &Path) -> KeyringResult<String> {
        let keyring = Keyring::load(key_dir, &self.keyring_file, ANY_PRIVATE_KEY)?;
        let active_key = keyring.get_non_empty(ACTIVE_KEY);
        let active_env = keyring.get_non_empty(ACTIVE_ENVIRONMENT);

        match (active_key, active_env) {
            (Some(_), Some(_)) => Err(KeyringError::ConflictingActiveKeyConfig),
            (None, Some(env)) => Ok(env.to_string()),
            (Some(key), None) => environment_from_key_name(key)
                .ok_or_else(|| KeyringError::InvalidActiveKey(key.to_string())),
            (None, None) => match keyring.private_key_names().as_slice() {
                [] => Err(KeyringError::NoUsableKey(keyring.path().to_path_buf())),
                [only] => Ok(environment_from_key_name(only).unwrap_or_default()),
                many => Err(KeyringError::AmbiguousKey(
                    many.iter().map(|n| n.to_string()).collect(),
                )),
            },
        }
    }
}

fn parse(name: &str, value: &str) -> KeyringResult<PrivateKey> {
    PrivateKey::from_hex(value).map_err(|source| KeyringError::InvalidKey {
        name: name.to_string(),
        source,
    })
}

/// [`KeyResolver::resolve_private_key`] against the process environment.
pub fn resolve_private_key(
    key_dir: &Path,
    environment: &str,
    user_supplied: Option<&str>,
) -> KeyringResult<PrivateKey> {
    KeyResolver::new(&ProcessEnv).resolve_private_key(key_dir, environment, user_supplied)
}

/// [`KeyResolver::sniff_environment_name`] against the process environment.
pub fn sniff_environment_name() -> KeyringResult<String> {
    KeyResolver::new(&ProcessEnv).sniff_environment_name()
}

/// [`KeyResolver::sniff_environment_from_keyring`] with the default file name.
pub fn sniff_environment_from_keyring(key_dir: &Path) -> KeyringResult<String> {
    KeyResolver::new(&ProcessEnv).sniff_environment_from_keyring(key_dir)
}
