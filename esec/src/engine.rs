//! Document and file level encryption.

use crate::config::EsecConfig;
use crate::error::{EsecError, EsecResult};
use crate::naming::{environment_from_filename, file_for_environment};
use esec_crypto::{Decrypter, Encrypter, PrivateKey, generate_keypair};
use esec_format::{Format, ScalarTransform};
use esec_keyring::{EnvProvider, KeyResolver, KeyringError, ProcessEnv};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Encrypts every eligible value of `input` to the document's public key.
///
/// Values that are already envelopes are left as they are, so encrypting
/// twice gives the same document.
pub async fn encrypt_document(input: &[u8], format: Format) -> EsecResult<Vec<u8>> {
    let handler = format.handler();
    let public = handler.extract_public_key(input)?;

    let ephemeral = generate_keypair()?;
    let encrypter = Encrypter::new(&ephemeral, &public);
    let transform: ScalarTransform = Arc::new(move |value: &[u8]| encrypter.encrypt(value));

    let output = handler.transform_scalars(input, transform).await?;
    debug!(format = %format, "encrypted document");
    Ok(output)
}

/// Decrypts `input`, resolving the private key from `user_key`, the process
/// environment or `key_dir/.esec-keyring`.
pub async fn decrypt_document(
    input: &[u8],
    format: Format,
    key_dir: &Path,
    environment: &str,
    user_key: Option<&str>,
) -> EsecResult<Vec<u8>> {
    let resolver = KeyResolver::new(&ProcessEnv);
    let key = resolver.resolve_private_key(key_dir, environment, user_key)?;
    decrypt_with_key(input, format, &key).await
}

/// Decrypts `input` with an already resolved private key.
pub async fn decrypt_with_key(input: &[u8], format: Format, key: &PrivateKey) -> EsecResult<Vec<u8>> {
    let handler = format.handler();
    let public = handler.extract_public_key(input)?;
    if key.public_bytes() != public {
        warn!(format = %format, "private key does not match the document public key");
    }

    let decrypter = Decrypter::from_private_key(key);
    let transform: ScalarTransform = Arc::new(move |value: &[u8]| decrypter.decrypt(value));

    let output = handler.transform_scalars(input, transform).await?;
    debug!(format = %format, "decrypted document");
    Ok(output)
}

/// Encrypts the file at `path`, returning the new contents.
pub async fn encrypt_file(path: &Path) -> EsecResult<Vec<u8>> {
    Esec::new(EsecConfig::default()).encrypt_file(path).await
}

/// Decrypts the file at `path` for `environment`, returning the plaintext.
pub async fn decrypt_file(
    path: &Path,
    key_dir: &Path,
    environment: &str,
    user_key: Option<&str>,
) -> EsecResult<Vec<u8>> {
    let format = Format::from_path(path)?;
    let input = tokio::fs::read(path).await?;
    decrypt_document(&input, format, key_dir, environment, user_key).await
}

/// Encrypts the file at `path` and writes it back if anything changed.
pub async fn encrypt_file_in_place(path: &Path) -> EsecResult<bool> {
    Esec::new(EsecConfig::default())
        .encrypt_file_in_place(path)
        .await
}

/// Configured entry point bound to an environment provider.
pub struct Esec<E: EnvProvider = ProcessEnv> {
    config: EsecConfig,
    env: E,
}

impl Esec<ProcessEnv> {
    pub fn new(config: EsecConfig) -> Self {
        Self::with_env(config, ProcessEnv)
    }
}

impl<E: EnvProvider> Esec<E> {
    /// Uses `env` instead of the process environment, applying its
    /// `ESEC_KEY_DIR` override to `config`.
    pub fn with_env(config: EsecConfig, env: E) -> Self {
        let config = config.with_env_overrides(&env);
        Self { config, env }
    }

    pub fn config(&self) -> &EsecConfig {
        &self.config
    }

    fn resolver(&self) -> KeyResolver<'_> {
        KeyResolver::new(&self.env).with_keyring_file(self.config.keyring_file.clone())
    }

    pub async fn encrypt(&self, input: &[u8], format: Format) -> EsecResult<Vec<u8>> {
        encrypt_document(input, format).await
    }

    pub async fn decrypt(
        &self,
        input: &[u8],
        format: Format,
        environment: &str,
        user_key: Option<&str>,
    ) -> EsecResult<Vec<u8>> {
        let key = self
            .resolver()
            .resolve_private_key(&self.config.key_dir, environment, user_key)?;
        decrypt_with_key(input, format, &key).await
    }

    /// Environment to use when none is given: a single
    /// `ESEC_PRIVATE_KEY*` variable decides, then the keyring's
    /// directives. With neither, the default environment.
    pub fn detect_environment(&self) -> EsecResult<String> {
        let resolver = self.resolver();
        let from_env = resolver.sniff_environment_name()?;
        if !from_env.is_empty() {
            debug!(environment = %from_env, source = "environment", "detected environment");
            return Ok(from_env);
        }

        match resolver.sniff_environment_from_keyring(&self.config.key_dir) {
            Ok(environment) => {
                debug!(environment = %environment, source = "keyring", "detected environment");
                Ok(environment)
            }
            Err(KeyringError::KeyringFileMissing { .. }) => Ok(String::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Path of `environment`'s file in the default format, under `dir`.
    pub fn path_for_environment(&self, dir: &Path, environment: &str) -> EsecResult<PathBuf> {
        Ok(dir.join(file_for_environment(self.config.default_format, environment)?))
    }

    pub async fn encrypt_file(&self, path: &Path) -> EsecResult<Vec<u8>> {
        let format = Format::from_path(path)?;
        let input = tokio::fs::read(path).await?;
        self.encrypt(&input, format).await
    }

    /// Decrypts the file at `path`; the environment comes from its name.
    pub async fn decrypt_file(&self, path: &Path, user_key: Option<&str>) -> EsecResult<Vec<u8>> {
        let format = Format::from_path(path)?;
        let environment = environment_from_filename(path)?;
        let input = tokio::fs::read(path).await?;
        self.decrypt(&input, format, &environment, user_key).await
    }

    /// Encrypts the file at `path` and replaces it if anything changed.
    ///
    /// The new contents go to a sibling temporary file that is renamed over
    /// the original, so a failure leaves the original untouched.
    pub async fn encrypt_file_in_place(&self, path: &Path) -> EsecResult<bool> {
        let format = Format::from_path(path)?;
        let input = tokio::fs::read(path).await?;
        let output = self.encrypt(&input, format).await?;
        if output == input {
            debug!(path = %path.display(), "file already encrypted");
            return Ok(false);
        }

        let tmp = temp_sibling(path)?;
        let permissions = tokio::fs::metadata(path).await?.permissions();
        tokio::fs::write(&tmp, &output).await?;
        tokio::fs::set_permissions(&tmp, permissions).await?;
        if let Err(e) = tokio::fs::rename(&tmp, path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        info!(path = %path.display(), "wrote encrypted file");
        Ok(true)
    }
}

fn temp_sibling(path: &Path) -> EsecResult<PathBuf> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| EsecError::InvalidFilename(path.display().to_string()))?;
    Ok(path.with_file_name(format!(".{name}.esec-tmp")))
}
