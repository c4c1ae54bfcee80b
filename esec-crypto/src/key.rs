//! Curve25519 key material.

use crate::error::{CryptoError, CryptoResult};
use crypto_box::{PublicKey, SecretKey};
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Size of public and private keys in bytes.
pub const KEY_SIZE: usize = 32;

/// Length of a hex-encoded key.
pub const KEY_HEX_LEN: usize = KEY_SIZE * 2;

/// X25519 keypair used for document encryption.
///
/// The secret key implements `ZeroizeOnDrop` automatically (from crypto_box).
pub struct Keypair {
    secret: SecretKey,
    public: PublicKey,
}

impl Keypair {
    /// Reconstructs a keypair from raw private key bytes.
    pub fn from_private_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        let secret = SecretKey::from(bytes);
        let public = secret.public_key();
        Self { secret, public }
    }

    /// Reconstructs a keypair from a resolved private key.
    pub fn from_private_key(key: &PrivateKey) -> Self {
        Self::from_private_bytes(*key.as_bytes())
    }

    /// Returns the public key as raw 32-byte array.
    pub fn public_bytes(&self) -> [u8; KEY_SIZE] {
        *self.public.as_bytes()
    }

    /// Returns the private key as raw 32-byte array.
    pub fn private_bytes(&self) -> Zeroizing<[u8; KEY_SIZE]> {
        Zeroizing::new(self.secret.to_bytes())
    }

    /// Lowercase hex of the public key, the form embedded in documents.
    pub fn public_hex(&self) -> String {
        hex::encode(self.public.as_bytes())
    }

    /// Lowercase hex of the private key, the form stored in keyring files.
    pub fn private_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(self.secret.to_bytes()))
    }

    pub(crate) fn public_key(&self) -> &PublicKey {
        &self.public
    }

    pub(crate) fn secret_key(&self) -> &SecretKey {
        &self.secret
    }
}

impl std::fmt::Debug for Keypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keypair")
            .field("public", &self.public_hex())
            .finish_non_exhaustive()
    }
}

/// A private key resolved from the environment or a keyring file.
///
/// Wiped from memory on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct PrivateKey([u8; KEY_SIZE]);

impl PrivateKey {
    /// Parses a 64-character hex string.
    pub fn from_hex(value: &str) -> CryptoResult<Self> {
        parse_key(value).map(Self)
    }

    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }

    /// Derives the matching public key.
    pub fn public_bytes(&self) -> [u8; KEY_SIZE] {
        *SecretKey::from(self.0).public_key().as_bytes()
    }
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PrivateKey(<redacted>)")
    }
}

/// Generates a new keypair from 32 bytes of OS entropy.
pub fn generate_keypair() -> CryptoResult<Keypair> {
    let mut bytes = Zeroizing::new([0u8; KEY_SIZE]);
    rand::rngs::OsRng
        .try_fill_bytes(&mut bytes[..])
        .map_err(|e| CryptoError::Entropy(e.to_string()))?;
    Ok(Keypair::from_private_bytes(*bytes))
}

/// Parses hex-encoded key material (public or private).
///
/// The input must be exactly 64 hex characters.
pub fn parse_key(value: &str) -> CryptoResult<[u8; KEY_SIZE]> {
    if value.len() != KEY_HEX_LEN {
        return Err(CryptoError::InvalidKey(format!(
            "expected {KEY_HEX_LEN} hex characters, got {}",
            value.len()
        )));
    }

    let mut bytes = [0u8; KEY_SIZE];
    hex::decode_to_slice(value, &mut bytes)
        .map_err(|e| CryptoError::InvalidKey(format!("not valid hex: {e}")))?;
    Ok(bytes)
}
