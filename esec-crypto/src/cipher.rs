//! Box encryption of individual document values.
//!
//! Uses X25519 key exchange + XSalsa20-Poly1305. The encrypter precomputes
//! the shared key once per recipient so a document with many values costs a
//! single Diffie-Hellman. The decrypter recomputes it per envelope from the
//! sender key carried inside the envelope.

use crate::envelope::{Envelope, NONCE_SIZE, SCHEMA_VERSION, is_envelope};
use crate::error::{CryptoError, CryptoResult};
use crate::key::{KEY_SIZE, Keypair, PrivateKey};
use crypto_box::aead::Aead;
use crypto_box::{PublicKey, SalsaBox, SecretKey};
use rand::RngCore;

/// Seals values for a single recipient.
pub struct Encrypter {
    sender_public: [u8; KEY_SIZE],
    shared: SalsaBox,
}

impl Encrypter {
    /// Precomputes the shared key between `own` and `peer_public`.
    pub fn new(own: &Keypair, peer_public: &[u8; KEY_SIZE]) -> Self {
        let peer = PublicKey::from(*peer_public);
        Self {
            sender_public: *own.public_key().as_bytes(),
            shared: SalsaBox::new(&peer, own.secret_key()),
        }
    }

    /// Encrypts `plaintext` into an `ESEC[...]` envelope.
    ///
    /// Input that already is a well-formed envelope is returned unchanged,
    /// so encrypting a document twice never double-wraps a value.
    pub fn encrypt(&self, plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
        if is_envelope(plaintext) {
            return Ok(plaintext.to_vec());
        }

        let nonce = generate_nonce()?;
        let ciphertext = self
            .shared
            .encrypt(crypto_box::Nonce::from_slice(&nonce), plaintext)
            .map_err(|e| CryptoError::Encryption(format!("box seal failed: {e}")))?;

        let envelope = Envelope {
            schema_version: SCHEMA_VERSION,
            sender_public: self.sender_public,
            nonce,
            ciphertext,
        };
        Ok(envelope.encode().into_bytes())
    }
}

/// Opens envelopes addressed to a single private key.
pub struct Decrypter {
    secret: SecretKey,
}

impl Decrypter {
    pub fn new(own: &Keypair) -> Self {
        Self::from_private_key(&PrivateKey::from_bytes(*own.private_bytes()))
    }

    pub fn from_private_key(key: &PrivateKey) -> Self {
        Self {
            secret: SecretKey::from(*key.as_bytes()),
        }
    }

    /// Decrypts an `ESEC[...]` envelope.
    ///
    /// Any authentication failure is reported as the single opaque
    /// [`CryptoError::DecryptionFailed`].
    pub fn decrypt(&self, message: &[u8]) -> CryptoResult<Vec<u8>> {
        let envelope = Envelope::decode(message)?;
        let sender = PublicKey::from(envelope.sender_public);
        let salsa_box = SalsaBox::new(&sender, &self.secret);

        salsa_box
            .decrypt(
                crypto_box::Nonce::from_slice(&envelope.nonce),
                envelope.ciphertext.as_ref(),
            )
            .map_err(|_| CryptoError::DecryptionFailed)
    }
}

/// Draws a fresh 24-byte nonce from the OS RNG.
pub fn generate_nonce() -> CryptoResult<[u8; NONCE_SIZE]> {
    let mut nonce = [0u8; NONCE_SIZE];
    rand::rngs::OsRng
        .try_fill_bytes(&mut nonce)
        .map_err(|e| CryptoError::Entropy(e.to_string()))?;
    Ok(nonce)
}
