//! Envelope encryption for esec documents.
//!
//! Every encrypted value in a document is an independent `ESEC[...]`
//! envelope produced by:
//! - X25519 Diffie-Hellman between an ephemeral sender keypair and the
//!   document's public key
//! - XSalsa20-Poly1305 authenticated encryption under a random 24-byte nonce
//!
//! # Architecture
//!
//! 1. **Document key**: the recipient keypair. Only the public half is ever
//!    written into a document; the private half lives in the process
//!    environment or a keyring file.
//!
//! 2. **Sender key**: a fresh keypair generated for each encryption pass.
//!    Its public half travels inside every envelope so decryption needs only
//!    the document private key.

mod cipher;
pub mod envelope;
mod error;
mod key;

pub use cipher::{Decrypter, Encrypter, generate_nonce};
pub use envelope::{Envelope, NONCE_SIZE, SCHEMA_VERSION, TAG_SIZE, is_envelope};
pub use error::{CryptoError, CryptoResult};
pub use key::{KEY_HEX_LEN, KEY_SIZE, Keypair, PrivateKey, generate_keypair, parse_key};
