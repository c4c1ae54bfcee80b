//! `ESEC[...]` wire envelope.
//!
//! An envelope is self-describing: it carries the schema version, the
//! sender's public key and the nonce alongside the ciphertext, so the
//! recipient needs nothing but its own private key to open it.
//!
//! ```text
//! ESEC[<version>:<base64 sender_public>:<base64 nonce>:<base64 ciphertext>]
//! ```

use crate::error::{CryptoError, CryptoResult};
use crate::key::KEY_SIZE;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Envelope schema version written by this crate.
pub const SCHEMA_VERSION: u32 = 1;

/// XSalsa20 nonce size in bytes.
pub const NONCE_SIZE: usize = 24;

/// Poly1305 tag size; the minimum ciphertext length.
pub const TAG_SIZE: usize = 16;

const PREFIX: &str = "ESEC[";
const SUFFIX: &str = "]";

/// Decoded form of an `ESEC[...]` envelope.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Envelope {
    pub schema_version: u32,
    /// Ephemeral X25519 public key of the sender.
    pub sender_public: [u8; KEY_SIZE],
    pub nonce: [u8; NONCE_SIZE],
    /// XSalsa20-Poly1305 ciphertext including the tag.
    pub ciphertext: Vec<u8>,
}

impl Envelope {
    /// Serializes to the wire form.
    pub fn encode(&self) -> String {
        format!(
            "{PREFIX}{}:{}:{}:{}{SUFFIX}",
            self.schema_version,
            STANDARD.encode(self.sender_public),
            STANDARD.encode(self.nonce),
            STANDARD.encode(&self.ciphertext),
        )
    }

    /// Parses the wire form. Every field must be present and decode cleanly.
    pub fn decode(raw: &[u8]) -> CryptoResult<Self> {
        let text = std::str::from_utf8(raw)
            .map_err(|_| malformed("envelope is not valid UTF-8"))?;
        let body = text
            .strip_prefix(PREFIX)
            .and_then(|rest| rest.strip_suffix(SUFFIX))
            .ok_or_else(|| malformed("missing ESEC[...] brackets"))?;

        let mut fields = body.splitn(4, ':');
        let (Some(version), Some(sender), Some(nonce), Some(ciphertext)) =
            (fields.next(), fields.next(), fields.next(), fields.next())
        else {
            return Err(malformed("expected four ':'-separated fields"));
        };

        if version.is_empty() || !version.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed("schema version is not an integer"));
        }
        let schema_version: u32 = version
            .parse()
            .map_err(|_| malformed("schema version out of range"))?;
        if schema_version != SCHEMA_VERSION {
            return Err(malformed(&format!(
                "unsupported schema version {schema_version}"
            )));
        }

        let sender_public = decode_fixed::<KEY_SIZE>(sender, "sender public key")?;
        let nonce = decode_fixed::<NONCE_SIZE>(nonce, "nonce")?;
        let ciphertext = STANDARD
            .decode(ciphertext)
            .map_err(|e| malformed(&format!("ciphertext is not valid base64: {e}")))?;
        if ciphertext.len() < TAG_SIZE {
            return Err(malformed("ciphertext shorter than authentication tag"));
        }

        Ok(Self {
            schema_version,
            sender_public,
            nonce,
            ciphertext,
        })
    }
}

/// Returns true if `raw` is a well-formed envelope.
pub fn is_envelope(raw: &[u8]) -> bool {
    Envelope::decode(raw).is_ok()
}

fn decode_fixed<const N: usize>(field: &str, what: &str) -> CryptoResult<[u8; N]> {
    let bytes = STANDARD
        .decode(field)
        .map_err(|e| malformed(&format!("{what} is not valid base64: {e}")))?;
    bytes.try_into().map_err(|v: Vec<u8>| {
        malformed(&format!("{what} must be {N} bytes, got {}", v.len()))
    })
}

fn malformed(reason: &str) -> CryptoError {
    CryptoError::MalformedEnvelope(reason.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Envelope {
        Envelope {
            schema_version: SCHEMA_VERSION,
            sender_public: [1u8; KEY_SIZE],
            nonce: [2u8; NONCE_SIZE],
            ciphertext: vec![3u8; 40],
        }
    }

    #[test]
    fn encode_has_expected_shape() {
        let wire = sample().encode();
        assert!(wire.starts_with("ESEC[1:"));
        assert!(wire.ends_with(']'));
        assert_eq!(wire.matches(':').count(), 3);
    }

    #[test]
    fn decode_recovers_fields() {
        let env = sample();
        assert_eq!(Envelope::decode(env.encode().as_bytes()).unwrap(), env);
    }

    #[test]
    fn rejects_missing_brackets() {
        let wire = sample().encode();
        let stripped = &wire[..wire.len() - 1];
        assert!(Envelope::decode(stripped.as_bytes()).is_err());
        assert!(!is_envelope(b"plain value"));
    }

    #[test]
    fn rejects_unknown_version() {
        let wire = sample().encode().replacen("ESEC[1:", "ESEC[2:", 1);
        let err = Envelope::decode(wire.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("unsupported schema version"));
    }

    #[test]
    fn rejects_short_nonce() {
        let wire = format!(
            "ESEC[1:{}:{}:{}]",
            STANDARD.encode([1u8; KEY_SIZE]),
            STANDARD.encode([2u8; 12]),
            STANDARD.encode([3u8; 32]),
        );
        assert!(Envelope::decode(wire.as_bytes()).is_err());
    }

    #[test]
    fn rejects_missing_field() {
        let wire = format!(
            "ESEC[1:{}:{}]",
            STANDARD.encode([1u8; KEY_SIZE]),
            STANDARD.encode([2u8; NONCE_SIZE]),
        );
        assert!(matches!(
            Envelope::decode(wire.as_bytes()),
            Err(CryptoError::MalformedEnvelope(_))
        ));
    }
}
