//! Shared test helpers for format handler tests.
#![allow(dead_code)]

use esec_crypto::CryptoError;
use esec_format::{FormatHandler, FormatResult, ScalarTransform};
use std::sync::Arc;

/// Public key used by test documents.
pub const PUBLIC_HEX: &str = "493ffcfa5a3cc1db1e39a0a3c9e2ae37c0bfa3a8e2f5b6d4c71a1b2c3d4e171d";

/// Wraps every value as `ENC(<value>)`.
pub fn wrap() -> ScalarTransform {
    Arc::new(|v: &[u8]| {
        let mut out = b"ENC(".to_vec();
        out.extend_from_slice(v);
        out.push(b')');
        Ok(out)
    })
}

/// Inverse of [`wrap`]; fails on values it did not produce.
pub fn unwrap_value() -> ScalarTransform {
    Arc::new(|v: &[u8]| {
        v.strip_prefix(b"ENC(")
            .and_then(|rest| rest.strip_suffix(b")"))
            .map(<[u8]>::to_vec)
            .ok_or_else(|| CryptoError::MalformedEnvelope("not wrapped".into()))
    })
}

/// Fails on the value `poison`, passes everything else through.
pub fn fail_on(poison: &'static str) -> ScalarTransform {
    Arc::new(move |v: &[u8]| {
        if v == poison.as_bytes() {
            Err(CryptoError::DecryptionFailed)
        } else {
            Ok(v.to_vec())
        }
    })
}

pub async fn run(
    handler: &dyn FormatHandler,
    document: &str,
    transform: ScalarTransform,
) -> FormatResult<String> {
    let out = handler.transform_scalars(document.as_bytes(), transform).await?;
    Ok(String::from_utf8(out).unwrap())
}
