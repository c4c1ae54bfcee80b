//! JSON documents.
//!
//! The document is validated with `serde_json` but never re-serialized.
//! A byte scanner walks the original text, copying everything except
//! transformed string values into a [`Pipeline`]; each transformed value
//! runs on its own blocking worker.

mod pipeline;

pub use pipeline::Pipeline;

use crate::error::{FormatError, FormatResult};
use crate::{
    FieldValue, Format, FormatHandler, PUBLIC_KEY_FIELD, ScalarTransform,
    UNDERSCORED_PUBLIC_KEY_FIELD, decode_public_key, is_skipped, transformed_text,
};
use async_trait::async_trait;
use esec_crypto::KEY_SIZE;
use serde_json::Value;
use tracing::debug;

const FORMAT_NAME: &str = "JSON";

enum Frame {
    Object { expecting_key: bool, skip_value: bool },
    Array,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonHandler;

#[async_trait]
impl FormatHandler for JsonHandler {
    fn format(&self) -> Format {
        Format::Ejson
    }

    fn extract_public_key(&self, document: &[u8]) -> FormatResult<[u8; KEY_SIZE]> {
        let value: Value =
            serde_json::from_slice(document).map_err(|e| FormatError::parse(FORMAT_NAME, e))?;
        let Value::Object(map) = value else {
            return Err(FormatError::PublicKeyMissing);
        };

        let field = |name: &str| {
            map.get(name).map(|v| match v {
                Value::String(s) => FieldValue::Str(s.clone()),
                _ => FieldValue::NonString,
            })
        };
        decode_public_key(field(UNDERSCORED_PUBLIC_KEY_FIELD), field(PUBLIC_KEY_FIELD))
    }

    async fn transform_scalars(
        &self,
        document: &[u8],
        transform: ScalarTransform,
    ) -> FormatResult<Vec<u8>> {
        serde_json::from_slice::<Value>(document).map_err(|e| FormatError::parse(FORMAT_NAME, e))?;

        let mut pipeline = Pipeline::new();
        let mut stack: Vec<Frame> = Vec::new();
        let mut literal_start = 0;
        let mut i = 0;

        while i < document.len() {
            match document[i] {
                b'{' => stack.push(Frame::Object {
                    expecting_key: true,
                    skip_value: false,
                }),
                b'[' => stack.push(Frame::Array),
                b'}' | b']' => {
                    stack.pop();
                }
                b',' => {
                    if let Some(Frame::Object { expecting_key, .. }) = stack.last_mut() {
                        *expecting_key = true;
                    }
                }
                b':' => {
                    if let Some(Frame::Object { expecting_key, .. }) = stack.last_mut() {
                        *expecting_key = false;
                    }
                }
                b'"' => {
                    let end = string_end(document, i)?;
                    let raw = &document[i..end];
                    match stack.last_mut() {
                        Some(Frame::Object {
                            expecting_key: true,
                            skip_value,
                        }) => {
                            let key: String = decode_string(raw)?;
                            *skip_value = is_skipped(&key);
                        }
                        Some(Frame::Object {
                            skip_value: true, ..
                        }) => {}
                        _ => {
                            let value = decode_string(raw)?;
                            pipeline.append_literal(&document[literal_start..i]);
                            let transform = transform.clone();
                            pipeline.append_task(move || {
                                let out = transform(value.as_bytes())?;
                                let text = transformed_text(out)?;
                                serde_json::to_vec(&text)
                                    .map_err(|e| FormatError::parse(FORMAT_NAME, e))
                            });
                            literal_start = end;
                        }
                    }
                    i = end;
                    continue;
                }
                _ => {}
            }
            i += 1;
        }
        pipeline.append_literal(&document[literal_start..]);

        debug!(pending = pipeline.pending_count(), "dispatched JSON value transforms");
        pipeline.flush().await
    }
}

/// Index one past the closing quote of the string starting at `start`.
fn string_end(document: &[u8], start: usize) -> FormatResult<usize> {
    let mut i = start + 1;
    while i < document.len() {
        match document[i] {
            b'\\' => i += 2,
            b'"' => return Ok(i + 1),
            _ => i += 1,
        }
    }
    Err(FormatError::parse(FORMAT_NAME, "unterminated string"))
}

fn decode_string(raw: &[u8]) -> FormatResult<String> {
    serde_json::from_slice(raw).map_err(|e| FormatError::parse(FORMAT_NAME, e))
}
