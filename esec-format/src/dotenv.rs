//! Dotenv documents.
//!
//! Line oriented: blank lines and `#` comments pass through verbatim, every
//! other line is split on its first `=`. Only the trimmed value is replaced,
//! so spacing around `=`, `export` prefixes and line endings survive.

use crate::error::{FormatError, FormatResult};
use crate::{
    FieldValue, Format, FormatHandler, PUBLIC_KEY_FIELD, ScalarTransform,
    UNDERSCORED_PUBLIC_KEY_FIELD, decode_public_key, is_skipped,
};
use async_trait::async_trait;
use esec_crypto::KEY_SIZE;
use std::ops::Range;
use tracing::debug;

/// One parsed line of a dotenv document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line<'a> {
    /// Blank line, comment, or text without `=` that is passed through.
    Verbatim,
    Pair {
        /// Trimmed key with any `export ` prefix removed.
        key: &'a str,
        /// Trimmed raw value, quotes included.
        value: &'a str,
        /// Byte range of `value` within the line.
        value_range: Range<usize>,
    },
}

/// Classifies a single line (without its line terminator).
///
/// `number` is 1-based and only used for error reporting.
pub fn parse_line(line: &str, number: usize) -> FormatResult<Line<'_>> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(Line::Verbatim);
    }

    let Some(eq) = line.find('=') else {
        if trimmed != "export" && is_bare_identifier(trimmed) {
            return Err(FormatError::MalformedDocumentEntry {
                line: number,
                key: trimmed.to_string(),
            });
        }
        return Ok(Line::Verbatim);
    };

    let key = line[..eq].trim();
    let key = key.strip_prefix("export ").map(str::trim_start).unwrap_or(key);

    let rest = &line[eq + 1..];
    let lead = rest.len() - rest.trim_start().len();
    let value = rest.trim();
    let start = eq + 1 + lead;

    Ok(Line::Pair {
        key,
        value,
        value_range: start..start + value.len(),
    })
}

/// Looks like `NAME` on its own: most likely a pair missing its `=`.
fn is_bare_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

/// Parses `text` into `(key, value)` pairs with surrounding quotes removed.
fn parse_entries(text: &str) -> FormatResult<Vec<(String, String)>> {
    let mut entries = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        if let Line::Pair { key, value, .. } = parse_line(raw, idx + 1)? {
            entries.push((key.to_string(), unquote(value).to_string()));
        }
    }
    Ok(entries)
}

/// Strips one pair of matching single or double quotes.
fn unquote(value: &str) -> &str {
    for q in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(q) && value.ends_with(q) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

fn split_terminator(raw: &str) -> (&str, &str) {
    let body = raw
        .strip_suffix("\r\n")
        .or_else(|| raw.strip_suffix('\n'))
        .unwrap_or(raw);
    (body, &raw[body.len()..])
}

fn as_text(document: &[u8]) -> FormatResult<&str> {
    std::str::from_utf8(document).map_err(|_| FormatError::InvalidUtf8)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DotenvHandler;

#[async_trait]
impl FormatHandler for DotenvHandler {
    fn format(&self) -> Format {
        Format::Dotenv
    }

    fn extract_public_key(&self, document: &[u8]) -> FormatResult<[u8; KEY_SIZE]> {
        let mut underscored = None;
        let mut plain = None;
        for (key, value) in parse_entries(as_text(document)?)? {
            if key == UNDERSCORED_PUBLIC_KEY_FIELD && underscored.is_none() {
                underscored = Some(FieldValue::Str(value));
            } else if key == PUBLIC_KEY_FIELD && plain.is_none() {
                plain = Some(FieldValue::Str(value));
            }
        }
        decode_public_key(underscored, plain)
    }

    async fn transform_scalars(
        &self,
        document: &[u8],
        transform: ScalarTransform,
    ) -> FormatResult<Vec<u8>> {
        let text = as_text(document)?;
        let mut out = Vec::with_capacity(document.len());
        let mut transformed = 0usize;

        for (idx, raw) in text.split_inclusive('\n').enumerate() {
            let (body, terminator) = split_terminator(raw);
            match parse_line(body, idx + 1)? {
                Line::Pair {
                    key, value_range, ..
                } if !is_skipped(key) => {
                    let new_value = transform(body[value_range.clone()].as_bytes())?;
                    out.extend_from_slice(body[..value_range.start].as_bytes());
                    out.extend_from_slice(&new_value);
                    out.extend_from_slice(body[value_range.end..].as_bytes());
                    out.extend_from_slice(terminator.as_bytes());
                    transformed += 1;
                }
                _ => out.extend_from_slice(raw.as_bytes()),
            }
        }

        debug!(transformed, "transformed dotenv values");
        Ok(out)
    }
}
