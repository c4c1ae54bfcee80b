//! Byte-range replacement over an original document buffer.
//!
//! Walkers that locate scalars by byte offset record one
//! [`ReplacementSpan`] per value and splice them all at the end, back to
//! front, so offsets of earlier spans stay valid.

use crate::error::{FormatError, FormatResult};

/// Replace `original[start..end]` with `new_bytes`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplacementSpan {
    pub start: usize,
    pub end: usize,
    pub new_bytes: Vec<u8>,
}

impl ReplacementSpan {
    pub fn new(start: usize, end: usize, new_bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            start,
            end,
            new_bytes: new_bytes.into(),
        }
    }
}

/// Applies `spans` to a copy of `original`.
///
/// Spans are sorted by descending start offset. Every span is bounds-checked
/// before it is applied; a span that is inverted, runs past the buffer, or
/// overlaps the span after it fails the whole operation.
pub fn apply_replacements(
    original: &[u8],
    mut spans: Vec<ReplacementSpan>,
) -> FormatResult<Vec<u8>> {
    spans.sort_by(|a, b| b.start.cmp(&a.start).then(b.end.cmp(&a.end)));

    let mut out = original.to_vec();
    let mut limit = original.len();
    for span in spans {
        if span.start > span.end || span.end > limit {
            return Err(FormatError::InvalidReplacementBounds {
                start: span.start,
                end: span.end,
                len: original.len(),
            });
        }
        out.splice(span.start..span.end, span.new_bytes);
        limit = span.start;
    }
    Ok(out)
}
