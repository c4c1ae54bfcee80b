//! TOML documents.
//!
//! Parsed with `toml_edit::ImDocument`, which keeps the byte span of every
//! value. String values are replaced in the original buffer through
//! [`ReplacementSpan`]s; nothing else is re-serialized, so table headers,
//! comments, numbers, booleans and datetimes stay byte-identical.

use crate::error::{FormatError, FormatResult};
use crate::quote::double_quoted;
use crate::splice::{ReplacementSpan, apply_replacements};
use crate::{
    FieldValue, Format, FormatHandler, PUBLIC_KEY_FIELD, ScalarTransform,
    UNDERSCORED_PUBLIC_KEY_FIELD, decode_public_key, is_skipped, transformed_text,
};
use async_trait::async_trait;
use esec_crypto::KEY_SIZE;
use toml_edit::{ImDocument, Item, Table, Value};
use tracing::debug;

const FORMAT_NAME: &str = "TOML";

#[derive(Debug, Clone, Copy, Default)]
pub struct TomlHandler;

#[async_trait]
impl FormatHandler for TomlHandler {
    fn format(&self) -> Format {
        Format::Etoml
    }

    fn extract_public_key(&self, document: &[u8]) -> FormatResult<[u8; KEY_SIZE]> {
        let doc = parse(document)?;
        let root = doc.as_table();

        let field = |name: &str| {
            root.get(name).map(|item| match item.as_str() {
                Some(s) => FieldValue::Str(s.to_string()),
                None => FieldValue::NonString,
            })
        };
        decode_public_key(field(UNDERSCORED_PUBLIC_KEY_FIELD), field(PUBLIC_KEY_FIELD))
    }

    async fn transform_scalars(
        &self,
        document: &[u8],
        transform: ScalarTransform,
    ) -> FormatResult<Vec<u8>> {
        let doc = parse(document)?;
        let mut collector = SpanCollector {
            source: document,
            transform,
            spans: Vec::new(),
        };
        collector.visit_table(doc.as_table())?;

        debug!(transformed = collector.spans.len(), "transformed TOML values");
        apply_replacements(document, collector.spans)
    }
}

fn parse(document: &[u8]) -> FormatResult<ImDocument<&str>> {
    let text = std::str::from_utf8(document).map_err(|_| FormatError::InvalidUtf8)?;
    ImDocument::parse(text).map_err(|e| FormatError::parse(FORMAT_NAME, e))
}

struct SpanCollector<'a> {
    source: &'a [u8],
    transform: ScalarTransform,
    spans: Vec<ReplacementSpan>,
}

impl SpanCollector<'_> {
    fn visit_table(&mut self, table: &Table) -> FormatResult<()> {
        for (key, item) in table.iter() {
            match item {
                Item::Value(value) => self.visit_value(value, is_skipped(key))?,
                Item::Table(sub) => self.visit_table(sub)?,
                Item::ArrayOfTables(tables) => {
                    for sub in tables.iter() {
                        self.visit_table(sub)?;
                    }
                }
                Item::None => {}
            }
        }
        Ok(())
    }

    fn visit_value(&mut self, value: &Value, skip: bool) -> FormatResult<()> {
        match value {
            Value::String(s) if !skip => {
                let (start, end) = self.string_span(value)?;
                let out = (self.transform)(s.value().as_bytes())?;
                let quoted = double_quoted(&transformed_text(out)?);
                self.spans.push(ReplacementSpan::new(start, end, quoted));
            }
            Value::Array(items) => {
                for item in items.iter() {
                    self.visit_value(item, false)?;
                }
            }
            Value::InlineTable(table) => {
                for (key, item) in table.iter() {
                    self.visit_value(item, is_skipped(key))?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Byte range of a string literal, quotes included.
    ///
    /// Parser spans are checked against the source rather than trusted:
    /// surrounding whitespace is trimmed and the range must open and close
    /// on a quote character.
    fn string_span(&self, value: &Value) -> FormatResult<(usize, usize)> {
        let span = value
            .span()
            .ok_or_else(|| FormatError::parse(FORMAT_NAME, "string value has no source span"))?;
        let invalid = || FormatError::InvalidReplacementBounds {
            start: span.start,
            end: span.end,
            len: self.source.len(),
        };
        if span.start > span.end || span.end > self.source.len() {
            return Err(invalid());
        }

        let mut start = span.start;
        let mut end = span.end;
        while start < end && self.source[start].is_ascii_whitespace() {
            start += 1;
        }
        while end > start && self.source[end - 1].is_ascii_whitespace() {
            end -= 1;
        }

        let is_quote = |b: u8| b == b'"' || b == b'\'';
        if end - start < 2 || !is_quote(self.source[start]) || !is_quote(self.source[end - 1]) {
            return Err(invalid());
        }
        Ok((start, end))
    }
}
