//! YAML documents.
//!
//! The stream is walked with the `yaml-rust2` event parser. Mapping entries
//! decide skip status from their own key; sequences and nested mappings are
//! always descended into. Each transformed string scalar is rewritten in
//! double-quoted style at its source location, so arbitrary values
//! (newlines included) stay valid and the surrounding text, comments and
//! indentation are kept as written.
//!
//! Anchors and aliases are rejected: an alias would let one ciphertext stand
//! in for another without being authenticated at its own position.

mod locate;

use crate::error::{FormatError, FormatResult};
use crate::quote::double_quoted;
use crate::splice::{ReplacementSpan, apply_replacements};
use crate::{
    FieldValue, Format, FormatHandler, PUBLIC_KEY_FIELD, ScalarTransform,
    UNDERSCORED_PUBLIC_KEY_FIELD, decode_public_key, is_skipped, transformed_text,
};
use async_trait::async_trait;
use esec_crypto::KEY_SIZE;
use locate::{CharOffsets, PlainResolver, locate_scalar};
use tracing::debug;
use yaml_rust2::parser::{Event, Parser};
use yaml_rust2::scanner::TScalarStyle;
use yaml_rust2::{Yaml, YamlLoader};

const FORMAT_NAME: &str = "YAML";

#[derive(Debug, Clone, Copy, Default)]
pub struct YamlHandler;

#[async_trait]
impl FormatHandler for YamlHandler {
    fn format(&self) -> Format {
        Format::Eyaml
    }

    fn extract_public_key(&self, document: &[u8]) -> FormatResult<[u8; KEY_SIZE]> {
        let docs = YamlLoader::load_from_str(as_text(document)?)
            .map_err(|e| FormatError::parse(FORMAT_NAME, e))?;

        let field = |doc: &Yaml, name: &str| {
            let Yaml::Hash(map) = doc else {
                return None;
            };
            map.get(&Yaml::String(name.to_string())).map(|v| match v {
                Yaml::String(s) => FieldValue::Str(s.clone()),
                _ => FieldValue::NonString,
            })
        };

        for doc in &docs {
            let underscored = field(doc, UNDERSCORED_PUBLIC_KEY_FIELD);
            let plain = field(doc, PUBLIC_KEY_FIELD);
            if underscored.is_some() || plain.is_some() {
                return decode_public_key(underscored, plain);
            }
        }
        Err(FormatError::PublicKeyMissing)
    }

    async fn transform_scalars(
        &self,
        document: &[u8],
        transform: ScalarTransform,
    ) -> FormatResult<Vec<u8>> {
        let text = as_text(document)?;
        let mut walker = Walker::new(text, transform)?;
        let mut parser = Parser::new(text.chars());

        loop {
            let (event, mark) = parser
                .next_token()
                .map_err(|e| FormatError::parse(FORMAT_NAME, e))?;
            match event {
                Event::StreamEnd => break,
                Event::DocumentStart { .. } => walker.start_document(),
                Event::Alias(_) => return Err(FormatError::AnchorsNotSupported),
                Event::MappingStart(anchor, _) => {
                    reject_anchor(anchor)?;
                    walker.start_collection(Collection::Mapping, mark.col())?;
                }
                Event::SequenceStart(anchor, _) => {
                    reject_anchor(anchor)?;
                    walker.start_collection(Collection::Sequence, mark.col())?;
                }
                Event::MappingEnd | Event::SequenceEnd => walker.end_collection(),
                Event::Scalar(value, style, anchor, tag) => {
                    reject_anchor(anchor)?;
                    let tag_suffix = tag.as_ref().map(|t| t.suffix.as_str());
                    walker.scalar(&value, style, tag_suffix, mark.index(), mark.col())?;
                }
                _ => {}
            }
        }

        debug!(transformed = walker.spans.len(), "transformed YAML values");
        apply_replacements(document, walker.spans)
    }
}

fn reject_anchor(anchor_id: usize) -> FormatResult<()> {
    if anchor_id == 0 {
        Ok(())
    } else {
        Err(FormatError::AnchorsNotSupported)
    }
}

fn as_text(document: &[u8]) -> FormatResult<&str> {
    std::str::from_utf8(document).map_err(|_| FormatError::InvalidUtf8)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Collection {
    Mapping,
    Sequence,
}

struct Frame {
    kind: Collection,
    expecting_key: bool,
    skip_value: bool,
    /// Inside a complex mapping key; nothing here is transformed.
    in_key: bool,
    /// Column of the sequence's `-` or of the mapping's current key.
    indent: usize,
}

/// Where a node sits relative to its parent.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Role {
    Root,
    Key,
    Value { skip: bool },
    Item,
}

struct Walker<'a> {
    text: &'a str,
    offsets: CharOffsets,
    resolver: PlainResolver,
    transform: ScalarTransform,
    stack: Vec<Frame>,
    spans: Vec<ReplacementSpan>,
}

impl<'a> Walker<'a> {
    fn new(text: &'a str, transform: ScalarTransform) -> FormatResult<Self> {
        Ok(Self {
            text,
            offsets: CharOffsets::new(text),
            resolver: PlainResolver::new()?,
            transform,
            stack: Vec::new(),
            spans: Vec::new(),
        })
    }

    fn start_document(&mut self) {
        self.stack.clear();
    }

    fn role(&self) -> Role {
        match self.stack.last() {
            None => Role::Root,
            Some(f) if f.kind == Collection::Sequence => Role::Item,
            Some(f) if f.expecting_key => Role::Key,
            Some(f) => Role::Value { skip: f.skip_value },
        }
    }

    fn in_key(&self) -> bool {
        self.stack.last().is_some_and(|f| f.in_key)
    }

    /// Advances the parent mapping past the node that just ended.
    fn finish_node(&mut self) {
        if let Some(f) = self.stack.last_mut() {
            if f.kind == Collection::Mapping {
                f.expecting_key = !f.expecting_key;
            }
        }
    }

    fn start_collection(&mut self, kind: Collection, column: usize) -> FormatResult<()> {
        let role = self.role();
        if role == Role::Root && kind == Collection::Sequence {
            return Err(FormatError::TopLevelArrayNotSupported);
        }
        if role == Role::Key {
            if let Some(f) = self.stack.last_mut() {
                f.skip_value = false;
            }
        }
        let in_key = self.in_key() || role == Role::Key;
        self.stack.push(Frame {
            kind,
            expecting_key: true,
            skip_value: false,
            in_key,
            indent: column,
        });
        Ok(())
    }

    fn end_collection(&mut self) {
        self.stack.pop();
        self.finish_node();
    }

    fn scalar(
        &mut self,
        value: &str,
        style: TScalarStyle,
        tag_suffix: Option<&str>,
        char_index: usize,
        column: usize,
    ) -> FormatResult<()> {
        let eligible = match self.role() {
            // A bare top-level scalar has no key to host the public key.
            Role::Root => false,
            Role::Key => {
                if let Some(f) = self.stack.last_mut() {
                    f.skip_value = is_skipped(value);
                    f.indent = column;
                }
                false
            }
            Role::Value { skip } => !skip,
            Role::Item => true,
        };

        if eligible && !self.in_key() && self.is_string(value, style, tag_suffix) {
            self.replace(value, style, char_index)?;
        }
        self.finish_node();
        Ok(())
    }

    fn is_string(&self, value: &str, style: TScalarStyle, tag_suffix: Option<&str>) -> bool {
        if let Some(suffix) = tag_suffix {
            return suffix == "str";
        }
        match style {
            TScalarStyle::Plain => self.resolver.is_string(value),
            _ => true,
        }
    }

    fn replace(&mut self, value: &str, style: TScalarStyle, char_index: usize) -> FormatResult<()> {
        let mark = self.offsets.byte_offset(char_index)?;
        let parent_indent = self.stack.last().map_or(0, |f| f.indent);
        let span = locate_scalar(self.text, mark, style, value, parent_indent)?;

        let out = (self.transform)(value.as_bytes())?;
        let mut replacement = double_quoted(&transformed_text(out)?);
        // a block header's comment sits inside the replaced span
        if let Some(comment) = span.comment {
            replacement.push(' ');
            replacement.push_str(&self.text[comment]);
        }
        self.spans.push(ReplacementSpan::new(span.start, span.end, replacement));
        Ok(())
    }
}
