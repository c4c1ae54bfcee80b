//! Locating scalar tokens in YAML source text.
//!
//! The event parser reports roughly where a scalar starts but not where it
//! ends. For block scalars the reported position may be the `|`/`>` header
//! or the first content character, depending on the header's indicators.
//! The exact token range is recovered from the source according to style.

use crate::error::{FormatError, FormatResult};
use regex_lite::Regex;
use std::ops::Range;
use yaml_rust2::scanner::TScalarStyle;

const FORMAT_NAME: &str = "YAML";

/// Maps parser character indices to byte offsets.
pub(crate) struct CharOffsets {
    offsets: Vec<usize>,
}

impl CharOffsets {
    pub(crate) fn new(text: &str) -> Self {
        let mut offsets: Vec<usize> = text.char_indices().map(|(b, _)| b).collect();
        offsets.push(text.len());
        Self { offsets }
    }

    pub(crate) fn byte_offset(&self, char_index: usize) -> FormatResult<usize> {
        self.offsets.get(char_index).copied().ok_or_else(|| {
            FormatError::parse(FORMAT_NAME, format!("position {char_index} is past end of input"))
        })
    }
}

/// Source range of one scalar token.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct ScalarSpan {
    pub(crate) start: usize,
    pub(crate) end: usize,
    /// Comment on a block scalar's header line, which lies inside the span.
    pub(crate) comment: Option<Range<usize>>,
}

/// Finds the scalar reported at byte offset `mark`.
///
/// `value` is the decoded scalar, used to walk plain scalars that fold
/// across lines. `parent_indent` is the indentation of the mapping or
/// sequence owning the scalar; block scalar content must be deeper.
pub(crate) fn locate_scalar(
    text: &str,
    mark: usize,
    style: TScalarStyle,
    value: &str,
    parent_indent: usize,
) -> FormatResult<ScalarSpan> {
    let bytes = text.as_bytes();
    let inline = |end| ScalarSpan {
        start: mark,
        end,
        comment: None,
    };
    match (style, bytes.get(mark)) {
        (TScalarStyle::DoubleQuoted, Some(b'"')) => quoted_end(bytes, mark, b'"').map(inline),
        (TScalarStyle::SingleQuoted, Some(b'\'')) => quoted_end(bytes, mark, b'\'').map(inline),
        (TScalarStyle::Plain, Some(_)) => plain_end(bytes, mark, value).map(inline),
        (TScalarStyle::Literal | TScalarStyle::Folded, _) => block_span(bytes, mark, parent_indent),
        _ => Err(locate_error(mark)),
    }
}

fn quoted_end(bytes: &[u8], start: usize, quote: u8) -> FormatResult<usize> {
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if quote == b'"' => i += 2,
            // '' is an escaped quote inside a single-quoted scalar
            b'\'' if quote == b'\'' && bytes.get(i + 1) == Some(&b'\'') => i += 2,
            b if b == quote => return Ok(i + 1),
            _ => i += 1,
        }
    }
    Err(locate_error(start))
}

/// Parsed `|`/`>` header line.
#[derive(Debug, PartialEq, Eq)]
struct Header {
    /// Explicit indentation indicator.
    indent: Option<usize>,
    /// Offset of a trailing `#` comment within the header text.
    comment: Option<usize>,
}

/// Parses `text` (an indicator up to the end of its line) as a block
/// scalar header: indicator, optional chomping and indentation indicators
/// in either order, then whitespace and an optional comment.
fn parse_header(text: &[u8]) -> Option<Header> {
    if !matches!(text.first(), Some(b'|' | b'>')) {
        return None;
    }
    let mut chomping = false;
    let mut indent = None;
    let mut i = 1;
    while i < text.len() {
        match text[i] {
            b'+' | b'-' if !chomping => chomping = true,
            b'1'..=b'9' if indent.is_none() => indent = Some(usize::from(text[i] - b'0')),
            _ => break,
        }
        i += 1;
    }

    let indicators_end = i;
    while i < text.len() && matches!(text[i], b' ' | b'\t') {
        i += 1;
    }
    match text.get(i) {
        None => Some(Header { indent, comment: None }),
        Some(b'\r') if i + 1 == text.len() => Some(Header { indent, comment: None }),
        Some(b'#') if i > indicators_end => Some(Header {
            indent,
            comment: Some(i),
        }),
        _ => None,
    }
}

/// Position of a block scalar header in `line`, at or before `limit`.
fn find_header(line: &[u8], limit: usize) -> Option<usize> {
    for i in 0..line.len().min(limit + 1) {
        let after_space = i == 0 || matches!(line[i - 1], b' ' | b'\t');
        if line[i] == b'#' && after_space {
            return None;
        }
        if matches!(line[i], b'|' | b'>') && after_space && parse_header(&line[i..]).is_some() {
            return Some(i);
        }
    }
    None
}

/// Byte offset of the header owning the block scalar reported at `mark`.
///
/// A mark at the start of a line's content belongs to the header on the
/// previous non-blank line when there is one; otherwise the header is on
/// the mark's own line.
fn block_header(bytes: &[u8], mark: usize) -> Option<usize> {
    let mark = mark.min(bytes.len());
    let start = line_start(bytes, mark);

    if bytes[start..mark].iter().all(|b| matches!(b, b' ' | b'\t')) {
        let mut next = start;
        while next > 0 {
            let prev = line_start(bytes, next - 1);
            let line = &bytes[prev..next - 1];
            if !is_blank(line) {
                if let Some(p) = find_header(line, line.len()) {
                    return Some(prev + p);
                }
                break;
            }
            next = prev;
        }
    }

    let line = &bytes[start..line_end(bytes, start)];
    find_header(line, mark - start).map(|p| start + p)
}

/// Literal and folded scalars: the header line plus every following line
/// that is blank or indented at least as deep as the content. Content
/// indentation is the header's explicit indicator relative to the parent,
/// or else that of the first non-blank line, which must be deeper than
/// the parent. Trailing blank lines are left outside the span.
fn block_span(bytes: &[u8], mark: usize, parent_indent: usize) -> FormatResult<ScalarSpan> {
    let start = block_header(bytes, mark).ok_or_else(|| locate_error(mark))?;
    let header_end = line_end(bytes, start);
    let header = parse_header(&bytes[start..header_end]).ok_or_else(|| locate_error(mark))?;

    let mut required = header.indent.map(|n| parent_indent + n);
    let mut end = header_end;
    let mut pos = header_end;
    while pos < bytes.len() {
        let next_start = pos + 1;
        let next_end = line_end(bytes, next_start);
        let line = &bytes[next_start..next_end];
        if is_blank(line) {
            pos = next_end;
            continue;
        }
        let indent = indent_of(line);
        if indent <= parent_indent || indent < *required.get_or_insert(indent) {
            break;
        }
        end = next_end;
        pos = next_end;
    }

    if end > start && bytes[end - 1] == b'\r' {
        end -= 1;
    }
    let comment = header.comment.map(|c| {
        let comment_start = start + c;
        let mut comment_end = header_end;
        while comment_end > comment_start && bytes[comment_end - 1].is_ascii_whitespace() {
            comment_end -= 1;
        }
        comment_start..comment_end
    });
    Ok(ScalarSpan { start, end, comment })
}

/// Plain scalars match the decoded value character for character, except
/// that a folded line break in the source shows up as a single space (or
/// as newlines for blank lines) in the value.
fn plain_end(bytes: &[u8], start: usize, value: &str) -> FormatResult<usize> {
    let v = value.as_bytes();
    let mut i = start;
    let mut j = 0;
    while j < v.len() {
        match bytes.get(i) {
            Some(&b) if b == v[j] => {
                i += 1;
                j += 1;
            }
            Some(&b) if matches!(v[j], b' ' | b'\n') && b.is_ascii_whitespace() => {
                let run_start = i;
                while bytes.get(i).is_some_and(|b| b.is_ascii_whitespace()) {
                    i += 1;
                }
                if !bytes[run_start..i].contains(&b'\n') {
                    return Err(locate_error(start));
                }
                j += 1;
                while v.get(j) == Some(&b'\n') {
                    j += 1;
                }
            }
            _ => return Err(locate_error(start)),
        }
    }
    Ok(i)
}

fn line_start(bytes: &[u8], at: usize) -> usize {
    bytes[..at.min(bytes.len())]
        .iter()
        .rposition(|b| *b == b'\n')
        .map_or(0, |p| p + 1)
}

fn line_end(bytes: &[u8], from: usize) -> usize {
    bytes[from.min(bytes.len())..]
        .iter()
        .position(|b| *b == b'\n')
        .map_or(bytes.len(), |p| from + p)
}

fn is_blank(line: &[u8]) -> bool {
    line.iter().all(|b| b.is_ascii_whitespace())
}

fn indent_of(line: &[u8]) -> usize {
    line.iter().take_while(|b| **b == b' ').count()
}

fn locate_error(start: usize) -> FormatError {
    FormatError::parse(FORMAT_NAME, format!("cannot locate scalar at byte {start}"))
}

/// YAML 1.2 core schema resolution for untagged plain scalars.
pub(crate) struct PlainResolver {
    int: Regex,
    float: Regex,
}

impl PlainResolver {
    pub(crate) fn new() -> FormatResult<Self> {
        let compile =
            |re: &str| Regex::new(re).map_err(|e| FormatError::parse(FORMAT_NAME, format!("regex error: {e}")));
        Ok(Self {
            int: compile(r"^([-+]?[0-9]+|0o[0-7]+|0x[0-9a-fA-F]+)$")?,
            float: compile(
                r"^([-+]?(\.[0-9]+|[0-9]+(\.[0-9]*)?)([eE][-+]?[0-9]+)?|[-+]?\.(inf|Inf|INF)|\.(nan|NaN|NAN))$",
            )?,
        })
    }

    /// True when a plain scalar resolves to a string rather than a null,
    /// boolean, integer or float.
    pub(crate) fn is_string(&self, value: &str) -> bool {
        !matches!(
            value,
            "" | "~" | "null" | "Null" | "NULL" | "true" | "True" | "TRUE" | "false" | "False" | "FALSE"
        ) && !self.int.is_match(value)
            && !self.float.is_match(value)
    }
}
