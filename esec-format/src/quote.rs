//! Double-quoted string rendering shared by the YAML and TOML walkers.
//!
//! The escape set is the intersection of what TOML basic strings and YAML
//! double-quoted scalars accept, so one renderer serves both grammars.

/// Renders `value` as a double-quoted string.
pub(crate) fn double_quoted(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            c if c.is_control() => out.push_str(&format!("\\u{:04X}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_wrapped() {
        assert_eq!(double_quoted("abc"), "\"abc\"");
    }

    #[test]
    fn quotes_and_backslashes_are_escaped() {
        assert_eq!(double_quoted(r#"a"b\c"#), r#""a\"b\\c""#);
    }

    #[test]
    fn control_characters_are_escaped() {
        assert_eq!(double_quoted("a\nb\tc\u{1}"), "\"a\\nb\\tc\\u0001\"");
        assert_eq!(double_quoted("\u{7f}"), "\"\\u007F\"");
    }

    #[test]
    fn non_ascii_passes_through() {
        assert_eq!(double_quoted("héllo"), "\"héllo\"");
    }
}
