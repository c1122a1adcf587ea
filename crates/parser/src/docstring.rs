//! Docstring extraction.
//!
//! A docstring is a plain (non-bytes, non-f) string literal that forms the
//! first statement of a module, class or function body. The returned text is
//! normalized the same way Python's `inspect.cleandoc` does it.

use tree_sitter::Node;

const TAB_WIDTH: usize = 8;

/// Docstring of a `module`, `class_definition` or `function_definition` node.
#[must_use]
pub fn docstring(node: Node<'_>, source: &str) -> Option<String> {
    let body = match node.kind() {
        "module" => node,
        _ => node.child_by_field_name("body")?,
    };

    let mut cursor = body.walk();
    let first = body
        .named_children(&mut cursor)
        .find(|child| child.kind() != "comment")?;
    if first.kind() != "expression_statement" || first.named_child_count() != 1 {
        return None;
    }

    let expr = first.named_child(0)?;
    let raw = match expr.kind() {
        "string" => string_literal_value(source.get(expr.byte_range())?)?,
        "concatenated_string" => {
            let mut parts = String::new();
            let mut cursor = expr.walk();
            for part in expr.named_children(&mut cursor) {
                parts.push_str(&string_literal_value(source.get(part.byte_range())?)?);
            }
            parts
        }
        _ => return None,
    };

    Some(clean_docstring(&raw))
}

/// Value of a single Python string literal, or `None` for bytes and f-strings.
#[must_use]
pub fn string_literal_value(literal: &str) -> Option<String> {
    let quote_start = literal.find(['"', '\''])?;
    let prefix = literal[..quote_start].to_ascii_lowercase();
    if prefix.contains('f') || prefix.contains('b') {
        return None;
    }
    let raw = prefix.contains('r');

    let body = &literal[quote_start..];
    let quote = if body.starts_with("\"\"\"") {
        "\"\"\""
    } else if body.starts_with("'''") {
        "'''"
    } else {
        &body[..1]
    };
    let inner = body.strip_prefix(quote)?.strip_suffix(quote)?;

    if raw {
        Some(inner.to_string())
    } else {
        Some(unescape(inner))
    }
}

/// Resolve backslash escapes the way Python does for `str` literals.
/// `\N{...}` named escapes are kept verbatim (no Unicode name table), and so
/// are unknown or malformed escapes.
fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(escape) = chars.next() else {
            out.push('\\');
            break;
        };
        match escape {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'a' => out.push('\u{07}'),
            'b' => out.push('\u{08}'),
            'f' => out.push('\u{0c}'),
            'v' => out.push('\u{0b}'),
            '\\' | '\'' | '"' => out.push(escape),
            '\n' => {}
            '\r' => {
                chars.next_if_eq(&'\n');
            }
            '0'..='7' => {
                let mut digits = String::from(escape);
                while digits.len() < 3 {
                    match chars.next_if(|d| matches!(d, '0'..='7')) {
                        Some(d) => digits.push(d),
                        None => break,
                    }
                }
                match u32::from_str_radix(&digits, 8).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    None => {
                        out.push('\\');
                        out.push_str(&digits);
                    }
                }
            }
            'x' | 'u' | 'U' => {
                let width = match escape {
                    'x' => 2,
                    'u' => 4,
                    _ => 8,
                };
                let mut digits = String::with_capacity(width);
                while digits.len() < width {
                    match chars.next_if(char::is_ascii_hexdigit) {
                        Some(d) => digits.push(d),
                        None => break,
                    }
                }
                let decoded = (digits.len() == width)
                    .then(|| u32::from_str_radix(&digits, 16).ok())
                    .flatten()
                    .and_then(char::from_u32);
                match decoded {
                    Some(decoded) => out.push(decoded),
                    None => {
                        out.push('\\');
                        out.push(escape);
                        out.push_str(&digits);
                    }
                }
            }
            other => {
                out.push('\\');
                out.push(other);
            }
        }
    }
    out
}

/// Port of `inspect.cleandoc`: expand tabs, strip the first line, remove the
/// common indentation of the remaining lines and drop blank leading/trailing
/// lines.
#[must_use]
pub fn clean_docstring(raw: &str) -> String {
    let expanded = expand_tabs(raw);
    let mut lines: Vec<String> = expanded.split('\n').map(str::to_string).collect();

    let margin = lines
        .iter()
        .skip(1)
        .filter_map(|line| {
            let content = line.trim_start().chars().count();
            (content > 0).then(|| line.chars().count() - content)
        })
        .min();

    if let Some(first) = lines.first_mut() {
        *first = first.trim_start().to_string();
    }
    if let Some(margin) = margin {
        for line in lines.iter_mut().skip(1) {
            *line = line.chars().skip(margin).collect();
        }
    }

    while lines.last().is_some_and(String::is_empty) {
        lines.pop();
    }
    let leading = lines.iter().take_while(|line| line.is_empty()).count();
    lines.drain(..leading);

    lines.join("\n")
}

fn expand_tabs(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut column = 0;
    for c in text.chars() {
        match c {
            '\t' => {
                let pad = TAB_WIDTH - column % TAB_WIDTH;
                out.extend(std::iter::repeat(' ').take(pad));
                column += pad;
            }
            '\n' | '\r' => {
                out.push(c);
                column = 0;
            }
            _ => {
                out.push(c);
                column += 1;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SourceParser;
    use pretty_assertions::assert_eq;

    fn first_definition_docstring(code: &str) -> Option<String> {
        let mut parser = SourceParser::new().unwrap();
        let parsed = parser.parse(code, "doc.py").unwrap();
        let node = parsed.root().named_child(0).unwrap();
        docstring(node, parsed.source())
    }

    #[test]
    fn test_triple_quoted_docstring_is_cleaned() {
        let code = r#"
def compute(x):
    """Compute things.

        Indented detail.
    Back to margin.
    """
    return x
"#;
        assert_eq!(
            first_definition_docstring(code).as_deref(),
            Some("Compute things.\n\n    Indented detail.\nBack to margin.")
        );
    }

    #[test]
    fn test_class_docstring_after_comment() {
        let code = "class A:\n    # note\n    'Single quoted.'\n    x = 1\n";
        assert_eq!(
            first_definition_docstring(code).as_deref(),
            Some("Single quoted.")
        );
    }

    #[test]
    fn test_no_docstring_when_first_statement_is_code() {
        let code = "def f():\n    x = 'not a docstring'\n";
        assert_eq!(first_definition_docstring(code), None);
    }

    #[test]
    fn test_bytes_and_fstrings_are_not_docstrings() {
        assert_eq!(string_literal_value("b'raw'"), None);
        assert_eq!(string_literal_value("f\"{x}\""), None);
        assert_eq!(string_literal_value("r'a\\n'").as_deref(), Some("a\\n"));
        assert_eq!(string_literal_value("'a\\n'").as_deref(), Some("a\n"));
        assert_eq!(string_literal_value("\"\"").as_deref(), Some(""));
    }

    #[test]
    fn test_numeric_escapes_are_decoded() {
        assert_eq!(
            string_literal_value(r"'caf\xe9 \u00fcber \U0001F600 \101\0'").as_deref(),
            Some("café über 😀 A\0")
        );
        assert_eq!(string_literal_value(r"'\a\b\f\v'").as_deref(), Some("\u{07}\u{08}\u{0c}\u{0b}"));
        assert_eq!(
            string_literal_value(r"'\N{BULLET} \q \xZ'").as_deref(),
            Some(r"\N{BULLET} \q \xZ")
        );
        assert_eq!(string_literal_value("'a\\\r\nb'").as_deref(), Some("ab"));
    }

    #[test]
    fn test_clean_docstring_strips_blank_edges() {
        assert_eq!(clean_docstring("\n\n   Summary.\n   \n"), "Summary.");
        assert_eq!(clean_docstring("One line"), "One line");
    }
}
