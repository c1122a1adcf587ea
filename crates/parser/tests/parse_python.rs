use coderag_parser::{docstring, ParserError, SourceParser};

#[test]
fn parses_modern_python_constructs() {
    let mut parser = SourceParser::new().expect("parser");
    let source = r#"
import asyncio


@dataclass(frozen=True)
class Point:
    x: T

    async def fetch(self, *, timeout: float = 1.0) -> "Point":
        async with session() as s:
            return await s.get(f"{self.x!r}")

    def walk(self):
        match self.x:
            case [first, *rest]:
                return first
            case _:
                return (y := 1)
"#;
    let parsed = parser.parse(source, "modern.py").expect("valid python");
    assert_eq!(parsed.root().kind(), "module");
    assert!(!parsed.root().has_error());
}

#[test]
fn rejects_python2_statements() {
    let mut parser = SourceParser::new().expect("parser");

    for source in [
        "def legacy():\n    print 'hello'\n",
        "def legacy():\n    exec 'x = 1'\n",
    ] {
        let err = parser.parse(source, "legacy.py").err().expect("syntax error");
        assert!(matches!(err, ParserError::ParseError { .. }), "{source:?}");
        assert!(err.to_string().contains("line "), "{err}");
    }

    assert!(parser.parse("print('hello', end='')\n", "modern.py").is_ok());
}

#[test]
fn reports_unclosed_brackets() {
    let mut parser = SourceParser::new().expect("parser");
    let err = parser
        .parse("def f():\n    return [1, 2\n", "unclosed.py")
        .err()
        .expect("syntax error");

    assert!(matches!(err, ParserError::ParseError { .. }));
    assert!(err.to_string().starts_with("Parse error in unclosed.py"));
}

#[test]
fn module_docstring_is_extracted() {
    let mut parser = SourceParser::new().expect("parser");
    let parsed = parser
        .parse("# header\n'''Module summary.\n\n    Details.\n'''\n", "doc.py")
        .expect("valid python");

    assert_eq!(
        docstring(parsed.root(), parsed.source()).as_deref(),
        Some("Module summary.\n\nDetails.")
    );
}

#[test]
fn non_ascii_source_keeps_exact_text() {
    let mut parser = SourceParser::new().expect("parser");
    let parsed = parser
        .parse("def größe():\n    return 'ü'\n", "unicode.py")
        .expect("valid python");

    let function = parsed.root().named_child(0).expect("function");
    let name = function.child_by_field_name("name").expect("name");
    assert_eq!(parsed.text(name), "größe");
}
