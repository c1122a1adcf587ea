use crate::error::{ParserError, Result};
use tree_sitter::{Node, Parser, Tree};

const BYTE_ORDER_MARK: char = '\u{feff}';

/// Python 2 statements the grammar still accepts
const LEGACY_STATEMENTS: &[&str] = &["print_statement", "exec_statement"];

/// A syntactically valid Python file together with its syntax tree
pub struct ParsedSource {
    source: String,
    tree: Tree,
}

impl ParsedSource {
    /// Raw source text (byte order mark removed)
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Syntax tree
    #[must_use]
    pub const fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Root `module` node
    #[must_use]
    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    /// Exact source text spanned by a node of this tree
    #[must_use]
    pub fn text(&self, node: Node<'_>) -> &str {
        self.source.get(node.byte_range()).unwrap_or_default()
    }
}

/// Python source parser backed by tree-sitter
pub struct SourceParser {
    parser: Parser,
}

impl SourceParser {
    pub fn new() -> Result<Self> {
        let mut parser = Parser::new();
        let language: tree_sitter::Language = tree_sitter_python::LANGUAGE.into();
        parser
            .set_language(&language)
            .map_err(|e| ParserError::tree_sitter(format!("Failed to set language: {e}")))?;

        Ok(Self { parser })
    }

    /// Parse `source`, failing with [`ParserError::ParseError`] when the text
    /// is not valid Python. `filename` is only used for diagnostics.
    pub fn parse(&mut self, source: impl Into<String>, filename: &str) -> Result<ParsedSource> {
        let mut source = source.into();
        if source.starts_with(BYTE_ORDER_MARK) {
            source.drain(..BYTE_ORDER_MARK.len_utf8());
        }

        let tree = self
            .parser
            .parse(&source, None)
            .ok_or_else(|| ParserError::NoTree(filename.to_string()))?;

        if let Some(bad) = first_syntax_error(tree.root_node()) {
            let position = bad.start_position();
            let message = if bad.is_missing() {
                format!(
                    "missing `{}` at line {}, column {}",
                    bad.kind(),
                    position.row + 1,
                    position.column + 1
                )
            } else if is_legacy_statement(bad) {
                format!(
                    "Python 2 `{}` statement at line {}, column {}",
                    bad.child(0).map_or("print", |keyword| keyword.kind()),
                    position.row + 1,
                    position.column + 1
                )
            } else {
                format!(
                    "invalid syntax at line {}, column {}",
                    position.row + 1,
                    position.column + 1
                )
            };
            return Err(ParserError::parse(filename, message));
        }

        Ok(ParsedSource { source, tree })
    }
}

fn is_legacy_statement(node: Node<'_>) -> bool {
    LEGACY_STATEMENTS.contains(&node.kind())
}

/// First ERROR, MISSING or Python 2 statement node in document order
fn first_syntax_error(root: Node<'_>) -> Option<Node<'_>> {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() || is_legacy_statement(node) {
            return Some(node);
        }
        if node.child_count() == 0 {
            continue;
        }

        let mut cursor = node.walk();
        let children: Vec<_> = node.children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }

    root.has_error().then_some(root)
}
