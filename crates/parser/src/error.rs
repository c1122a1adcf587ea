use thiserror::Error;

/// Result type for parser operations
pub type Result<T> = std::result::Result<T, ParserError>;

/// Errors that can occur while turning source text into a syntax tree
#[derive(Error, Debug)]
pub enum ParserError {
    /// The source text is not syntactically valid Python
    #[error("Parse error in {file}: {message}")]
    ParseError { file: String, message: String },

    /// Tree-sitter gave up without producing a tree
    #[error("Parser produced no syntax tree for {0}")]
    NoTree(String),

    /// Tree-sitter error
    #[error("Tree-sitter error: {0}")]
    TreeSitterError(String),
}

impl ParserError {
    /// Create a parse error
    pub fn parse(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ParseError {
            file: file.into(),
            message: message.into(),
        }
    }

    /// Create a tree-sitter error
    pub fn tree_sitter(msg: impl Into<String>) -> Self {
        Self::TreeSitterError(msg.into())
    }

    /// File the error refers to, if any
    #[must_use]
    pub fn file(&self) -> Option<&str> {
        match self {
            Self::ParseError { file, .. } | Self::NoTree(file) => Some(file),
            Self::TreeSitterError(_) => None,
        }
    }
}
