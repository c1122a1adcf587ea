//! # coderag parser
//!
//! Python source parsing for the code graph builder.
//!
//! ```text
//! Source text
//!     │
//!     ├──> Tree-sitter (python grammar) → syntax tree
//!     │
//!     ├──> Syntax check (first ERROR / MISSING node)
//!     │      └─> ParserError::ParseError { file, message }
//!     │
//!     └──> ParsedSource (text + tree) and docstring helpers
//! ```
//!
//! ## Example
//!
//! ```rust
//! use coderag_parser::{docstring, SourceParser};
//!
//! let mut parser = SourceParser::new().unwrap();
//! let parsed = parser
//!     .parse("def greet():\n    \"\"\"Say hi.\"\"\"\n", "greet.py")
//!     .unwrap();
//!
//! let function = parsed.root().named_child(0).unwrap();
//! assert_eq!(docstring(function, parsed.source()).as_deref(), Some("Say hi."));
//! ```

mod docstring;
mod error;
mod parser;

pub use docstring::{clean_docstring, docstring, string_literal_value};
pub use error::{ParserError, Result};
pub use parser::{ParsedSource, SourceParser};
