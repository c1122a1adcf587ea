use coderag_parser::ParserError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndexerError>;

#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("Failed to read {}: {source}", .file.display())]
    ReadError {
        file: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    ParseError(#[from] ParserError),

    #[error("Invalid project root: {0}")]
    InvalidRoot(String),

    #[error("Failed to build thread pool: {0}")]
    ThreadPool(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}
