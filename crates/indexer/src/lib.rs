//! # coderag indexer
//!
//! Builds the definition graph of a Python project directory.
//!
//! ## Pipeline
//!
//! ```text
//! Directory
//!     │
//!     ├──> File Scanner (sorted walk, `tests` segments excluded)
//!     │      └─> Source files + package inits
//!     │
//!     ├──> Stage 1 (rayon pool): read → parse → outline
//!     │      └─> failures logged and skipped
//!     │
//!     ├──> Project index (shared, read-only)
//!     │
//!     ├──> Stage 2 (rayon pool): resolve → extract
//!     │
//!     └──> Ordered merge → derive
//!            └─> CodeGraph + BuildStats
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use coderag_indexer::{BuildConfig, GraphAssembler};
//!
//! fn main() -> coderag_indexer::Result<()> {
//!     let built = GraphAssembler::new("/path/to/project", BuildConfig::default())?.build()?;
//!
//!     println!(
//!         "{} nodes, {} edges",
//!         built.stats.nodes, built.stats.edges
//!     );
//!     Ok(())
//! }
//! ```

mod assembler;
mod config;
mod error;
mod scanner;
mod stats;

pub use assembler::{BuiltGraph, GraphAssembler};
pub use config::{BuildConfig, THREADS_ENV};
pub use error::{IndexerError, Result};
pub use scanner::FileScanner;
pub use stats::BuildStats;
