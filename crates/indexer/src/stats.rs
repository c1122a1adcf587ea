use serde::{Deserialize, Serialize};

/// Statistics about a graph build
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStats {
    /// Candidate files found by the scanner
    pub files_discovered: usize,

    /// Files that contributed to the graph
    pub files_processed: usize,

    /// Files skipped (read/parse failures, oversized, unnamed modules)
    pub files_skipped: usize,

    pub nodes: usize,
    pub edges: usize,
    pub nested_in_edges: usize,
    pub call_edges: usize,
    pub inherits_from_edges: usize,

    /// Time taken in milliseconds
    pub elapsed_ms: u64,

    /// Per-file failures, in discovery order
    pub errors: Vec<String>,
}

impl BuildStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_skipped(&mut self, reason: Option<String>) {
        self.files_skipped += 1;
        if let Some(reason) = reason {
            self.errors.push(reason);
        }
    }

    #[must_use]
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed_ms as f64 / 1000.0
    }
}
