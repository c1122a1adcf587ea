use crate::error::{IndexerError, Result};
use coderag_graph::{DeriveOptions, ResolveOptions};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const THREADS_ENV: &str = "CODERAG_THREADS";
const MAX_THREADS: usize = 512;
const DEFAULT_MAX_FILE_BYTES: u64 = 4 * 1024 * 1024;

/// Settings for one graph build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Worker threads; `None` uses every available core
    pub threads: Option<usize>,

    /// Path segments (case-insensitive) excluded from discovery
    pub excluded_segments: Vec<String>,

    /// Follow `module.attr` call chains through project modules
    pub follow_module_attributes: bool,

    /// Resolve `self.<name>()` through base classes when the owning class
    /// does not define `<name>`
    pub inherited_self_calls: bool,

    /// Receiver names treated as the enclosing class instance
    pub self_receivers: Vec<String>,

    /// Files larger than this are skipped
    pub max_file_bytes: u64,

    /// Honour `.gitignore` / `.ignore` files during discovery
    pub respect_gitignore: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        let resolve = ResolveOptions::default();
        Self {
            threads: None,
            excluded_segments: vec!["tests".to_string()],
            follow_module_attributes: resolve.follow_module_attributes,
            inherited_self_calls: DeriveOptions::default().inherited_self_calls,
            self_receivers: resolve.self_receivers,
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            respect_gitignore: false,
        }
    }
}

impl BuildConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|err| IndexerError::Config(err.to_string()))
    }

    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| IndexerError::ReadError {
            file: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
            .map_err(|err| IndexerError::Config(format!("{}: {err}", path.display())))
    }

    /// Apply `CODERAG_THREADS` when set to a positive number
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        let raw = std::env::var(THREADS_ENV).ok();
        self.with_threads_override(raw.as_deref())
    }

    fn with_threads_override(mut self, raw: Option<&str>) -> Self {
        if let Some(threads) = parse_threads(raw) {
            self.threads = Some(threads);
        }
        self
    }

    #[must_use]
    pub fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions {
            self_receivers: self.self_receivers.clone(),
            follow_module_attributes: self.follow_module_attributes,
        }
    }

    #[must_use]
    pub const fn derive_options(&self) -> DeriveOptions {
        DeriveOptions {
            inherited_self_calls: self.inherited_self_calls,
        }
    }

    /// Worker count for the build pool
    #[must_use]
    pub fn worker_threads(&self) -> usize {
        self.threads
            .filter(|&n| n > 0)
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(1)
            })
            .min(MAX_THREADS)
    }
}

fn parse_threads(raw: Option<&str>) -> Option<usize> {
    raw.map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|&n| n > 0)
        .map(|n| n.min(MAX_THREADS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = BuildConfig::default();
        assert_eq!(config.excluded_segments, vec!["tests"]);
        assert_eq!(config.self_receivers, vec!["self", "cls"]);
        assert!(config.follow_module_attributes);
        assert!(config.inherited_self_calls);
        assert_eq!(config.max_file_bytes, 4 * 1024 * 1024);
        assert!(config.worker_threads() >= 1);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = BuildConfig::from_toml_str(
            "threads = 2\nexcluded_segments = [\"tests\", \"migrations\"]\ninherited_self_calls = false\n",
        )
        .unwrap();

        assert_eq!(config.threads, Some(2));
        assert_eq!(config.worker_threads(), 2);
        assert_eq!(config.excluded_segments, vec!["tests", "migrations"]);
        assert!(!config.derive_options().inherited_self_calls);
        assert!(config.resolve_options().follow_module_attributes);
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let err = BuildConfig::from_toml_str("thread = 2\n").unwrap_err();
        assert!(matches!(err, IndexerError::Config(_)));
    }

    #[test]
    fn test_threads_override() {
        let base = BuildConfig::default();
        assert_eq!(base.clone().with_threads_override(Some(" 3 ")).threads, Some(3));
        assert_eq!(base.clone().with_threads_override(Some("0")).threads, None);
        assert_eq!(base.clone().with_threads_override(Some("many")).threads, None);
        assert_eq!(base.with_threads_override(None).threads, None);
    }
}
