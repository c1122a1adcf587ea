use crate::config::BuildConfig;
use crate::error::{IndexerError, Result};
use crate::scanner::FileScanner;
use crate::stats::BuildStats;
use coderag_graph::{
    analyze, derive, CodeGraph, FileGraph, ModuleName, ProjectIndex, Relation, SourceOutline,
};
use coderag_parser::SourceParser;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// A finished graph together with the numbers describing its build
#[derive(Debug, Clone)]
pub struct BuiltGraph {
    pub graph: CodeGraph,
    pub stats: BuildStats,
}

enum FileOutcome {
    Outlined(SourceOutline),
    /// Skipped file, with the failure message when it was an error
    Skipped(Option<String>),
}

/// Builds the definition graph of a project directory
pub struct GraphAssembler {
    root: PathBuf,
    config: BuildConfig,
}

impl GraphAssembler {
    /// Create an assembler for `root`, which must be an existing directory
    pub fn new(root: impl AsRef<Path>, config: BuildConfig) -> Result<Self> {
        let root = root.as_ref();
        if !root.exists() {
            return Err(IndexerError::InvalidRoot(format!(
                "{} does not exist",
                root.display()
            )));
        }
        if !root.is_dir() {
            return Err(IndexerError::InvalidRoot(format!(
                "{} is not a directory",
                root.display()
            )));
        }

        Ok(Self {
            root: root.to_path_buf(),
            config,
        })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub const fn config(&self) -> &BuildConfig {
        &self.config
    }

    #[must_use]
    pub fn scanner(&self) -> FileScanner {
        FileScanner::new(&self.root)
            .with_excluded_segments(self.config.excluded_segments.iter().cloned())
            .respect_gitignore(self.config.respect_gitignore)
    }

    /// Discover, parse, resolve and link every source file under the root
    pub fn build(&self) -> Result<BuiltGraph> {
        let start = Instant::now();
        log::info!("Building code graph for {}", self.root.display());

        // Grammar problems are fatal, unlike per-file failures
        SourceParser::new()?;

        let pool = ThreadPoolBuilder::new()
            .num_threads(self.config.worker_threads())
            .build()
            .map_err(|e| IndexerError::ThreadPool(e.to_string()))?;

        let scanner = self.scanner();
        let files: Vec<PathBuf> = scanner.files().collect();
        let package_inits: Vec<PathBuf> = scanner.package_inits().collect();
        log::info!(
            "Found {} source files and {} package inits",
            files.len(),
            package_inits.len()
        );

        let mut stats = BuildStats::new();
        stats.files_discovered = files.len();

        // Stage 1: parse and outline every file
        let (outcomes, init_outlines) = pool.install(|| {
            let outcomes: Vec<FileOutcome> = files
                .par_iter()
                .map_init(|| SourceParser::new().ok(), |parser, path| self.outline_file(parser, path))
                .collect();
            let init_outlines: Vec<SourceOutline> = package_inits
                .par_iter()
                .map_init(|| SourceParser::new().ok(), |parser, path| self.outline_file(parser, path))
                .filter_map(|outcome| match outcome {
                    FileOutcome::Outlined(outline) => Some(outline),
                    FileOutcome::Skipped(_) => None,
                })
                .collect();
            (outcomes, init_outlines)
        });

        let mut outlines = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            match outcome {
                FileOutcome::Outlined(outline) => outlines.push(outline),
                FileOutcome::Skipped(reason) => stats.add_skipped(reason),
            }
        }
        stats.files_processed = outlines.len();

        // Stage 2: shared read-only index, then per-file resolution
        let index = ProjectIndex::build(outlines.iter().chain(init_outlines.iter()));
        log::debug!("Indexed {} modules", index.module_count());

        let resolve_options = self.config.resolve_options();
        let file_graphs: Vec<FileGraph> = pool.install(|| {
            outlines
                .par_iter()
                .map(|outline| analyze(outline, &index, &resolve_options))
                .collect()
        });

        // Stage 3: ordered merge and derivation
        let mut definitions = Vec::new();
        let mut calls = Vec::new();
        for file_graph in file_graphs {
            definitions.extend(file_graph.definitions);
            calls.extend(file_graph.calls);
        }
        let graph = derive(definitions, &calls, &self.config.derive_options());

        stats.nodes = graph.node_count();
        stats.edges = graph.edge_count();
        stats.nested_in_edges = graph.edge_count_by(Relation::NestedIn);
        stats.call_edges = graph.edge_count_by(Relation::Call);
        stats.inherits_from_edges = graph.edge_count_by(Relation::InheritsFrom);
        stats.elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        log::info!(
            "Graph built with {} nodes and {} edges in {:.2} seconds ({} files skipped)",
            stats.nodes,
            stats.edges,
            stats.elapsed_secs(),
            stats.files_skipped
        );

        Ok(BuiltGraph { graph, stats })
    }

    fn outline_file(&self, parser: &mut Option<SourceParser>, path: &Path) -> FileOutcome {
        let Some(module) = ModuleName::from_path(&self.root, path) else {
            log::debug!("Skipping {}: no module name", path.display());
            return FileOutcome::Skipped(None);
        };

        if let Ok(meta) = std::fs::metadata(path) {
            if meta.len() > self.config.max_file_bytes {
                let message = format!(
                    "{}: file too large ({} bytes > {})",
                    self.normalize_path(path),
                    meta.len(),
                    self.config.max_file_bytes
                );
                log::warn!("Skipping {message}");
                return FileOutcome::Skipped(Some(message));
            }
        }

        let source = match std::fs::read_to_string(path) {
            Ok(source) => source,
            Err(source) => {
                let err = IndexerError::ReadError {
                    file: path.to_path_buf(),
                    source,
                };
                log::warn!("{err}");
                return FileOutcome::Skipped(Some(err.to_string()));
            }
        };

        let relative = self.normalize_path(path);
        let Some(parser) = parser.as_mut() else {
            let message = format!("{relative}: parser unavailable");
            log::warn!("{message}");
            return FileOutcome::Skipped(Some(message));
        };

        match parser.parse(source, &relative) {
            Ok(parsed) => {
                log::debug!("Outlining {relative}");
                FileOutcome::Outlined(SourceOutline::collect(&parsed, relative, module))
            }
            Err(err) => {
                log::warn!("Skipping {relative}: {err}");
                FileOutcome::Skipped(Some(err.to_string()))
            }
        }
    }

    fn normalize_path(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        let mut normalized = relative.to_string_lossy().to_string();
        if normalized.contains('\\') {
            normalized = normalized.replace('\\', "/");
        }
        normalized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_invalid_roots_are_fatal() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("module.py");
        fs::write(&file, "x = 1\n").unwrap();

        assert!(matches!(
            GraphAssembler::new(temp.path().join("missing"), BuildConfig::default()),
            Err(IndexerError::InvalidRoot(_))
        ));
        assert!(matches!(
            GraphAssembler::new(&file, BuildConfig::default()),
            Err(IndexerError::InvalidRoot(_))
        ));
    }

    #[test]
    fn test_oversized_files_are_skipped() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("small.py"), "def f():\n    pass\n").unwrap();
        fs::write(
            temp.path().join("large.py"),
            format!("def g():\n    return '{}'\n", "x".repeat(256)),
        )
        .unwrap();

        let config = BuildConfig {
            max_file_bytes: 64,
            ..BuildConfig::default()
        };
        let built = GraphAssembler::new(temp.path(), config).unwrap().build().unwrap();

        assert_eq!(built.stats.files_discovered, 2);
        assert_eq!(built.stats.files_skipped, 1);
        assert_eq!(built.stats.errors.len(), 1);
        assert!(built.stats.errors[0].starts_with("large.py: file too large"));
        assert!(built.graph.contains("small.f"));
        assert!(!built.graph.contains("large.g"));
    }

    #[test]
    fn test_normalize_path() {
        let temp = TempDir::new().unwrap();
        let assembler = GraphAssembler::new(temp.path(), BuildConfig::default()).unwrap();
        assert_eq!(
            assembler.normalize_path(&temp.path().join("pkg").join("mod.py")),
            "pkg/mod.py"
        );
    }
}
