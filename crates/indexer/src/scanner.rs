use ignore::{DirEntry, WalkBuilder};
use std::path::{Component, Path, PathBuf};

const SOURCE_EXTENSION: &str = "py";
const PACKAGE_INIT: &str = "__init__.py";

/// Scanner for finding Python source files in a project
#[derive(Debug, Clone)]
pub struct FileScanner {
    root: PathBuf,
    /// Directory or file names (case-insensitive) whose subtrees are skipped
    excluded_segments: Vec<String>,
    respect_gitignore: bool,
}

impl FileScanner {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            excluded_segments: vec!["tests".to_string()],
            respect_gitignore: false,
        }
    }

    #[must_use]
    pub fn with_excluded_segments(mut self, segments: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.excluded_segments = segments
            .into_iter()
            .map(|s| s.into().to_lowercase())
            .collect();
        self
    }

    #[must_use]
    pub fn respect_gitignore(mut self, enabled: bool) -> Self {
        self.respect_gitignore = enabled;
        self
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Candidate source files in lexicographic walk order. Package-init files
    /// are not candidates. Each call starts a fresh walk.
    pub fn files(&self) -> impl Iterator<Item = PathBuf> {
        self.walk()
            .filter(|path| path.file_name().and_then(|n| n.to_str()) != Some(PACKAGE_INIT))
    }

    /// Package-init files (`__init__.py`), which only contribute re-exports
    pub fn package_inits(&self) -> impl Iterator<Item = PathBuf> {
        self.walk()
            .filter(|path| path.file_name().and_then(|n| n.to_str()) == Some(PACKAGE_INIT))
    }

    fn walk(&self) -> impl Iterator<Item = PathBuf> {
        let root = self.root.clone();
        let excluded = self.excluded_segments.clone();

        let mut builder = WalkBuilder::new(&self.root);
        builder
            .standard_filters(false)
            .sort_by_file_name(|a, b| a.cmp(b));
        if self.respect_gitignore {
            builder
                .git_ignore(true)
                .git_exclude(true)
                .ignore(true)
                .require_git(false);
        }
        builder.filter_entry(move |entry| !is_excluded(entry.path(), &root, &excluded));

        builder.build().filter_map(|result| match result {
            Ok(entry) if is_source_file(&entry) => Some(entry.into_path()),
            Ok(_) => None,
            Err(e) => {
                log::warn!("Failed to read entry: {e}");
                None
            }
        })
    }
}

fn is_source_file(entry: &DirEntry) -> bool {
    entry.file_type().is_some_and(|t| t.is_file())
        && entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext == SOURCE_EXTENSION)
}

/// Whether any path segment below `root` matches an excluded name
fn is_excluded(path: &Path, root: &Path, excluded: &[String]) -> bool {
    let Ok(relative) = path.strip_prefix(root) else {
        return false;
    };
    relative.components().any(|component| match component {
        Component::Normal(name) => {
            let lowered = name.to_string_lossy().to_lowercase();
            excluded.iter().any(|segment| *segment == lowered)
        }
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "x = 1\n").unwrap();
    }

    fn relative(root: &Path, paths: impl Iterator<Item = PathBuf>) -> Vec<String> {
        paths
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect()
    }

    #[test]
    fn test_files_sorted_and_filtered() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        for file in [
            "b.py",
            "a.py",
            "pkg/__init__.py",
            "pkg/core.py",
            "pkg/Tests/test_core.py",
            "tests/test_a.py",
            "tests.py",
            "notes.txt",
            "pkg/data.pyc",
        ] {
            touch(root, file);
        }

        let scanner = FileScanner::new(root);
        assert_eq!(
            relative(root, scanner.files()),
            vec!["a.py", "b.py", "pkg/core.py", "tests.py"]
        );
        assert_eq!(relative(root, scanner.package_inits()), vec!["pkg/__init__.py"]);
    }

    #[test]
    fn test_files_is_restartable() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "one.py");
        touch(temp.path(), "two.py");

        let scanner = FileScanner::new(temp.path());
        assert_eq!(scanner.files().count(), 2);
        assert_eq!(scanner.files().count(), 2);
    }

    #[test]
    fn test_root_inside_excluded_segment_is_scanned() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("tests");
        touch(&root, "app.py");

        let scanner = FileScanner::new(&root);
        assert_eq!(relative(&root, scanner.files()), vec!["app.py"]);
    }

    #[test]
    fn test_custom_segments_and_gitignore() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        touch(root, "app.py");
        touch(root, "build/gen.py");
        touch(root, "vendor/lib.py");
        touch(root, "tests/test_app.py");
        fs::write(root.join(".gitignore"), "build/\n").unwrap();

        let all = FileScanner::new(root).with_excluded_segments(["Vendor"]);
        assert_eq!(
            relative(root, all.files()),
            vec!["app.py", "build/gen.py", "tests/test_app.py"]
        );

        let ignoring = all.respect_gitignore(true);
        assert_eq!(relative(root, ignoring.files()), vec!["app.py", "tests/test_app.py"]);
    }
}
