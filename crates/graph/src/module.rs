use std::path::{Component, Path};

const PACKAGE_INIT_STEM: &str = "__init__";

/// Dotted module name of a source file, relative to the project root
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleName {
    dotted: String,
    /// True for package-init files (`pkg/__init__.py` -> `pkg`)
    is_package: bool,
}

impl ModuleName {
    /// Module name for `path` under `root`, or `None` when the path is outside
    /// the root, not valid UTF-8, or names the root package-init file itself.
    #[must_use]
    pub fn from_path(root: &Path, path: &Path) -> Option<Self> {
        let relative = path.strip_prefix(root).ok()?;
        let mut parts = Vec::new();
        for component in relative.components() {
            match component {
                Component::Normal(name) => parts.push(name.to_str()?.to_string()),
                Component::CurDir => {}
                _ => return None,
            }
        }

        let file = parts.pop()?;
        let stem = file.strip_suffix(".py").unwrap_or(&file).to_string();
        let is_package = stem == PACKAGE_INIT_STEM;
        if !is_package {
            parts.push(stem);
        }
        if parts.is_empty() || parts.iter().any(String::is_empty) {
            return None;
        }

        Some(Self {
            dotted: parts.join("."),
            is_package,
        })
    }

    /// Build from an already dotted name
    #[must_use]
    pub fn new(dotted: impl Into<String>, is_package: bool) -> Self {
        Self {
            dotted: dotted.into(),
            is_package,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.dotted
    }

    #[must_use]
    pub const fn is_package(&self) -> bool {
        self.is_package
    }

    /// Absolute module named by a relative import (`level` leading dots,
    /// optional dotted tail). `None` when the import climbs above the
    /// top-level package.
    #[must_use]
    pub fn resolve_relative(&self, level: usize, tail: Option<&str>) -> Option<String> {
        let mut package: Vec<&str> = self.dotted.split('.').collect();
        if !self.is_package {
            package.pop();
        }

        let climb = level.checked_sub(1)?;
        if climb >= package.len() {
            return None;
        }
        package.truncate(package.len() - climb);

        let mut resolved = package.join(".");
        if let Some(tail) = tail.filter(|t| !t.is_empty()) {
            resolved.push('.');
            resolved.push_str(tail);
        }
        Some(resolved)
    }
}

impl std::fmt::Display for ModuleName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.dotted)
    }
}
