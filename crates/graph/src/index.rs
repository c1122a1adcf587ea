//! Project-wide symbol index.
//!
//! Built once per build from every file outline (package-init files
//! included) and shared read-only by the resolution stage. Answers "what does
//! `module.name` denote", following re-exports, wildcard imports and
//! submodules.

use crate::outline::{BindingTarget, SourceOutline};
use std::collections::{HashMap, HashSet};

/// Bound on import chains followed through re-exports (guards import cycles)
const MAX_IMPORT_DEPTH: usize = 16;

/// Result of a successful lookup
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Symbol {
    /// Definition id
    Definition(String),
    /// Canonical module (or namespace package) name
    Module(String),
}

/// What a module-level name is bound to
#[derive(Debug, Clone, PartialEq, Eq)]
enum Export {
    Definition(String),
    Module(String),
    Imported { module: String, name: String },
    /// Assigned value or failed import; shadows submodules and wildcards
    Opaque,
}

#[derive(Debug, Clone, Default)]
struct ModuleSymbols {
    exports: HashMap<String, Export>,
    wildcards: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ProjectIndex {
    modules: HashMap<String, ModuleSymbols>,

    /// Every proper prefix of a module name (directories act as namespace packages)
    namespaces: HashSet<String>,

    /// Modules backed by a package-init file
    packages: HashSet<String>,

    /// Dotted name below an import root -> modules it may denote, sorted
    suffixes: HashMap<String, Vec<String>>,
}

impl ProjectIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the index from a set of outlines
    pub fn build<'o>(outlines: impl IntoIterator<Item = &'o SourceOutline>) -> Self {
        let mut index = Self::new();
        for outline in outlines {
            index.insert(outline);
        }
        index.finish();
        index
    }

    fn insert(&mut self, outline: &SourceOutline) {
        let scope = outline.module_scope();
        let mut bindings: Vec<_> = scope.bindings.iter().collect();
        bindings.sort_by_key(|binding| binding.position);

        let mut symbols = ModuleSymbols {
            exports: HashMap::with_capacity(bindings.len()),
            wildcards: scope.wildcard_imports.clone(),
        };
        for binding in bindings {
            let export = match &binding.target {
                BindingTarget::Definition(idx) => {
                    Export::Definition(outline.definitions[*idx].qualified_name.clone())
                }
                BindingTarget::Module(module) => Export::Module(module.clone()),
                BindingTarget::ImportedName { module, name } => Export::Imported {
                    module: module.clone(),
                    name: name.clone(),
                },
                BindingTarget::Unresolvable | BindingTarget::Local => Export::Opaque,
            };
            // Later bindings win
            symbols.exports.insert(binding.name.clone(), export);
        }

        let name = outline.module.as_str().to_string();
        if outline.module.is_package() {
            self.packages.insert(name.clone());
        }
        if self.modules.insert(name.clone(), symbols).is_some() {
            log::debug!("Module {name} indexed twice, keeping {}", outline.file);
        }
    }

    fn finish(&mut self) {
        let names: Vec<String> = self.modules.keys().cloned().collect();
        for name in &names {
            let parts: Vec<&str> = name.split('.').collect();
            for end in 1..parts.len() {
                self.namespaces.insert(parts[..end].join("."));
            }
        }

        let canonical: Vec<String> = names
            .into_iter()
            .chain(self.namespaces.iter().cloned())
            .collect();
        for name in canonical {
            let parts: Vec<&str> = name.split('.').collect();
            for start in 1..parts.len() {
                if !self.is_import_root(&parts, start) {
                    continue;
                }
                self.suffixes
                    .entry(parts[start..].join("."))
                    .or_default()
                    .push(name.clone());
            }
        }
        for candidates in self.suffixes.values_mut() {
            candidates.sort();
            candidates.dedup();
        }
    }

    /// True when the directory `parts[..start]` can sit on the import path:
    /// none of its components is a package, and the name imported below it
    /// starts with a package. A bare top-level module (`json`, `utils`) is
    /// never matched this way, so standard-library and third-party imports
    /// are not captured by project files.
    fn is_import_root(&self, parts: &[&str], start: usize) -> bool {
        let prefix_is_plain = (1..=start).all(|end| !self.packages.contains(&parts[..end].join(".")));
        prefix_is_plain && self.packages.contains(&parts[..=start].join("."))
    }

    #[must_use]
    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    /// Canonical name of `module`: an exact module or namespace match first,
    /// then the single package module reached through an import root below
    /// the project root (`src/`-style layouts). Ambiguous matches resolve to
    /// nothing.
    #[must_use]
    pub fn canonical_module(&self, module: &str) -> Option<String> {
        if self.modules.contains_key(module) || self.namespaces.contains(module) {
            return Some(module.to_string());
        }
        match self.suffixes.get(module).map(Vec::as_slice) {
            Some([single]) => Some(single.clone()),
            Some(candidates) => {
                log::debug!("Module {module} is ambiguous: {}", candidates.join(", "));
                None
            }
            None => None,
        }
    }

    /// Module symbol for a dotted module name, if it is part of the project
    #[must_use]
    pub fn module_symbol(&self, module: &str) -> Option<Symbol> {
        self.canonical_module(module).map(Symbol::Module)
    }

    /// What `module.name` denotes: an explicit module-level binding, then a
    /// wildcard import, then a submodule.
    #[must_use]
    pub fn resolve_member(&self, module: &str, name: &str) -> Option<Symbol> {
        self.member(module, name, 0)
    }

    fn member(&self, module: &str, name: &str, depth: usize) -> Option<Symbol> {
        if depth > MAX_IMPORT_DEPTH {
            log::debug!("Import chain too deep resolving {module}.{name}");
            return None;
        }
        let module = self.canonical_module(module)?;

        if let Some(symbols) = self.modules.get(&module) {
            if let Some(export) = symbols.exports.get(name) {
                return match export {
                    Export::Definition(id) => Some(Symbol::Definition(id.clone())),
                    Export::Module(target) => self.module_symbol(target),
                    Export::Imported {
                        module: source,
                        name: original,
                    } => self.member(source, original, depth + 1),
                    Export::Opaque => None,
                };
            }
            for wildcard in &symbols.wildcards {
                if let Some(symbol) = self.member(wildcard, name, depth + 1) {
                    return Some(symbol);
                }
            }
        }

        self.module_symbol(&format!("{module}.{name}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::ModuleName;
    use coderag_parser::SourceParser;
    use pretty_assertions::assert_eq;

    fn outline(module: &str, is_package: bool, code: &str) -> SourceOutline {
        let mut parser = SourceParser::new().unwrap();
        let parsed = parser.parse(code, "test.py").unwrap();
        SourceOutline::collect(&parsed, "test.py", ModuleName::new(module, is_package))
    }

    fn definition(id: &str) -> Option<Symbol> {
        Some(Symbol::Definition(id.to_string()))
    }

    #[test]
    fn test_module_level_definitions() {
        let outlines = [outline("app.models", false, "class User:\n    pass\n\ndef load():\n    pass\n")];
        let index = ProjectIndex::build(&outlines);

        assert_eq!(index.resolve_member("app.models", "User"), definition("app.models.User"));
        assert_eq!(index.resolve_member("app.models", "load"), definition("app.models.load"));
        assert_eq!(index.resolve_member("app.models", "missing"), None);
    }

    #[test]
    fn test_package_reexports_and_submodules() {
        let outlines = [
            outline("app", true, "from .models import User as Account\n"),
            outline("app.models", false, "class User:\n    pass\n"),
        ];
        let index = ProjectIndex::build(&outlines);

        assert_eq!(index.resolve_member("app", "Account"), definition("app.models.User"));
        assert_eq!(
            index.resolve_member("app", "models"),
            Some(Symbol::Module("app.models".to_string()))
        );
    }

    #[test]
    fn test_wildcard_imports_are_followed() {
        let outlines = [
            outline("app.api", false, "from app.helpers import *\n"),
            outline("app.helpers", false, "def helper():\n    pass\n"),
        ];
        let index = ProjectIndex::build(&outlines);

        assert_eq!(index.resolve_member("app.api", "helper"), definition("app.helpers.helper"));
    }

    #[test]
    fn test_import_cycle_terminates() {
        let outlines = [
            outline("a", false, "from b import thing\n"),
            outline("b", false, "from a import thing\n"),
        ];
        let index = ProjectIndex::build(&outlines);

        assert_eq!(index.resolve_member("a", "thing"), None);
    }

    #[test]
    fn test_namespace_and_suffix_lookup() {
        let outlines = [
            outline("src.pkg", true, ""),
            outline("src.pkg.core", false, "def run():\n    pass\n"),
        ];
        let index = ProjectIndex::build(&outlines);

        assert_eq!(index.canonical_module("src.pkg").as_deref(), Some("src.pkg"));
        assert_eq!(index.canonical_module("pkg").as_deref(), Some("src.pkg"));
        assert_eq!(index.canonical_module("pkg.core").as_deref(), Some("src.pkg.core"));
        assert_eq!(index.resolve_member("pkg.core", "run"), definition("src.pkg.core.run"));
        assert_eq!(index.canonical_module("core"), None);
        assert_eq!(index.canonical_module("numpy"), None);
    }

    #[test]
    fn test_suffix_without_package_is_not_matched() {
        let outlines = [
            outline("src.pkg.core", false, "def run():\n    pass\n"),
            outline("app.json", false, "def loads(text):\n    pass\n"),
        ];
        let index = ProjectIndex::build(&outlines);

        assert_eq!(index.canonical_module("pkg.core"), None);
        assert_eq!(index.canonical_module("json"), None);
        assert_eq!(index.resolve_member("json", "loads"), None);
    }

    #[test]
    fn test_package_prefix_is_not_an_import_root() {
        let outlines = [
            outline("app", true, ""),
            outline("app.json", false, "def loads(text):\n    pass\n"),
        ];
        let index = ProjectIndex::build(&outlines);

        assert_eq!(index.canonical_module("app.json").as_deref(), Some("app.json"));
        assert_eq!(index.canonical_module("json"), None);
    }

    #[test]
    fn test_ambiguous_suffix_resolves_to_nothing() {
        let outlines = [
            outline("a.lib", true, ""),
            outline("a.lib.utils", false, "def helper():\n    pass\n"),
            outline("b.lib", true, ""),
            outline("b.lib.utils", false, "def helper():\n    pass\n"),
        ];
        let index = ProjectIndex::build(&outlines);

        assert_eq!(index.canonical_module("lib.utils"), None);
        assert_eq!(index.resolve_member("lib.utils", "helper"), None);
        assert_eq!(
            index.resolve_member("a.lib.utils", "helper"),
            definition("a.lib.utils.helper")
        );
    }

    #[test]
    fn test_assignment_shadows_definition() {
        let outlines = [outline("m", false, "def f():\n    pass\n\nf = None\n")];
        let index = ProjectIndex::build(&outlines);

        assert_eq!(index.resolve_member("m", "f"), None);
    }
}
