use crate::index::ProjectIndex;
use crate::outline::{RawDefinition, ScopeKind, SourceOutline};
use crate::resolver::{ResolveOptions, Resolver};
use crate::types::{Call, Definition, DefinitionKind};

/// Definitions and call candidates of one file, ready to merge
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileGraph {
    pub file: String,
    pub definitions: Vec<Definition>,
    pub calls: Vec<Call>,
}

/// Resolve and extract one file against the project index
#[must_use]
pub fn analyze(outline: &SourceOutline, index: &ProjectIndex, options: &ResolveOptions) -> FileGraph {
    let resolver = Resolver::new(index, outline, options);

    let definitions = outline
        .definitions
        .iter()
        .map(|raw| extract_definition(outline, &resolver, raw))
        .collect();

    let calls = outline
        .calls
        .iter()
        .filter_map(|call| resolver.resolve_call(call))
        .collect();

    FileGraph {
        file: outline.file.clone(),
        definitions,
        calls,
    }
}

fn extract_definition(outline: &SourceOutline, resolver: &Resolver<'_>, raw: &RawDefinition) -> Definition {
    let parent = outline.scope_definition(raw.scope);

    let kind = match raw.kind {
        ScopeKind::Class => DefinitionKind::Class,
        _ if outline.scope(raw.scope).kind == ScopeKind::Class => DefinitionKind::Method,
        _ => DefinitionKind::Function,
    };

    let name = match (kind, parent) {
        (DefinitionKind::Method, Some(class)) => format!("{}.{}", class.name, raw.name),
        _ => raw.name.clone(),
    };

    let inherits_from = if kind == DefinitionKind::Class {
        resolver.resolve_bases(raw)
    } else {
        Vec::new()
    };

    Definition {
        id: raw.qualified_name.clone(),
        name,
        kind,
        file: outline.file.clone(),
        line: raw.line,
        code: raw.code.clone(),
        docstring: raw.docstring.clone(),
        parent_id: parent.map(|p| p.qualified_name.clone()),
        inherits_from,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::ModuleName;
    use coderag_parser::SourceParser;
    use pretty_assertions::assert_eq;

    fn analyze_source(module: &str, code: &str) -> FileGraph {
        let mut parser = SourceParser::new().unwrap();
        let parsed = parser.parse(code, "pkg/shapes.py").unwrap();
        let outline = SourceOutline::collect(&parsed, "pkg/shapes.py", ModuleName::new(module, false));
        let index = ProjectIndex::build([&outline]);
        analyze(&outline, &index, &ResolveOptions::default())
    }

    #[test]
    fn test_kinds_names_and_parents() {
        let code = r#"
class Shape:
    """A shape."""

    @property
    def area(self):
        def compute():
            return 0
        return compute()

class Square(Shape):
    pass
"#;
        let graph = analyze_source("pkg.shapes", code);
        let summary: Vec<(&str, &str, DefinitionKind, Option<&str>)> = graph
            .definitions
            .iter()
            .map(|d| (d.id.as_str(), d.name.as_str(), d.kind, d.parent_id.as_deref()))
            .collect();

        assert_eq!(
            summary,
            vec![
                ("pkg.shapes.Shape", "Shape", DefinitionKind::Class, None),
                ("pkg.shapes.Shape.area", "Shape.area", DefinitionKind::Method, Some("pkg.shapes.Shape")),
                (
                    "pkg.shapes.Shape.area.compute",
                    "compute",
                    DefinitionKind::Function,
                    Some("pkg.shapes.Shape.area")
                ),
                ("pkg.shapes.Square", "Square", DefinitionKind::Class, None),
            ]
        );

        let area = &graph.definitions[1];
        assert_eq!(area.line, 6);
        assert!(area.code.starts_with("def area"));
        assert_eq!(graph.definitions[0].docstring, "A shape.");
        assert_eq!(graph.definitions[3].inherits_from, vec!["pkg.shapes.Shape".to_string()]);
        assert_eq!(graph.file, "pkg/shapes.py");
    }

    #[test]
    fn test_calls_carry_candidates() {
        let code = "def a():\n    b()\n\ndef b():\n    missing()\n";
        let graph = analyze_source("m", code);

        assert_eq!(graph.calls.len(), 2);
        assert_eq!(graph.calls[0].caller_id, "m.a");
        assert_eq!(graph.calls[0].candidate_id.as_deref(), Some("m.b"));
        assert_eq!(graph.calls[1].candidate_id, None);
    }
}
