use crate::mro::{method_resolution_order, Hierarchy};
use crate::types::{Call, CodeGraph, Definition, DefinitionKind, Relation, SelfDispatch};
use std::collections::HashMap;

/// Options for relationship derivation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeriveOptions {
    /// Link unresolved `self.<name>()` calls to the first base class in MRO
    /// order that defines `<name>`
    pub inherited_self_calls: bool,
}

impl Default for DeriveOptions {
    fn default() -> Self {
        Self {
            inherited_self_calls: true,
        }
    }
}

/// Build the graph from merged definitions and call candidates.
///
/// Later definitions replace earlier ones with the same id. Running this
/// twice on the same input yields the same graph.
#[must_use]
pub fn derive(definitions: Vec<Definition>, calls: &[Call], options: &DeriveOptions) -> CodeGraph {
    let mut graph = CodeGraph::new();

    // Phase 1: nodes
    for definition in definitions {
        if graph.contains(&definition.id) {
            log::debug!("Duplicate definition {} in {}, replacing", definition.id, definition.file);
        }
        graph.add_node(definition);
    }
    reconcile_kinds(&mut graph);

    // Phase 2: structural edges
    let mut structural = Vec::new();
    for definition in graph.nodes() {
        if let Some(parent) = &definition.parent_id {
            structural.push((definition.id.clone(), parent.clone(), Relation::NestedIn));
        }
        if definition.kind == DefinitionKind::Class {
            for base in &definition.inherits_from {
                structural.push((definition.id.clone(), base.clone(), Relation::InheritsFrom));
            }
        }
    }
    for (source, target, relation) in structural {
        graph.add_edge(&source, &target, relation);
    }

    // Phase 3: call edges
    let mut dispatcher = options
        .inherited_self_calls
        .then(|| InheritedDispatch::new(&graph));
    let mut call_edges = Vec::new();
    for call in calls {
        let target = match (&call.candidate_id, &call.dispatch) {
            (Some(candidate), _) if graph.contains(candidate) => Some(candidate.clone()),
            (_, Some(dispatch)) => dispatcher
                .as_mut()
                .and_then(|d| d.resolve(&graph, dispatch)),
            _ => None,
        };
        if let Some(target) = target {
            call_edges.push((call.caller_id.clone(), target));
        }
    }
    for (caller, target) in call_edges {
        graph.add_edge(&caller, &target, Relation::Call);
    }

    log::debug!(
        "Derived {} nested_in, {} call and {} inherits_from edges",
        graph.edge_count_by(Relation::NestedIn),
        graph.edge_count_by(Relation::Call),
        graph.edge_count_by(Relation::InheritsFrom)
    );

    graph
}

/// A function is a method exactly when its parent node is a class. Replaced
/// duplicates can break that, so kinds and display names are recomputed
/// against the final node set.
fn reconcile_kinds(graph: &mut CodeGraph) {
    let mut updates = Vec::new();
    for definition in graph.nodes() {
        if definition.kind == DefinitionKind::Class {
            continue;
        }
        let class_parent = definition
            .parent_id
            .as_deref()
            .and_then(|parent| graph.node(parent))
            .filter(|parent| parent.kind == DefinitionKind::Class);

        let (kind, name) = match class_parent {
            Some(class) => (
                DefinitionKind::Method,
                format!("{}.{}", class.name, definition.short_name()),
            ),
            None => (DefinitionKind::Function, definition.short_name().to_string()),
        };
        if kind != definition.kind {
            updates.push((definition.id.clone(), kind, name));
        }
    }

    for (id, kind, name) in updates {
        if let Some(definition) = graph.node_mut(&id) {
            log::debug!("Reclassifying {id} as {}", kind.as_str());
            definition.kind = kind;
            definition.name = name;
        }
    }
}

/// Looks up `self.<name>()` targets through base classes
struct InheritedDispatch {
    hierarchy: Hierarchy,
    orders: HashMap<String, Vec<String>>,
}

impl InheritedDispatch {
    fn new(graph: &CodeGraph) -> Self {
        let hierarchy = graph
            .nodes()
            .filter(|definition| definition.kind == DefinitionKind::Class)
            .map(|class| {
                let bases = class
                    .inherits_from
                    .iter()
                    .filter(|base| {
                        graph
                            .node(base)
                            .is_some_and(|node| node.kind == DefinitionKind::Class)
                    })
                    .cloned()
                    .collect();
                (class.id.clone(), bases)
            })
            .collect();

        Self {
            hierarchy,
            orders: HashMap::new(),
        }
    }

    fn resolve(&mut self, graph: &CodeGraph, dispatch: &SelfDispatch) -> Option<String> {
        let hierarchy = &self.hierarchy;
        let order = self
            .orders
            .entry(dispatch.class_id.clone())
            .or_insert_with(|| method_resolution_order(&dispatch.class_id, hierarchy));

        order
            .iter()
            .map(|class| format!("{class}.{}", dispatch.method))
            .find(|candidate| graph.contains(candidate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::definition;
    use pretty_assertions::assert_eq;

    fn class(id: &str, bases: &[&str]) -> Definition {
        let mut def = definition(id, DefinitionKind::Class, None);
        def.inherits_from = bases.iter().map(|b| b.to_string()).collect();
        def
    }

    fn method(id: &str, class: &str) -> Definition {
        let mut def = definition(id, DefinitionKind::Method, Some(class));
        def.name = format!("{}.{}", class.rsplit('.').next().unwrap(), def.name);
        def
    }

    fn self_call(caller: &str, class_id: &str, method: &str) -> Call {
        Call {
            caller_id: caller.to_string(),
            candidate_id: Some(format!("{class_id}.{method}")),
            dispatch: Some(SelfDispatch {
                class_id: class_id.to_string(),
                method: method.to_string(),
            }),
        }
    }

    fn edges(graph: &CodeGraph) -> Vec<(String, String, Relation)> {
        let mut edges: Vec<_> = graph
            .edges()
            .map(|(s, t, r)| (s.to_string(), t.to_string(), r))
            .collect();
        edges.sort();
        edges
    }

    #[test]
    fn test_structural_and_call_edges() {
        let definitions = vec![
            class("m.Base", &[]),
            class("m.Foo", &["m.Base", "external.Mixin"]),
            method("m.Foo.bar", "m.Foo"),
            method("m.Foo.baz", "m.Foo"),
        ];
        let calls = vec![
            self_call("m.Foo.bar", "m.Foo", "baz"),
            Call {
                caller_id: "m.Foo.baz".to_string(),
                candidate_id: Some("os.path.join".to_string()),
                dispatch: None,
            },
        ];

        let graph = derive(definitions, &calls, &DeriveOptions::default());
        let e = |s: &str, t: &str, r| (s.to_string(), t.to_string(), r);

        assert_eq!(
            edges(&graph),
            vec![
                e("m.Foo", "m.Base", Relation::InheritsFrom),
                e("m.Foo.bar", "m.Foo", Relation::NestedIn),
                e("m.Foo.bar", "m.Foo.baz", Relation::Call),
                e("m.Foo.baz", "m.Foo", Relation::NestedIn),
            ]
        );
    }

    #[test]
    fn test_inherited_self_call_follows_mro() {
        let definitions = vec![
            class("m.A", &[]),
            method("m.A.save", "m.A"),
            class("m.B", &["m.A"]),
            method("m.B.save", "m.B"),
            class("m.C", &["m.A"]),
            class("m.D", &["m.C", "m.B"]),
            method("m.D.run", "m.D"),
        ];
        let calls = vec![self_call("m.D.run", "m.D", "save")];

        let graph = derive(definitions.clone(), &calls, &DeriveOptions::default());
        // MRO of D is D, C, B, A
        assert!(graph.has_edge("m.D.run", "m.B.save", Relation::Call));
        assert!(!graph.has_edge("m.D.run", "m.A.save", Relation::Call));

        let disabled = DeriveOptions {
            inherited_self_calls: false,
        };
        let graph = derive(definitions, &calls, &disabled);
        assert_eq!(graph.edge_count_by(Relation::Call), 0);
    }

    #[test]
    fn test_duplicate_ids_reconcile_kind() {
        let definitions = vec![
            class("m.Thing", &[]),
            method("m.Thing.go", "m.Thing"),
            definition("m.Thing", DefinitionKind::Function, None),
        ];

        let graph = derive(definitions, &[], &DeriveOptions::default());

        assert_eq!(graph.node_count(), 2);
        let go = graph.node("m.Thing.go").unwrap();
        assert_eq!(go.kind, DefinitionKind::Function);
        assert_eq!(go.name, "go");
    }

    #[test]
    fn test_derive_is_idempotent() {
        let definitions = vec![
            class("m.A", &[]),
            method("m.A.f", "m.A"),
            definition("m.g", DefinitionKind::Function, None),
        ];
        let calls = vec![Call {
            caller_id: "m.g".to_string(),
            candidate_id: Some("m.A".to_string()),
            dispatch: None,
        }];

        let first = derive(definitions.clone(), &calls, &DeriveOptions::default());
        let second = derive(definitions, &calls, &DeriveOptions::default());
        assert_eq!(edges(&first), edges(&second));
    }
}
