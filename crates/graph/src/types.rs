use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Kind of a definition node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefinitionKind {
    Class,
    Function,
    /// Function whose immediate enclosing scope is a class
    Method,
}

impl DefinitionKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Class => "class",
            Self::Function => "function",
            Self::Method => "method",
        }
    }

    /// Node label used by the persistence layer
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Class => "Class",
            Self::Function => "Function",
            Self::Method => "Method",
        }
    }

    /// Text property that receives the vector embedding
    #[must_use]
    pub const fn embedding_source(self) -> &'static str {
        match self {
            Self::Class => "docstring",
            Self::Function | Self::Method => "code",
        }
    }
}

/// A named, locatable code construct (function, method or class)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Definition {
    /// Fully qualified name, unique within a build (e.g. "pkg.mod.Class.method")
    pub id: String,

    /// Display name ("Class.method" for methods)
    pub name: String,

    #[serde(rename = "type")]
    pub kind: DefinitionKind,

    /// File path relative to the project root
    pub file: String,

    /// Line of the `def`/`class` keyword (1-indexed)
    pub line: usize,

    /// Exact source text of the definition
    pub code: String,

    /// Cleaned docstring, empty when absent
    pub docstring: String,

    /// Immediately enclosing function/class
    pub parent_id: Option<String>,

    /// Resolved base classes, in declaration order (classes only)
    pub inherits_from: Vec<String>,
}

impl Definition {
    /// Last dotted segment of the id
    #[must_use]
    pub fn short_name(&self) -> &str {
        self.id.rsplit('.').next().unwrap_or(&self.id)
    }
}

/// Receiver information for a `self.<method>()` call
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SelfDispatch {
    /// Class that lexically owns the call
    pub class_id: String,
    pub method: String,
}

/// Call relationship candidate produced while scanning a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Call {
    /// Innermost definition enclosing the call expression
    pub caller_id: String,

    /// Best-effort resolved target, `None` when resolution failed
    pub candidate_id: Option<String>,

    /// Set for `self.<method>()` calls
    pub dispatch: Option<SelfDispatch>,
}

/// Type of relationship between definitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    /// A is declared inside B
    NestedIn,

    /// A calls B
    Call,

    /// Class A lists class B as a base
    InheritsFrom,
}

impl Relation {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NestedIn => "nested_in",
            Self::Call => "call",
            Self::InheritsFrom => "inherits_from",
        }
    }

    /// Relationship type name used by the persistence layer
    #[must_use]
    pub const fn cypher_type(self) -> &'static str {
        match self {
            Self::NestedIn => "NESTED_IN",
            Self::Call => "CALL",
            Self::InheritsFrom => "INHERITS_FROM",
        }
    }
}

/// Directed graph of definitions keyed by definition id
///
/// Edges are identified by `(source, target, relation)`; adding the same
/// triple twice is a no-op and edges never point at missing nodes.
#[derive(Debug, Clone, Default)]
pub struct CodeGraph {
    graph: DiGraph<Definition, Relation>,

    /// Definition id -> NodeIndex mapping for fast lookup
    index: HashMap<String, NodeIndex>,

    edge_set: HashSet<(NodeIndex, NodeIndex, Relation)>,
}

impl CodeGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a definition. A definition whose id is already present replaces
    /// the stored attributes and keeps its node.
    pub fn add_node(&mut self, definition: Definition) -> NodeIndex {
        if let Some(&idx) = self.index.get(&definition.id) {
            self.graph[idx] = definition;
            return idx;
        }

        let id = definition.id.clone();
        let idx = self.graph.add_node(definition);
        self.index.insert(id, idx);
        idx
    }

    /// Add an edge between two existing nodes. Returns `false` when either
    /// end is missing or the edge already exists.
    pub fn add_edge(&mut self, source: &str, target: &str, relation: Relation) -> bool {
        let (Some(&from), Some(&to)) = (self.index.get(source), self.index.get(target)) else {
            return false;
        };
        if !self.edge_set.insert((from, to, relation)) {
            return false;
        }
        self.graph.add_edge(from, to, relation);
        true
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Find node index by definition id
    #[must_use]
    pub fn find_node(&self, id: &str) -> Option<NodeIndex> {
        self.index.get(id).copied()
    }

    /// Get definition by id
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&Definition> {
        self.find_node(id).map(|idx| &self.graph[idx])
    }

    pub(crate) fn node_mut(&mut self, id: &str) -> Option<&mut Definition> {
        let idx = self.find_node(id)?;
        self.graph.node_weight_mut(idx)
    }

    #[must_use]
    pub fn has_edge(&self, source: &str, target: &str, relation: Relation) -> bool {
        match (self.find_node(source), self.find_node(target)) {
            (Some(from), Some(to)) => self.edge_set.contains(&(from, to, relation)),
            _ => false,
        }
    }

    /// All definitions in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &Definition> {
        self.graph.node_weights()
    }

    /// All edges as `(source_id, target_id, relation)` in insertion order
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str, Relation)> {
        self.graph.edge_references().map(|edge| {
            (
                self.graph[edge.source()].id.as_str(),
                self.graph[edge.target()].id.as_str(),
                *edge.weight(),
            )
        })
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Number of edges of one relation kind
    #[must_use]
    pub fn edge_count_by(&self, relation: Relation) -> usize {
        self.graph
            .edge_weights()
            .filter(|weight| **weight == relation)
            .count()
    }

    pub(crate) const fn inner(&self) -> &DiGraph<Definition, Relation> {
        &self.graph
    }
}

#[cfg(test)]
pub(crate) fn definition(id: &str, kind: DefinitionKind, parent_id: Option<&str>) -> Definition {
    Definition {
        id: id.to_string(),
        name: id.rsplit('.').next().unwrap_or(id).to_string(),
        kind,
        file: "test.py".to_string(),
        line: 1,
        code: String::new(),
        docstring: String::new(),
        parent_id: parent_id.map(str::to_string),
        inherits_from: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_node_replaces_duplicate_id() {
        let mut graph = CodeGraph::new();
        let first = graph.add_node(definition("m.f", DefinitionKind::Function, None));
        let mut again = definition("m.f", DefinitionKind::Function, None);
        again.line = 42;
        let second = graph.add_node(again);

        assert_eq!(first, second);
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.node("m.f").map(|d| d.line), Some(42));
    }

    #[test]
    fn test_add_edge_requires_both_nodes() {
        let mut graph = CodeGraph::new();
        graph.add_node(definition("m.a", DefinitionKind::Function, None));

        assert!(!graph.add_edge("m.a", "builtins.print", Relation::Call));
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_edges_are_unique_per_relation() {
        let mut graph = CodeGraph::new();
        graph.add_node(definition("m.A", DefinitionKind::Class, None));
        graph.add_node(definition("m.A.f", DefinitionKind::Method, Some("m.A")));

        assert!(graph.add_edge("m.A.f", "m.A", Relation::NestedIn));
        assert!(!graph.add_edge("m.A.f", "m.A", Relation::NestedIn));
        assert!(graph.add_edge("m.A.f", "m.A", Relation::Call));

        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.edge_count_by(Relation::NestedIn), 1);
        assert!(graph.has_edge("m.A.f", "m.A", Relation::Call));
    }

    #[test]
    fn test_definition_serializes_kind_as_type() {
        let def = definition("m.A", DefinitionKind::Class, None);
        let json = serde_json::to_value(&def).unwrap();
        assert_eq!(json["type"], "class");
        assert_eq!(json["parent_id"], serde_json::Value::Null);
    }
}
