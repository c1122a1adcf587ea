//! Graph export and the persistence contract.
//!
//! A rebuild replaces the stored graph wholesale: sinks are cleared first,
//! then every node and edge is written, then the store-level setup (common
//! label, vector index) runs in [`GraphSink::finish`].

use crate::error::Result;
use crate::types::{CodeGraph, Definition, DefinitionKind, Relation};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::io::Write;

/// Label shared by every definition node
pub const COMMON_LABEL: &str = "CodeEntity";

/// Node property holding the embedding vector
pub const EMBEDDING_PROPERTY: &str = "code_embedding";

pub const VECTOR_INDEX_NAME: &str = "code_embedding";
pub const VECTOR_DIMENSIONS: usize = 1536;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub source: String,
    pub target: String,
    pub relation: Relation,
}

/// Plain enumeration of a graph's nodes and edges
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<Definition>,
    pub edges: Vec<EdgeRecord>,
}

impl GraphSnapshot {
    #[must_use]
    pub fn from_graph(graph: &CodeGraph) -> Self {
        Self {
            nodes: graph.nodes().cloned().collect(),
            edges: edge_records(graph).collect(),
        }
    }

    /// Rebuild a graph; edges whose ends are missing are dropped
    #[must_use]
    pub fn into_graph(self) -> CodeGraph {
        let mut graph = CodeGraph::new();
        for node in self.nodes {
            graph.add_node(node);
        }
        for edge in &self.edges {
            graph.add_edge(&edge.source, &edge.target, edge.relation);
        }
        graph
    }
}

fn edge_records(graph: &CodeGraph) -> impl Iterator<Item = EdgeRecord> + '_ {
    graph.edges().map(|(source, target, relation)| EdgeRecord {
        source: source.to_string(),
        target: target.to_string(),
        relation,
    })
}

/// Which text each label embeds, as `(label, property)` pairs
#[must_use]
pub fn embedding_plan() -> Vec<(&'static str, &'static str)> {
    [
        DefinitionKind::Class,
        DefinitionKind::Method,
        DefinitionKind::Function,
    ]
    .into_iter()
    .map(|kind| (kind.label(), kind.embedding_source()))
    .collect()
}

/// Destination for a finished graph
pub trait GraphSink {
    /// Delete everything previously stored
    fn clear(&mut self) -> Result<()>;

    fn write_node(&mut self, definition: &Definition) -> Result<()>;

    fn write_edge(&mut self, edge: &EdgeRecord) -> Result<()>;

    /// Store-level setup after all nodes and edges are written
    fn finish(&mut self) -> Result<()>;
}

/// Replace the sink's contents with `graph`
pub fn publish<S: GraphSink + ?Sized>(graph: &CodeGraph, sink: &mut S) -> Result<()> {
    sink.clear()?;
    for definition in graph.nodes() {
        sink.write_node(definition)?;
    }
    for edge in edge_records(graph) {
        sink.write_edge(&edge)?;
    }
    sink.finish()?;

    log::info!(
        "Published {} nodes and {} edges",
        graph.node_count(),
        graph.edge_count()
    );
    Ok(())
}

/// Writes the graph as one pretty-printed JSON document
pub struct JsonSink<W: Write> {
    writer: W,
    snapshot: GraphSnapshot,
}

impl<W: Write> JsonSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            snapshot: GraphSnapshot::default(),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> GraphSink for JsonSink<W> {
    fn clear(&mut self) -> Result<()> {
        self.snapshot = GraphSnapshot::default();
        Ok(())
    }

    fn write_node(&mut self, definition: &Definition) -> Result<()> {
        self.snapshot.nodes.push(definition.clone());
        Ok(())
    }

    fn write_edge(&mut self, edge: &EdgeRecord) -> Result<()> {
        self.snapshot.edges.push(edge.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        serde_json::to_writer_pretty(&mut self.writer, &self.snapshot)?;
        writeln!(self.writer)?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Writes a Cypher script that recreates the graph in a property-graph store
pub struct CypherSink<W: Write> {
    writer: W,
}

impl<W: Write> CypherSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> GraphSink for CypherSink<W> {
    fn clear(&mut self) -> Result<()> {
        writeln!(self.writer, "MATCH (n) DETACH DELETE n;")?;
        Ok(())
    }

    fn write_node(&mut self, definition: &Definition) -> Result<()> {
        let mut properties = format!(
            "id: {}, name: {}, type: {}, file: {}, line: {}, code: {}, docstring: {}",
            quote(&definition.id),
            quote(&definition.name),
            quote(definition.kind.as_str()),
            quote(&definition.file),
            definition.line,
            quote(&definition.code),
            quote(&definition.docstring),
        );
        if let Some(parent) = &definition.parent_id {
            let _ = write!(properties, ", parent_id: {}", quote(parent));
        }
        let bases: Vec<String> = definition.inherits_from.iter().map(|b| quote(b)).collect();
        let _ = write!(properties, ", inherits_from: [{}]", bases.join(", "));

        writeln!(
            self.writer,
            "CREATE (:{} {{{properties}}});",
            definition.kind.label()
        )?;
        Ok(())
    }

    fn write_edge(&mut self, edge: &EdgeRecord) -> Result<()> {
        writeln!(
            self.writer,
            "MATCH (a {{id: {}}}), (b {{id: {}}}) CREATE (a)-[:{}]->(b);",
            quote(&edge.source),
            quote(&edge.target),
            edge.relation.cypher_type()
        )?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        writeln!(
            self.writer,
            "MATCH (n) WHERE n:Class OR n:Method OR n:Function SET n:{COMMON_LABEL};"
        )?;
        for (label, property) in embedding_plan() {
            writeln!(
                self.writer,
                "// embed {label}.{property} into {EMBEDDING_PROPERTY}"
            )?;
        }
        writeln!(
            self.writer,
            "CREATE VECTOR INDEX {VECTOR_INDEX_NAME} IF NOT EXISTS FOR (n:{COMMON_LABEL}) \
             ON (n.{EMBEDDING_PROPERTY}) OPTIONS {{indexConfig: {{`vector.dimensions`: \
             {VECTOR_DIMENSIONS}, `vector.similarity_function`: 'cosine'}}}};"
        )?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Single-quoted Cypher string literal
fn quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for c in value.chars() {
        match c {
            '\\' => quoted.push_str("\\\\"),
            '\'' => quoted.push_str("\\'"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            _ => quoted.push(c),
        }
    }
    quoted.push('\'');
    quoted
}
