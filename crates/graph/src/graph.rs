use crate::error::{GraphError, Result};
use crate::types::{CodeGraph, Definition, Relation};
use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::{HashSet, VecDeque};

/// A definition reached from a query root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Neighbor<'g> {
    pub definition: &'g Definition,
    /// Number of edges from the root
    pub distance: usize,
    /// Relation of the edge the definition was first reached through
    pub relation: Relation,
}

impl CodeGraph {
    /// Definitions this one calls
    #[must_use]
    pub fn callees(&self, id: &str) -> Vec<&Definition> {
        self.linked(id, Relation::Call, Direction::Outgoing)
    }

    /// Definitions that call this one
    #[must_use]
    pub fn callers(&self, id: &str) -> Vec<&Definition> {
        self.linked(id, Relation::Call, Direction::Incoming)
    }

    /// Resolved base classes
    #[must_use]
    pub fn bases(&self, id: &str) -> Vec<&Definition> {
        self.linked(id, Relation::InheritsFrom, Direction::Outgoing)
    }

    /// Classes that list this one as a base
    #[must_use]
    pub fn subclasses(&self, id: &str) -> Vec<&Definition> {
        self.linked(id, Relation::InheritsFrom, Direction::Incoming)
    }

    /// Definitions declared directly inside this one
    #[must_use]
    pub fn children(&self, id: &str) -> Vec<&Definition> {
        self.linked(id, Relation::NestedIn, Direction::Incoming)
    }

    /// Nodes linked to `id` by `relation` in `direction`, sorted by id
    fn linked(&self, id: &str, relation: Relation, direction: Direction) -> Vec<&Definition> {
        let Some(idx) = self.find_node(id) else {
            return Vec::new();
        };
        let graph = self.inner();
        let mut linked: Vec<&Definition> = graph
            .edges_directed(idx, direction)
            .filter(|edge| *edge.weight() == relation)
            .map(|edge| match direction {
                Direction::Outgoing => &graph[edge.target()],
                Direction::Incoming => &graph[edge.source()],
            })
            .collect();
        linked.sort_by(|a, b| a.id.cmp(&b.id));
        linked.dedup_by(|a, b| a.id == b.id);
        linked
    }

    /// Definitions within `max_depth` edges of `id`, following edges in both
    /// directions, nearest first
    pub fn neighbors(&self, id: &str, max_depth: usize) -> Result<Vec<Neighbor<'_>>> {
        let root = self
            .find_node(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.to_string()))?;
        let graph = self.inner();

        let mut visited: HashSet<NodeIndex> = HashSet::from([root]);
        let mut queue = VecDeque::from([(root, 0)]);
        let mut result = Vec::new();

        while let Some((current, depth)) = queue.pop_front() {
            if depth == max_depth {
                continue;
            }

            let mut next: Vec<(NodeIndex, Relation)> = graph
                .edges_directed(current, Direction::Outgoing)
                .map(|edge| (edge.target(), *edge.weight()))
                .chain(
                    graph
                        .edges_directed(current, Direction::Incoming)
                        .map(|edge| (edge.source(), *edge.weight())),
                )
                .collect();
            next.sort_by(|a, b| graph[a.0].id.cmp(&graph[b.0].id).then(a.1.cmp(&b.1)));

            for (node, relation) in next {
                if visited.insert(node) {
                    result.push(Neighbor {
                        definition: &graph[node],
                        distance: depth + 1,
                        relation,
                    });
                    queue.push_back((node, depth + 1));
                }
            }
        }

        Ok(result)
    }
}
