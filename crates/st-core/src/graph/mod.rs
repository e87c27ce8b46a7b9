//! Lineage graph model.
//!
//! Construction goes through [`GraphDraft`], which owns all mutation and
//! de-duplicates nodes and edges by id. [`GraphDraft::freeze`] produces a
//! read-only [`LineageGraph`] backed by a petgraph adjacency index; every
//! analyzer works against that immutable snapshot.

mod edge;
mod node;
mod traverse;

pub use edge::{ColumnLineageEdge, Edge, EdgeRelationship, EdgeType};
pub use node::{ColumnInfo, Node, NodeId, NodeMetadata, NodeType};
pub use traverse::{
    ColumnLineageResult, ColumnLineageRow, FlowResult, LineagePath, TraversalOptions,
};

use crate::identifier::{bare_part, qualified_key};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Mutable graph under construction
#[derive(Debug, Default)]
pub struct GraphDraft {
    nodes: BTreeMap<NodeId, Node>,
    edges: Vec<Edge>,
    edge_ids: HashSet<String>,
    column_edges: Vec<ColumnLineageEdge>,
    column_edge_ids: HashSet<String>,
}

impl GraphDraft {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node. Returns `false` if a node with the same id already exists.
    pub fn add_node(&mut self, node: Node) -> bool {
        if self.nodes.contains_key(&node.id) {
            return false;
        }
        self.nodes.insert(node.id.clone(), node);
        true
    }

    /// Add an edge, de-duplicated by id.
    ///
    /// Returns `false` when the id is already present or either endpoint is
    /// not in the draft.
    pub fn add_edge(&mut self, edge: Edge) -> bool {
        if self.edge_ids.contains(&edge.id) {
            return false;
        }
        if !self.nodes.contains_key(&edge.source_id) || !self.nodes.contains_key(&edge.target_id) {
            log::debug!("Skipping edge {} with a missing endpoint", edge.id);
            return false;
        }
        self.edge_ids.insert(edge.id.clone());
        self.edges.push(edge);
        true
    }

    /// Add a column edge, de-duplicated by id
    pub fn add_column_edge(&mut self, edge: ColumnLineageEdge) -> bool {
        if !self.column_edge_ids.insert(edge.id.clone()) {
            return false;
        }
        self.column_edges.push(edge);
        true
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// All nodes, ordered by id
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Finish construction
    pub fn freeze(self) -> LineageGraph {
        let mut graph = DiGraph::with_capacity(self.nodes.len(), self.edges.len());
        let mut node_index = HashMap::with_capacity(self.nodes.len());
        for id in self.nodes.keys() {
            let idx = graph.add_node(id.clone());
            node_index.insert(id.clone(), idx);
        }
        for (pos, edge) in self.edges.iter().enumerate() {
            // add_edge guarantees both endpoints exist
            if let (Some(&from), Some(&to)) =
                (node_index.get(&edge.source_id), node_index.get(&edge.target_id))
            {
                graph.add_edge(from, to, pos);
            }
        }
        let edge_index = self
            .edges
            .iter()
            .enumerate()
            .map(|(pos, edge)| (edge.id.clone(), pos))
            .collect();
        LineageGraph {
            nodes: self.nodes,
            edges: self.edges,
            edge_index,
            column_edges: self.column_edges,
            graph,
            node_index,
        }
    }
}

/// Node and edge counts of a built graph
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    pub tables: usize,
    pub views: usize,
    pub columns: usize,
    pub ctes: usize,
    pub externals: usize,
    pub data_flow_edges: usize,
    pub structural_edges: usize,
    pub column_edges: usize,
}

/// Immutable lineage graph snapshot
#[derive(Debug)]
pub struct LineageGraph {
    nodes: BTreeMap<NodeId, Node>,
    edges: Vec<Edge>,
    column_edges: Vec<ColumnLineageEdge>,
    /// Edge id -> position in `edges`
    edge_index: HashMap<String, usize>,

    /// Adjacency index; edge weights are positions in `edges`
    graph: DiGraph<NodeId, usize>,
    node_index: HashMap<NodeId, NodeIndex>,
}

impl Default for LineageGraph {
    fn default() -> Self {
        GraphDraft::new().freeze()
    }
}

impl LineageGraph {
    /// Look up a node by id
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// All nodes, ordered by id
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// All edges in insertion order
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// All column edges in insertion order
    pub fn column_edges(&self) -> &[ColumnLineageEdge] {
        &self.column_edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Look up an edge by its `source->target` id
    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edge_index.get(id).map(|&pos| &self.edges[pos])
    }

    /// Edges ending at `id`
    pub fn incoming_edges(&self, id: &str) -> Vec<&Edge> {
        self.adjacent_edges(id, Direction::Incoming)
    }

    /// Edges starting at `id`
    pub fn outgoing_edges(&self, id: &str) -> Vec<&Edge> {
        self.adjacent_edges(id, Direction::Outgoing)
    }

    fn adjacent_edges(&self, id: &str, direction: Direction) -> Vec<&Edge> {
        let Some(&idx) = self.node_index.get(id) else {
            return Vec::new();
        };
        let mut edges: Vec<&Edge> = self
            .graph
            .edges_directed(idx, direction)
            .map(|e| &self.edges[*e.weight()])
            .collect();
        edges.sort_by(|a, b| a.id.cmp(&b.id));
        edges
    }

    /// Whether the graph contains any directed cycle.
    ///
    /// Structural edges end at column nodes, which have no outgoing edges,
    /// so only data-flow edges can close a cycle.
    pub fn has_cycle(&self) -> bool {
        petgraph::algo::is_cyclic_directed(&self.graph)
    }

    /// Column nodes owned by a relation
    pub fn columns_of(&self, relation_id: &str) -> Vec<&Node> {
        self.nodes
            .values()
            .filter(|n| n.parent_id.as_ref().is_some_and(|p| p == relation_id))
            .collect()
    }

    /// Count nodes by type and edges by kind
    pub fn stats(&self) -> GraphStats {
        let mut stats = GraphStats {
            column_edges: self.column_edges.len(),
            ..Default::default()
        };
        for node in self.nodes.values() {
            match node.node_type {
                NodeType::Table => stats.tables += 1,
                NodeType::View => stats.views += 1,
                NodeType::Column => stats.columns += 1,
                NodeType::Cte => stats.ctes += 1,
                NodeType::External => stats.externals += 1,
            }
        }
        for edge in &self.edges {
            if edge.is_structural() {
                stats.structural_edges += 1;
            } else {
                stats.data_flow_edges += 1;
            }
        }
        stats
    }

    /// Resolve a user-supplied relation name or node id to a node.
    ///
    /// Tries, in order: an exact node id, the normalized key under each
    /// relation prefix (table, view, cte, external), then, for unqualified
    /// names only, the single relation whose bare name matches. A qualified
    /// name never resolves to a relation in another schema.
    pub fn find_relation(&self, name: &str) -> Option<&Node> {
        if let Some(node) = self.nodes.get(name.trim()) {
            return Some(node);
        }
        let key = qualified_key(name, None)?;
        let by_prefix = NodeType::RELATIONS
            .iter()
            .find_map(|t| self.nodes.get(format!("{}:{}", t.prefix(), key).as_str()));
        if by_prefix.is_some() {
            return by_prefix;
        }
        if key.schema().is_some() {
            return None;
        }
        let bare = key.bare_name();
        let mut matches = self
            .nodes
            .values()
            .filter(|n| n.node_type != NodeType::Column)
            .filter(|n| bare_part(n.id.key_part()) == bare);
        match (matches.next(), matches.next()) {
            (Some(only), None) => Some(only),
            _ => None,
        }
    }
}

/// Whether a relation node id refers to the `wanted` relation.
///
/// Matches on the exact id, on the full key of `wanted` after a `:`, or on
/// its bare name after a `:`. An unqualified `wanted` also matches any schema
/// (`.name` suffix); a qualified one never matches another schema.
///
/// ```
/// use st_core::graph::relation_id_matches;
/// assert!(relation_id_matches("table:sales.orders", "table:orders"));
/// assert!(relation_id_matches("table:orders", "sales.orders"));
/// assert!(relation_id_matches("view:orders", "orders"));
/// assert!(!relation_id_matches("table:myorders", "orders"));
/// assert!(!relation_id_matches("table:hr.orders", "table:sales.orders"));
/// ```
pub fn relation_id_matches(candidate: &str, wanted: &str) -> bool {
    if candidate.eq_ignore_ascii_case(wanted) {
        return true;
    }
    let wanted_key = wanted
        .split_once(':')
        .map_or(wanted, |(_, key)| key)
        .to_lowercase();
    let bare = bare_part(&wanted_key);
    if bare.is_empty() {
        return false;
    }
    let candidate = candidate.to_lowercase();
    if candidate.ends_with(&format!(":{}", wanted_key)) || candidate.ends_with(&format!(":{}", bare))
    {
        return true;
    }
    let wanted_is_qualified = bare.len() != wanted_key.len();
    !wanted_is_qualified && candidate.ends_with(&format!(".{}", bare))
}

#[cfg(test)]
#[path = "graph_test.rs"]
mod tests;
