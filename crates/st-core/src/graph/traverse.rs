//! Directional traversal and column lineage queries on a built graph

use super::{relation_id_matches, ColumnLineageEdge, Edge, LineageGraph, Node, NodeId, NodeType};
use crate::config::TraversalConfig;
use crate::index::TransformationType;
use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};

/// Options for upstream/downstream traversal
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraversalOptions {
    /// Maximum hops from the start node; `None` is unbounded
    pub max_depth: Option<usize>,
    /// Only visit nodes of these types
    pub filter_types: Option<Vec<NodeType>>,
    /// Do not visit external nodes
    pub exclude_external: bool,
}

impl TraversalOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options seeded from the configured traversal defaults
    pub fn from_config(config: &TraversalConfig) -> Self {
        Self {
            max_depth: config.max_depth(),
            ..Self::default()
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    pub fn with_filter_types(mut self, types: impl IntoIterator<Item = NodeType>) -> Self {
        self.filter_types = Some(types.into_iter().collect());
        self
    }

    pub fn excluding_external(mut self) -> Self {
        self.exclude_external = true;
        self
    }

    /// Whether a node may be visited and expanded
    pub fn accepts(&self, node: &Node) -> bool {
        if self.exclude_external && node.is_external() {
            return false;
        }
        match &self.filter_types {
            Some(types) => types.contains(&node.node_type),
            None => true,
        }
    }
}

/// A sequence of nodes connected by edges
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LineagePath {
    pub nodes: Vec<NodeId>,
    pub edges: Vec<Edge>,
    /// Column edges backing a column-level path
    pub column_edges: Vec<ColumnLineageEdge>,
    pub depth: usize,
}

/// Result of an upstream or downstream traversal
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FlowResult {
    /// Visited nodes, excluding the start node, in discovery order
    pub nodes: Vec<Node>,
    /// Edges that reached a visited node
    pub edges: Vec<Edge>,
    /// One single-hop path per edge
    pub paths: Vec<LineagePath>,
    /// Longest hop count to any visited node
    pub depth: usize,
}

impl FlowResult {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.iter().any(|n| n.id == id)
    }

    /// Ids of the visited nodes
    pub fn node_ids(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.id.as_str()).collect()
    }
}

/// One column-to-column flow, flattened for display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnLineageRow {
    pub edge_id: String,
    pub source_table_id: NodeId,
    pub source_column: String,
    pub target_table_id: NodeId,
    pub target_column: String,
    pub transformation_type: TransformationType,
    pub expression: Option<String>,
    pub file_path: String,
    pub line_number: usize,
}

impl From<&ColumnLineageEdge> for ColumnLineageRow {
    fn from(edge: &ColumnLineageEdge) -> Self {
        Self {
            edge_id: edge.id.clone(),
            source_table_id: edge.source_table_id.clone(),
            source_column: edge.source_column_name.clone(),
            target_table_id: edge.target_table_id.clone(),
            target_column: edge.target_column_name.clone(),
            transformation_type: edge.transformation_type,
            expression: edge.expression.clone(),
            file_path: edge.file_path.clone(),
            line_number: edge.line_number,
        }
    }
}

/// Columns feeding and fed by one column
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ColumnLineageResult {
    pub upstream: Vec<ColumnLineageRow>,
    pub downstream: Vec<ColumnLineageRow>,
}

impl LineageGraph {
    /// Nodes feeding into `id`
    pub fn get_upstream(&self, id: &str, options: &TraversalOptions) -> FlowResult {
        self.traverse(id, Direction::Incoming, options)
    }

    /// Nodes fed by `id`
    pub fn get_downstream(&self, id: &str, options: &TraversalOptions) -> FlowResult {
        self.traverse(id, Direction::Outgoing, options)
    }

    /// Column edges whose target (upstream) or source (downstream) is the given column
    pub fn get_column_lineage(&self, table_id: &str, column: &str) -> ColumnLineageResult {
        let upstream = self
            .column_edges_into(table_id, column)
            .map(ColumnLineageRow::from)
            .collect();
        let downstream = self
            .column_edges_from(table_id, column)
            .map(ColumnLineageRow::from)
            .collect();
        ColumnLineageResult {
            upstream,
            downstream,
        }
    }

    /// Column edges ending at `table.column`
    pub fn column_edges_into<'a>(
        &'a self,
        table_id: &'a str,
        column: &'a str,
    ) -> impl Iterator<Item = &'a ColumnLineageEdge> + 'a {
        self.column_edges.iter().filter(move |e| {
            e.target_column_name.eq_ignore_ascii_case(column)
                && relation_id_matches(e.target_table_id.as_str(), table_id)
        })
    }

    /// Column edges starting at `table.column`
    pub fn column_edges_from<'a>(
        &'a self,
        table_id: &'a str,
        column: &'a str,
    ) -> impl Iterator<Item = &'a ColumnLineageEdge> + 'a {
        self.column_edges.iter().filter(move |e| {
            e.source_column_name.eq_ignore_ascii_case(column)
                && relation_id_matches(e.source_table_id.as_str(), table_id)
        })
    }

    /// Visited-set BFS from `start`.
    ///
    /// Each node is visited once at its first-discovery depth. Nodes rejected
    /// by `options` are neither reported nor expanded.
    fn traverse(&self, start: &str, direction: Direction, options: &TraversalOptions) -> FlowResult {
        let Some(&start_idx) = self.node_index.get(start) else {
            return FlowResult::default();
        };

        let mut visited = HashSet::new();
        visited.insert(start_idx);
        let mut discovered: Vec<NodeIndex> = Vec::new();
        // (from, to, edge position), oriented in traversal direction
        let mut reaching: Vec<(NodeIndex, NodeIndex, usize)> = Vec::new();
        let mut queue = VecDeque::new();
        queue.push_back((start_idx, 0usize));

        while let Some((current, depth)) = queue.pop_front() {
            if options.max_depth.is_some_and(|max| depth >= max) {
                continue;
            }
            let mut adjacent: Vec<_> = self.graph.edges_directed(current, direction).collect();
            adjacent.sort_by_key(|e| *e.weight());
            for edge in adjacent {
                let neighbor = match direction {
                    Direction::Incoming => edge.source(),
                    Direction::Outgoing => edge.target(),
                };
                if neighbor == start_idx {
                    continue;
                }
                let Some(node) = self.nodes.get(&self.graph[neighbor]) else {
                    continue;
                };
                if !options.accepts(node) {
                    continue;
                }
                reaching.push((current, neighbor, *edge.weight()));
                if visited.insert(neighbor) {
                    discovered.push(neighbor);
                    queue.push_back((neighbor, depth + 1));
                }
            }
        }

        let depth = relaxed_depth(start_idx, &discovered, &reaching, options.max_depth);
        let nodes = discovered
            .iter()
            .filter_map(|&idx| self.nodes.get(&self.graph[idx]).cloned())
            .collect();
        let edges: Vec<Edge> = reaching
            .iter()
            .map(|&(_, _, pos)| self.edges[pos].clone())
            .collect();
        let paths = edges
            .iter()
            .map(|edge| LineagePath {
                nodes: vec![edge.source_id.clone(), edge.target_id.clone()],
                edges: vec![edge.clone()],
                column_edges: Vec::new(),
                depth: 1,
            })
            .collect();

        FlowResult {
            nodes,
            edges,
            paths,
            depth,
        }
    }
}

/// Longest-path depth over the traversed edges, by repeated relaxation.
///
/// Depths are capped at the number of visited nodes (and at `max_depth`),
/// so cycles among visited nodes converge.
fn relaxed_depth(
    start: NodeIndex,
    discovered: &[NodeIndex],
    reaching: &[(NodeIndex, NodeIndex, usize)],
    max_depth: Option<usize>,
) -> usize {
    if discovered.is_empty() {
        return 0;
    }
    let mut cap = discovered.len();
    if let Some(max) = max_depth {
        cap = cap.min(max);
    }

    let mut depth: HashMap<NodeIndex, usize> = HashMap::new();
    depth.insert(start, 0);
    for _ in 0..=discovered.len() {
        let mut changed = false;
        for &(from, to, _) in reaching {
            if to == start {
                continue;
            }
            let Some(&from_depth) = depth.get(&from) else {
                continue;
            };
            let candidate = (from_depth + 1).min(cap);
            let entry = depth.entry(to).or_insert(0);
            if candidate > *entry {
                *entry = candidate;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
    depth.values().copied().max().unwrap_or(0)
}
