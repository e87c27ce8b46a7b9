//! Directed traversal over a built lineage graph

use serde::Serialize;
use st_core::{
    Edge, FlowResult, LineageGraph, LineagePath, Node, NodeId, NodeType, TraversalConfig,
    TraversalOptions,
};
use std::collections::{HashMap, HashSet};

/// Both directions of a node's lineage
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FullLineage {
    pub upstream: FlowResult,
    pub downstream: FlowResult,
}

/// Read-only traversal queries against one [`LineageGraph`].
///
/// Unknown node ids never fail; they produce empty results.
pub struct FlowAnalyzer<'g> {
    graph: &'g LineageGraph,
    defaults: TraversalOptions,
    max_paths: usize,
}

impl<'g> FlowAnalyzer<'g> {
    pub fn new(graph: &'g LineageGraph) -> Self {
        Self::from_config(graph, &TraversalConfig::default())
    }

    /// Analyzer using the configured depth default and path cap
    pub fn from_config(graph: &'g LineageGraph, config: &TraversalConfig) -> Self {
        Self {
            graph,
            defaults: TraversalOptions::from_config(config),
            max_paths: config.max_paths,
        }
    }

    pub fn graph(&self) -> &'g LineageGraph {
        self.graph
    }

    /// Options used when the caller has none of its own
    pub fn default_options(&self) -> &TraversalOptions {
        &self.defaults
    }

    pub fn get_upstream(&self, node_id: &str, options: &TraversalOptions) -> FlowResult {
        self.graph.get_upstream(node_id, options)
    }

    pub fn get_downstream(&self, node_id: &str, options: &TraversalOptions) -> FlowResult {
        self.graph.get_downstream(node_id, options)
    }

    /// Upstream and downstream of `node_id` with the same options
    pub fn get_full_lineage(&self, node_id: &str, options: &TraversalOptions) -> FullLineage {
        FullLineage {
            upstream: self.get_upstream(node_id, options),
            downstream: self.get_downstream(node_id, options),
        }
    }

    /// Every simple path from `from` to `to`, following edge direction.
    ///
    /// Enumeration stops once the configured path cap is reached.
    pub fn get_path_between(&self, from: &str, to: &str) -> Vec<LineagePath> {
        let mut paths = Vec::new();
        if from == to || !self.graph.contains_node(from) || !self.graph.contains_node(to) {
            return paths;
        }
        let Some(start) = self.graph.node(from) else {
            return paths;
        };

        let mut search = PathSearch {
            graph: self.graph,
            target: to,
            max_paths: self.max_paths,
            on_stack: HashSet::new(),
            nodes: vec![start.id.clone()],
            edges: Vec::new(),
        };
        search.on_stack.insert(start.id.clone());
        search.walk(&start.id, &mut paths);
        paths
    }

    /// Relations with no incoming data flow.
    ///
    /// Columns and external nodes are never reported.
    pub fn find_root_sources(&self) -> Vec<&'g Node> {
        self.graph
            .nodes()
            .filter(|n| is_flow_node(n))
            .filter(|n| !self.graph.incoming_edges(&n.id).iter().any(|e| !e.is_structural()))
            .collect()
    }

    /// Relations with no outgoing data flow.
    ///
    /// Columns and external nodes are never reported.
    pub fn find_terminal_nodes(&self) -> Vec<&'g Node> {
        self.graph
            .nodes()
            .filter(|n| is_flow_node(n))
            .filter(|n| !self.graph.outgoing_edges(&n.id).iter().any(|e| !e.is_structural()))
            .collect()
    }

    /// Directed cycles found by a white/gray/black depth-first search.
    ///
    /// Each cycle lists its nodes in edge order and repeats the first node
    /// at the end, so `[a, b, a]` is the cycle `a -> b -> a`.
    pub fn detect_cycles(&self) -> Vec<Vec<NodeId>> {
        if !self.graph.has_cycle() {
            return Vec::new();
        }
        let mut search = CycleSearch {
            graph: self.graph,
            color: HashMap::new(),
            stack: Vec::new(),
            cycles: Vec::new(),
        };
        for node in self.graph.nodes() {
            if search.color_of(&node.id) == Color::White {
                search.visit(&node.id);
            }
        }
        search.cycles
    }

    /// Whether any cycle exists
    pub fn has_cycles(&self) -> bool {
        self.graph.has_cycle()
    }
}

fn is_flow_node(node: &Node) -> bool {
    !matches!(node.node_type, NodeType::Column | NodeType::External)
}

struct PathSearch<'g, 't> {
    graph: &'g LineageGraph,
    target: &'t str,
    max_paths: usize,
    on_stack: HashSet<NodeId>,
    nodes: Vec<NodeId>,
    edges: Vec<Edge>,
}

impl PathSearch<'_, '_> {
    fn walk(&mut self, current: &str, paths: &mut Vec<LineagePath>) {
        let graph = self.graph;
        for edge in graph.outgoing_edges(current) {
            if paths.len() >= self.max_paths {
                return;
            }
            let next = &edge.target_id;
            if self.on_stack.contains(next) {
                continue;
            }
            self.nodes.push(next.clone());
            self.edges.push(edge.clone());

            if next == self.target {
                paths.push(LineagePath {
                    nodes: self.nodes.clone(),
                    edges: self.edges.clone(),
                    column_edges: Vec::new(),
                    depth: self.edges.len(),
                });
            } else {
                self.on_stack.insert(next.clone());
                self.walk(next, paths);
                self.on_stack.remove(next);
            }

            self.nodes.pop();
            self.edges.pop();
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

struct CycleSearch<'g> {
    graph: &'g LineageGraph,
    color: HashMap<NodeId, Color>,
    stack: Vec<NodeId>,
    cycles: Vec<Vec<NodeId>>,
}

impl CycleSearch<'_> {
    fn color_of(&self, id: &str) -> Color {
        self.color.get(id).copied().unwrap_or(Color::White)
    }

    fn visit(&mut self, id: &NodeId) {
        self.color.insert(id.clone(), Color::Gray);
        self.stack.push(id.clone());

        let graph = self.graph;
        for edge in graph.outgoing_edges(id) {
            if edge.is_structural() {
                continue;
            }
            let next = &edge.target_id;
            match self.color_of(next) {
                Color::White => self.visit(next),
                Color::Gray => {
                    if let Some(pos) = self.stack.iter().position(|n| n == next) {
                        let mut cycle = self.stack[pos..].to_vec();
                        cycle.push(next.clone());
                        self.cycles.push(cycle);
                    }
                }
                Color::Black => {}
            }
        }

        self.stack.pop();
        self.color.insert(id.clone(), Color::Black);
    }
}

#[cfg(test)]
#[path = "flow_test.rs"]
mod tests;
