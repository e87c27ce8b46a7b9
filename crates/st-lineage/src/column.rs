//! Column-granularity lineage.
//!
//! Column edges are the preferred source. When a column has none, tracing
//! degrades to the table-level flow of its owning relation, reported as a
//! single path, so ambiguous SQL still yields an answer.

use st_core::{
    ColumnLineageEdge, ColumnLineageRow, Edge, LineageGraph, LineagePath, NodeId, NodeType,
    TraversalOptions,
};
use std::collections::BTreeMap;

/// Traces column flow through one [`LineageGraph`]
pub struct ColumnLineageTracker<'g> {
    graph: &'g LineageGraph,
}

#[derive(Clone, Copy)]
enum Side {
    Upstream,
    Downstream,
}

impl<'g> ColumnLineageTracker<'g> {
    pub fn new(graph: &'g LineageGraph) -> Self {
        Self { graph }
    }

    /// Columns feeding `table_id.column`, one path per source table
    pub fn trace_column_upstream(&self, table_id: &str, column: &str) -> Vec<LineagePath> {
        let edges: Vec<_> = self.graph.column_edges_into(table_id, column).collect();
        self.trace(table_id, edges, Side::Upstream)
    }

    /// Columns fed by `table_id.column`, one path per target table
    pub fn trace_column_downstream(&self, table_id: &str, column: &str) -> Vec<LineagePath> {
        let edges: Vec<_> = self.graph.column_edges_from(table_id, column).collect();
        self.trace(table_id, edges, Side::Downstream)
    }

    /// Flat rows for every column edge into or out of `table_id.column`,
    /// upstream rows first
    pub fn get_column_lineage_paths(&self, table_id: &str, column: &str) -> Vec<ColumnLineageRow> {
        self.graph
            .column_edges_into(table_id, column)
            .chain(self.graph.column_edges_from(table_id, column))
            .map(ColumnLineageRow::from)
            .collect()
    }

    fn trace(&self, table_id: &str, edges: Vec<&ColumnLineageEdge>, side: Side) -> Vec<LineagePath> {
        if edges.is_empty() {
            return self.table_level_fallback(table_id, side);
        }

        let mut groups: BTreeMap<&NodeId, Vec<&ColumnLineageEdge>> = BTreeMap::new();
        for edge in edges {
            let other = match side {
                Side::Upstream => &edge.source_table_id,
                Side::Downstream => &edge.target_table_id,
            };
            groups.entry(other).or_default().push(edge);
        }

        groups
            .into_values()
            .map(|group| {
                let first = group[0];
                let source = first.source_table_id.clone();
                let target = first.target_table_id.clone();
                let edges = self
                    .graph
                    .edge(&Edge::id_for(&source, &target))
                    .cloned()
                    .into_iter()
                    .collect();
                LineagePath {
                    nodes: vec![source, target],
                    edges,
                    column_edges: group.into_iter().cloned().collect(),
                    depth: 1,
                }
            })
            .collect()
    }

    fn table_level_fallback(&self, table_id: &str, side: Side) -> Vec<LineagePath> {
        let Some(table) = self.graph.find_relation(table_id) else {
            return Vec::new();
        };
        let options = TraversalOptions::new().with_filter_types(NodeType::RELATIONS);
        let flow = match side {
            Side::Upstream => self.graph.get_upstream(&table.id, &options),
            Side::Downstream => self.graph.get_downstream(&table.id, &options),
        };
        if flow.is_empty() {
            return Vec::new();
        }

        log::debug!(
            "No column edges for {}; falling back to table-level lineage",
            table.id
        );
        let mut nodes: Vec<NodeId> = flow.nodes.iter().map(|n| n.id.clone()).collect();
        match side {
            Side::Upstream => nodes.push(table.id.clone()),
            Side::Downstream => nodes.insert(0, table.id.clone()),
        }
        vec![LineagePath {
            nodes,
            edges: flow.edges,
            column_edges: Vec::new(),
            depth: flow.depth,
        }]
    }
}

#[cfg(test)]
#[path = "column_test.rs"]
mod tests;
