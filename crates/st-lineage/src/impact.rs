//! Change-impact analysis.
//!
//! Turns the downstream flow of a relation (or the column edges of a
//! column) into an [`ImpactReport`]: which objects break directly, which
//! break transitively, how severe the change is, and what to do about it.
//!
//! Transitive results are filtered to keep false positives down:
//!
//! - a relation's own columns never count against it
//! - a transitive column needs data-flow provenance (a data-flow edge, a
//!   column edge from an impacted relation, or a foreign key to the target)
//! - a transitive table or view must share a file with the target, be
//!   reached by an edge from one of the target's files, or carry a foreign
//!   key to the target

use serde::{Deserialize, Serialize};
use st_core::identifier::bare_part;
use st_core::{
    relation_id_matches, ColumnLineageEdge, Edge, ImpactConfig, LineageGraph, Node, NodeId,
    NodeType, QualifiedKey, Severity, SeverityThresholds, TraversalOptions,
};
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

/// Kind of change being assessed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangeType {
    Modify,
    Rename,
    Drop,
    AddColumn,
}

impl ChangeType {
    /// Severity of a direct impact of this change
    fn direct_severity(self) -> Severity {
        match self {
            ChangeType::Drop | ChangeType::Rename => Severity::High,
            ChangeType::Modify => Severity::Medium,
            ChangeType::AddColumn => Severity::Low,
        }
    }
}

impl std::fmt::Display for ChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeType::Modify => write!(f, "modify"),
            ChangeType::Rename => write!(f, "rename"),
            ChangeType::Drop => write!(f, "drop"),
            ChangeType::AddColumn => write!(f, "addColumn"),
        }
    }
}

/// One affected object
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImpactItem {
    pub node_id: NodeId,
    pub name: String,
    pub node_type: NodeType,
    /// Why the object is affected
    pub reason: String,
    pub file_path: Option<String>,
    pub line_number: Option<usize>,
    pub severity: Severity,
}

impl ImpactItem {
    fn for_node(node: &Node, reason: String, severity: Severity) -> Self {
        Self {
            node_id: node.id.clone(),
            name: node.name.clone(),
            node_type: node.node_type,
            reason,
            file_path: node.file_path.clone(),
            line_number: node.line_number,
            severity,
        }
    }
}

/// Distinct counts over all affected objects
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImpactSummary {
    pub tables: usize,
    pub views: usize,
    pub files: usize,
    /// Direct plus transitive impacts
    pub total: usize,
}

/// Result of an impact analysis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImpactReport {
    pub change_type: ChangeType,
    /// The changed object as the caller named it
    pub target: String,
    /// Resolved node, if the target was found
    pub target_id: Option<NodeId>,
    pub direct_impacts: Vec<ImpactItem>,
    pub transitive_impacts: Vec<ImpactItem>,
    pub summary: ImpactSummary,
    pub severity: Severity,
    pub suggestions: Vec<String>,
}

impl ImpactReport {
    /// Whether the target resolved to a graph node
    pub fn found(&self) -> bool {
        self.target_id.is_some()
    }

    fn not_found(target: String, change_type: ChangeType) -> Self {
        let suggestions = vec![format!(
            "'{}' was not found in the workspace index; it may be an external or unindexed object",
            target
        )];
        Self {
            change_type,
            target,
            target_id: None,
            direct_impacts: Vec::new(),
            transitive_impacts: Vec::new(),
            summary: ImpactSummary::default(),
            severity: Severity::Low,
            suggestions,
        }
    }
}

/// Impact queries against one [`LineageGraph`]
pub struct ImpactAnalyzer<'g> {
    graph: &'g LineageGraph,
    thresholds: SeverityThresholds,
}

impl<'g> ImpactAnalyzer<'g> {
    pub fn new(graph: &'g LineageGraph) -> Self {
        Self::from_config(graph, &ImpactConfig::default())
    }

    pub fn from_config(graph: &'g LineageGraph, config: &ImpactConfig) -> Self {
        Self {
            graph,
            thresholds: config.thresholds,
        }
    }

    pub fn analyze_rename(&self, name: &str) -> ImpactReport {
        self.analyze_table_change(name, ChangeType::Rename)
    }

    pub fn analyze_drop(&self, name: &str) -> ImpactReport {
        self.analyze_table_change(name, ChangeType::Drop)
    }

    /// Impact of changing a table, view or CTE
    pub fn analyze_table_change(&self, name: &str, change_type: ChangeType) -> ImpactReport {
        let Some(target) = self.graph.find_relation(name) else {
            return ImpactReport::not_found(name.to_string(), change_type);
        };

        let flow = self
            .graph
            .get_downstream(&target.id, &TraversalOptions::new().excluding_external());
        let reaching = reaching_edges(&flow.edges);
        let target_files = self.files_of(target);
        let direct_severity = change_type.direct_severity();

        let mut direct = Vec::new();
        let mut transitive_relations: Vec<&Node> = Vec::new();
        let mut transitive_columns: Vec<&Node> = Vec::new();
        for node in &flow.nodes {
            // resolve against the graph so the items borrow from it
            let Some(node) = self.graph.node(&node.id) else {
                continue;
            };
            if node.parent_id.as_ref() == Some(&target.id) {
                continue;
            }
            if let Some(edge) = self.data_flow_edge(&target.id, &node.id) {
                let reason = format!("Reads from {} ({} flow)", target.name, edge.edge_type);
                direct.push(ImpactItem::for_node(node, reason, direct_severity));
            } else if node.is_column() {
                transitive_columns.push(node);
            } else {
                transitive_relations.push(node);
            }
        }

        let mut transitive = Vec::new();
        let mut kept: HashSet<&NodeId> = direct.iter().map(|i| &i.node_id).collect();
        kept.insert(&target.id);
        for node in transitive_relations {
            let Some(reason) = self.relation_justification(node, target, &target_files, &reaching)
            else {
                log::debug!("Suppressing cross-file transitive impact {}", node.id);
                continue;
            };
            kept.insert(&node.id);
            transitive.push(ImpactItem::for_node(node, reason, direct_severity.downgrade()));
        }
        let kept: HashSet<NodeId> = kept.into_iter().cloned().collect();
        for node in transitive_columns {
            let owner_kept = node.parent_id.as_ref().is_some_and(|p| kept.contains(p));
            if !owner_kept {
                continue;
            }
            if let Some(reason) = self.column_provenance(node, target, &kept) {
                transitive.push(ImpactItem::for_node(node, reason, direct_severity.downgrade()));
            }
        }

        let suggestions = self.table_suggestions(target, change_type, &direct, &transitive);
        self.finish(
            target.name.clone(),
            Some(target.id.clone()),
            change_type,
            direct,
            transitive,
            suggestions,
        )
    }

    /// Impact of changing one column.
    ///
    /// Uses column edges when the column has any, following them
    /// transitively; otherwise degrades to the table-level flow of the
    /// owning relation.
    pub fn analyze_column_change(
        &self,
        table: &str,
        column: &str,
        change_type: ChangeType,
    ) -> ImpactReport {
        let label = format!("{}.{}", table, column);
        let Some(owner) = self.graph.find_relation(table) else {
            return ImpactReport::not_found(label, change_type);
        };
        let target_id = self
            .graph
            .columns_of(&owner.id)
            .into_iter()
            .find(|c| c.name.eq_ignore_ascii_case(column))
            .map(|c| c.id.clone())
            .unwrap_or_else(|| owner.id.clone());
        let direct_severity = change_type.direct_severity();

        let first_hop: Vec<&ColumnLineageEdge> =
            self.graph.column_edges_from(&owner.id, column).collect();
        let (direct, transitive) = if first_hop.is_empty() {
            self.table_level_column_impact(owner, column, direct_severity)
        } else {
            self.column_edge_impact(owner, column, first_hop, direct_severity)
        };

        let mut suggestions = Vec::new();
        let total = direct.len() + transitive.len();
        push_change_suggestions(&mut suggestions, &label, change_type, total);
        self.finish(
            format!("{}.{}", owner.name, column),
            Some(target_id),
            change_type,
            direct,
            transitive,
            suggestions,
        )
    }

    fn column_edge_impact(
        &self,
        owner: &Node,
        column: &str,
        first_hop: Vec<&ColumnLineageEdge>,
        direct_severity: Severity,
    ) -> (Vec<ImpactItem>, Vec<ImpactItem>) {
        let mut visited: HashSet<(NodeId, String)> = HashSet::new();
        visited.insert((owner.id.clone(), column.to_lowercase()));
        let mut direct = Vec::new();
        let mut transitive = Vec::new();
        let mut queue: VecDeque<(&ColumnLineageEdge, bool)> =
            first_hop.into_iter().map(|e| (e, true)).collect();

        while let Some((edge, is_direct)) = queue.pop_front() {
            let key = (
                edge.target_table_id.clone(),
                edge.target_column_name.to_lowercase(),
            );
            if !visited.insert(key) {
                continue;
            }
            let reason = format!(
                "{}.{} feeds {}.{} ({})",
                edge.source_table_id.key_part(),
                edge.source_column_name,
                edge.target_table_id.key_part(),
                edge.target_column_name,
                edge.transformation_type
            );
            let item = self.column_item(edge, reason, direct_severity, is_direct);
            if is_direct {
                direct.push(item);
            } else {
                transitive.push(item);
            }
            for next in self
                .graph
                .column_edges_from(&edge.target_table_id, &edge.target_column_name)
            {
                queue.push_back((next, false));
            }
        }
        (direct, transitive)
    }

    fn column_item(
        &self,
        edge: &ColumnLineageEdge,
        reason: String,
        direct_severity: Severity,
        is_direct: bool,
    ) -> ImpactItem {
        let severity = if is_direct {
            direct_severity
        } else {
            direct_severity.downgrade()
        };
        let column_id = QualifiedKey::try_new(edge.target_table_id.key_part())
            .map(|key| NodeId::column(&key, &edge.target_column_name));
        if let Some(node) = column_id.as_ref().and_then(|id| self.graph.node(id)) {
            let mut item = ImpactItem::for_node(node, reason, severity);
            item.file_path = Some(edge.file_path.clone());
            item.line_number = Some(edge.line_number);
            return item;
        }
        ImpactItem {
            node_id: column_id.unwrap_or_else(|| edge.target_table_id.clone()),
            name: format!(
                "{}.{}",
                bare_part(edge.target_table_id.key_part()),
                edge.target_column_name
            ),
            node_type: NodeType::Column,
            reason,
            file_path: Some(edge.file_path.clone()),
            line_number: Some(edge.line_number),
            severity,
        }
    }

    fn table_level_column_impact(
        &self,
        owner: &Node,
        column: &str,
        direct_severity: Severity,
    ) -> (Vec<ImpactItem>, Vec<ImpactItem>) {
        let options = TraversalOptions::new()
            .excluding_external()
            .with_filter_types(NodeType::RELATIONS);
        let flow = self.graph.get_downstream(&owner.id, &options);
        let mut direct = Vec::new();
        let mut transitive = Vec::new();
        for node in &flow.nodes {
            if self.data_flow_edge(&owner.id, &node.id).is_some() {
                let reason = format!(
                    "Reads from {} (no column lineage for '{}')",
                    owner.name, column
                );
                direct.push(ImpactItem::for_node(node, reason, direct_severity));
            } else {
                let reason = format!("Transitively reads from {}", owner.name);
                transitive.push(ImpactItem::for_node(
                    node,
                    reason,
                    direct_severity.downgrade(),
                ));
            }
        }
        (direct, transitive)
    }

    fn finish(
        &self,
        target: String,
        target_id: Option<NodeId>,
        change_type: ChangeType,
        direct_impacts: Vec<ImpactItem>,
        transitive_impacts: Vec<ImpactItem>,
        mut suggestions: Vec<String>,
    ) -> ImpactReport {
        let summary = summarize(&direct_impacts, &transitive_impacts);
        let severity = self.thresholds.classify(summary.total);
        if severity.is_high_or_above() {
            suggestions.push("Schedule the change in a maintenance window".to_string());
            suggestions.push("Prepare a rollback plan before applying the change".to_string());
        }
        ImpactReport {
            change_type,
            target,
            target_id,
            direct_impacts,
            transitive_impacts,
            summary,
            severity,
            suggestions,
        }
    }

    /// The data-flow edge `from -> to`, if there is one
    fn data_flow_edge(&self, from: &NodeId, to: &NodeId) -> Option<&'g Edge> {
        self.graph
            .edge(&Edge::id_for(from, to))
            .filter(|e| !e.is_structural())
    }

    /// Files the target is defined in or has data-flow edges from
    fn files_of(&self, target: &Node) -> HashSet<String> {
        let mut files: HashSet<String> = target.file_path.iter().cloned().collect();
        for edge in self
            .graph
            .incoming_edges(&target.id)
            .into_iter()
            .chain(self.graph.outgoing_edges(&target.id))
        {
            if let Some(file) = edge.origin_file() {
                files.insert(file.to_string());
            }
        }
        files
    }

    fn relation_justification(
        &self,
        node: &Node,
        target: &Node,
        target_files: &HashSet<String>,
        reaching: &HashMap<&NodeId, Vec<&Edge>>,
    ) -> Option<String> {
        let via = reaching
            .get(&node.id)
            .and_then(|edges| edges.first())
            .and_then(|e| self.graph.node(&e.source_id))
            .map_or_else(|| target.name.clone(), |n| n.name.clone());

        if node
            .file_path
            .as_ref()
            .is_some_and(|f| target_files.contains(f))
        {
            return Some(format!("Transitively depends on {} via {}", target.name, via));
        }
        let from_target_file = reaching.get(&node.id).is_some_and(|edges| {
            edges
                .iter()
                .any(|e| e.origin_file().is_some_and(|f| target_files.contains(f)))
        });
        if from_target_file {
            return Some(format!("Transitively depends on {} via {}", target.name, via));
        }
        self.graph
            .columns_of(&node.id)
            .into_iter()
            .find_map(|c| foreign_key_reason(c, node, target))
    }

    fn column_provenance(&self, column: &Node, target: &Node, kept: &HashSet<NodeId>) -> Option<String> {
        let owner_id = column.parent_id.as_ref()?;
        let owner_name = self
            .graph
            .node(owner_id)
            .map_or_else(|| bare_part(owner_id.key_part()).to_string(), |n| n.name.clone());

        let flows_in = self
            .graph
            .incoming_edges(&column.id)
            .into_iter()
            .find(|e| !e.is_structural());
        if let Some(edge) = flows_in {
            return Some(format!("Data flows from {}", edge.source_id));
        }

        let fed_by = self
            .graph
            .column_edges_into(owner_id, &column.name)
            .find(|e| kept.contains(&e.source_table_id));
        if let Some(edge) = fed_by {
            return Some(format!(
                "{}.{} \u{2192} {}.{}",
                bare_part(edge.source_table_id.key_part()),
                edge.source_column_name,
                owner_name,
                column.name
            ));
        }

        let owner = self.graph.node(owner_id)?;
        foreign_key_reason(column, owner, target)
    }

    fn table_suggestions(
        &self,
        target: &Node,
        change_type: ChangeType,
        direct: &[ImpactItem],
        transitive: &[ImpactItem],
    ) -> Vec<String> {
        let mut suggestions = Vec::new();
        push_change_suggestions(
            &mut suggestions,
            &target.name,
            change_type,
            direct.len() + transitive.len(),
        );
        if change_type == ChangeType::AddColumn {
            let consumers: BTreeSet<&str> = self
                .graph
                .column_edges()
                .iter()
                .filter(|e| e.is_wildcard_source())
                .filter(|e| relation_id_matches(e.source_table_id.as_str(), &target.id))
                .map(|e| e.target_table_id.key_part())
                .collect();
            if !consumers.is_empty() {
                let list: Vec<&str> = consumers.into_iter().collect();
                suggestions.push(format!(
                    "Review SELECT * consumers that will pick up the new column: {}",
                    list.join(", ")
                ));
            }
        }
        suggestions
    }
}

/// FK on `column` (owned by `owner`) that points at `target`
fn foreign_key_reason(column: &Node, owner: &Node, target: &Node) -> Option<String> {
    let fk = column.column_info()?.foreign_key.as_ref()?;
    if !relation_id_matches(&target.id, &fk.referenced_table) {
        return None;
    }
    Some(format!(
        "{}.{} \u{2192} {}.{}",
        owner.name, column.name, fk.referenced_table, fk.referenced_column
    ))
}

/// Reaching edges grouped by the node they reach
fn reaching_edges(edges: &[Edge]) -> HashMap<&NodeId, Vec<&Edge>> {
    let mut by_target: HashMap<&NodeId, Vec<&Edge>> = HashMap::new();
    for edge in edges {
        by_target.entry(&edge.target_id).or_default().push(edge);
    }
    by_target
}

fn push_change_suggestions(
    suggestions: &mut Vec<String>,
    target: &str,
    change_type: ChangeType,
    total: usize,
) {
    if total == 0 {
        suggestions.push(format!(
            "No dependent objects found; '{}' can be changed safely",
            target
        ));
        return;
    }
    let message = match change_type {
        ChangeType::Drop => format!(
            "Deprecate '{}' before dropping it; {} dependent object(s) still read from it",
            target, total
        ),
        ChangeType::Rename => format!(
            "Update {} reference(s) to '{}', or keep a compatibility view under the old name",
            total, target
        ),
        ChangeType::Modify => format!(
            "Re-validate {} downstream object(s) after modifying '{}'",
            total, target
        ),
        ChangeType::AddColumn => format!(
            "Adding a column to '{}' is safe for consumers that list columns explicitly",
            target
        ),
    };
    suggestions.push(message);
}

fn summarize(direct: &[ImpactItem], transitive: &[ImpactItem]) -> ImpactSummary {
    let mut tables = HashSet::new();
    let mut views = HashSet::new();
    let mut files = HashSet::new();
    for item in direct.iter().chain(transitive) {
        match item.node_type {
            NodeType::Table => {
                tables.insert(&item.node_id);
            }
            NodeType::View => {
                views.insert(&item.node_id);
            }
            _ => {}
        }
        if let Some(file) = &item.file_path {
            files.insert(file);
        }
    }
    ImpactSummary {
        tables: tables.len(),
        views: views.len(),
        files: files.len(),
        total: direct.len() + transitive.len(),
    }
}

#[cfg(test)]
#[path = "impact_test.rs"]
mod tests;
