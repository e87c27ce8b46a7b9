//! Graph edge types

use super::node::NodeId;
use crate::index::{ColumnTransformation, ReferenceType, TransformationType};
use serde::{Deserialize, Serialize};

/// Kind of table-level data flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeType {
    /// Plain read
    Direct,
    /// Computed from the source
    Transform,
    /// Aggregated from the source
    Aggregate,
    /// Source used as a filter (subquery)
    Filter,
    /// Source joined in
    Join,
}

impl EdgeType {
    /// Edge type implied by how the input relation was referenced
    pub fn for_reference(reference_type: ReferenceType) -> Self {
        match reference_type {
            ReferenceType::Join => EdgeType::Join,
            ReferenceType::Subquery => EdgeType::Filter,
            _ => EdgeType::Direct,
        }
    }
}

impl std::fmt::Display for EdgeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EdgeType::Direct => "direct",
            EdgeType::Transform => "transform",
            EdgeType::Aggregate => "aggregate",
            EdgeType::Filter => "filter",
            EdgeType::Join => "join",
        };
        f.write_str(s)
    }
}

/// What an edge means
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "relationship", rename_all = "snake_case")]
pub enum EdgeRelationship {
    /// Structural relation -> column containment; never data flow
    Contains,
    /// Data flows from source to target in the given statement
    DataFlow {
        file_path: String,
        statement_index: usize,
    },
}

/// A directed edge between two nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// `source->target`
    pub id: String,
    pub source_id: NodeId,
    pub target_id: NodeId,
    pub edge_type: EdgeType,
    /// Transformation expression text, if known
    pub transformation: Option<String>,
    pub relationship: EdgeRelationship,
}

impl Edge {
    /// Deterministic edge id for a pair of endpoints
    pub fn id_for(source: &NodeId, target: &NodeId) -> String {
        format!("{}->{}", source, target)
    }

    /// Structural containment edge from a relation to one of its columns
    pub fn contains(owner: &NodeId, column: &NodeId) -> Self {
        Self {
            id: Self::id_for(owner, column),
            source_id: owner.clone(),
            target_id: column.clone(),
            edge_type: EdgeType::Direct,
            transformation: None,
            relationship: EdgeRelationship::Contains,
        }
    }

    /// Data-flow edge originating from one statement of a file
    pub fn data_flow(
        source: &NodeId,
        target: &NodeId,
        edge_type: EdgeType,
        file_path: &str,
        statement_index: usize,
    ) -> Self {
        Self {
            id: Self::id_for(source, target),
            source_id: source.clone(),
            target_id: target.clone(),
            edge_type,
            transformation: None,
            relationship: EdgeRelationship::DataFlow {
                file_path: file_path.to_string(),
                statement_index,
            },
        }
    }

    /// Whether this is a structural `contains` edge
    pub fn is_structural(&self) -> bool {
        matches!(self.relationship, EdgeRelationship::Contains)
    }

    /// File the edge was derived from, for data-flow edges
    pub fn origin_file(&self) -> Option<&str> {
        match &self.relationship {
            EdgeRelationship::DataFlow { file_path, .. } => Some(file_path),
            EdgeRelationship::Contains => None,
        }
    }
}

/// A column-to-column data-flow fact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnLineageEdge {
    /// `sourceTable.sourceColumn->targetTable.targetColumn`
    pub id: String,
    pub source_table_id: NodeId,
    pub source_column_name: String,
    pub target_table_id: NodeId,
    pub target_column_name: String,
    pub transformation_type: TransformationType,
    pub expression: Option<String>,
    pub file_path: String,
    pub line_number: usize,
}

impl ColumnLineageEdge {
    /// Build a column edge for one input of a transformation
    pub fn new(
        source_table_id: &NodeId,
        source_column: &str,
        target_table_id: &NodeId,
        transformation: &ColumnTransformation,
        file_path: &str,
    ) -> Self {
        let id = format!(
            "{}.{}->{}.{}",
            source_table_id,
            source_column.to_lowercase(),
            target_table_id,
            transformation.output_column.to_lowercase()
        );
        Self {
            id,
            source_table_id: source_table_id.clone(),
            source_column_name: source_column.to_string(),
            target_table_id: target_table_id.clone(),
            target_column_name: transformation.output_column.clone(),
            transformation_type: transformation.transformation_type,
            expression: transformation.expression.clone(),
            file_path: file_path.to_string(),
            line_number: transformation.line_number,
        }
    }

    /// Whether the source side is a `*` projection
    pub fn is_wildcard_source(&self) -> bool {
        self.source_column_name == "*"
    }
}
