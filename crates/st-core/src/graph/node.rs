//! Graph node types

use crate::identifier::{normalize_identifier, QualifiedKey};
use crate::index::ForeignKeyRef;
use crate::newtype_string::define_identifier;
use serde::{Deserialize, Serialize};

define_identifier! {
    /// Stable node id: `<type>:<key>` for relations, `column:<tableKey>.<column>` for columns.
    pub struct NodeId;
    valid = |s| s.contains(':') && !s.ends_with(':');
}

impl NodeId {
    /// Id of a relation node (table, view, cte or external)
    pub fn relation(node_type: NodeType, key: &QualifiedKey) -> Self {
        Self(format!("{}:{}", node_type.prefix(), key))
    }

    /// Id of a CTE node. CTE names are query-scoped and never schema-qualified.
    pub fn cte(name: &str) -> Self {
        Self(format!("{}:{}", NodeType::Cte.prefix(), normalize_identifier(name)))
    }

    /// Id of a column node owned by the relation with `table_key`
    pub fn column(table_key: &QualifiedKey, column: &str) -> Self {
        Self(format!(
            "{}:{}.{}",
            NodeType::Column.prefix(),
            table_key,
            normalize_identifier(column)
        ))
    }

    /// The type prefix (`table`, `view`, ...)
    pub fn prefix(&self) -> &str {
        self.0.split_once(':').map_or("", |(prefix, _)| prefix)
    }

    /// Everything after the type prefix
    pub fn key_part(&self) -> &str {
        self.0.split_once(':').map_or(&self.0, |(_, key)| key)
    }
}

/// Kind of graph node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    /// Table defined in the workspace
    Table,
    /// View defined in the workspace
    View,
    /// Column of a table or view
    Column,
    /// Query-scoped common table expression
    Cte,
    /// Referenced relation with no definition in the workspace
    External,
}

impl NodeType {
    /// Relation-like node types, in lookup priority order
    pub const RELATIONS: [NodeType; 4] = [
        NodeType::Table,
        NodeType::View,
        NodeType::Cte,
        NodeType::External,
    ];

    /// Id prefix for this node type
    pub fn prefix(self) -> &'static str {
        match self {
            NodeType::Table => "table",
            NodeType::View => "view",
            NodeType::Column => "column",
            NodeType::Cte => "cte",
            NodeType::External => "external",
        }
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Structured information carried by column nodes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    /// Declared data type
    pub data_type: Option<String>,
    /// Whether NULL is allowed
    pub nullable: bool,
    /// Primary key membership
    pub primary_key: bool,
    /// Foreign key target
    pub foreign_key: Option<ForeignKeyRef>,
}

/// Typed per-kind node metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NodeMetadata {
    /// Table or view
    Relation {
        schema: Option<String>,
        qualified_name: String,
        column_count: usize,
    },
    /// Column of a table or view
    Column(ColumnInfo),
    /// CTE recovered from a query
    Cte { qualified_name: String },
    /// Undefined relation referenced by a statement
    External {
        schema: Option<String>,
        qualified_name: String,
    },
}

/// A node in the lineage graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique id
    pub id: NodeId,
    /// Node kind
    pub node_type: NodeType,
    /// Display name, original case
    pub name: String,
    /// Owning relation (column nodes only)
    pub parent_id: Option<NodeId>,
    /// Definition file
    pub file_path: Option<String>,
    /// Definition line
    pub line_number: Option<usize>,
    /// Kind-specific metadata
    pub metadata: NodeMetadata,
}

impl Node {
    /// Column info, for column nodes
    pub fn column_info(&self) -> Option<&ColumnInfo> {
        match &self.metadata {
            NodeMetadata::Column(info) => Some(info),
            _ => None,
        }
    }

    /// Full qualified display name for relation nodes, the plain name otherwise
    pub fn qualified_name(&self) -> &str {
        match &self.metadata {
            NodeMetadata::Relation { qualified_name, .. }
            | NodeMetadata::Cte { qualified_name }
            | NodeMetadata::External { qualified_name, .. } => qualified_name,
            NodeMetadata::Column(_) => &self.name,
        }
    }

    pub fn is_external(&self) -> bool {
        self.node_type == NodeType::External
    }

    pub fn is_column(&self) -> bool {
        self.node_type == NodeType::Column
    }
}
