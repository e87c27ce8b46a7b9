//! st-core - Core library for sqltrace
//!
//! This crate provides identifier normalization, the workspace index types
//! produced by the SQL extractor, the lineage graph model with its traversal
//! primitives, configuration parsing, and impact severity levels.

pub mod config;
pub mod error;
pub mod graph;
pub mod identifier;
pub mod index;
mod newtype_string;
pub mod severity;

pub use config::{BuilderConfig, ImpactConfig, LineageConfig, TraversalConfig};
pub use error::{CoreError, CoreResult};
pub use graph::{
    relation_id_matches, ColumnInfo, ColumnLineageEdge, ColumnLineageResult, ColumnLineageRow,
    Edge, EdgeRelationship, EdgeType, FlowResult, GraphDraft, GraphStats, LineageGraph,
    LineagePath, Node, NodeId, NodeMetadata, NodeType, TraversalOptions,
};
pub use identifier::{display_name, normalize_identifier, qualified_key, QualifiedKey, QualifiedName};
pub use index::{
    ColumnDefinition, ColumnSource, ColumnTransformation, DefinitionType, FileAnalysis,
    ForeignKeyRef, QueryAnalysis, ReferenceType, SchemaDefinition, StatementType, TableReference,
    TransformationType, WorkspaceIndex,
};
pub use severity::{Severity, SeverityThresholds};
