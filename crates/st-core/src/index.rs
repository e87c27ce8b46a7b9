//! Workspace index types consumed by the lineage builder.
//!
//! These mirror what the SQL extractor produces per file: relation
//! definitions with their columns, table references bucketed by statement,
//! and optionally structured query data (CTE names and column-level
//! transformations). The extractor itself lives outside this workspace;
//! hosts typically hand the index over as JSON.

use crate::error::{CoreError, CoreResult};
use crate::identifier::{qualified_key, QualifiedKey};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// Kind of relation a definition creates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefinitionType {
    /// CREATE TABLE (with or without AS SELECT)
    Table,
    /// CREATE VIEW
    View,
}

/// Foreign key target declared on a column
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForeignKeyRef {
    /// Referenced relation (may be schema-qualified)
    pub referenced_table: String,
    /// Referenced column
    pub referenced_column: String,
}

/// Column declared in a definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    /// Column name
    pub name: String,
    /// Declared data type
    #[serde(default)]
    pub data_type: Option<String>,
    /// Whether the column accepts NULL
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    /// Whether the column is (part of) the primary key
    #[serde(default)]
    pub primary_key: bool,
    /// Foreign key target, if declared
    #[serde(default)]
    pub foreign_key: Option<ForeignKeyRef>,
}

fn default_nullable() -> bool {
    true
}

impl ColumnDefinition {
    /// Create a nullable column with no type information
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            data_type: None,
            nullable: true,
            primary_key: false,
            foreign_key: None,
        }
    }
}

/// A table or view definition found in the workspace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDefinition {
    /// Table or view
    #[serde(rename = "type")]
    pub def_type: DefinitionType,
    /// Relation name as written
    pub name: String,
    /// Schema, if written
    #[serde(default)]
    pub schema: Option<String>,
    /// Declared or inferred columns
    #[serde(default)]
    pub columns: Vec<ColumnDefinition>,
    /// File containing the definition
    pub file_path: String,
    /// 1-based line of the definition
    #[serde(default)]
    pub line_number: usize,
    /// Statement index within the file, if known
    #[serde(default)]
    pub statement_index: Option<usize>,
    /// Full definition SQL, if captured
    #[serde(default)]
    pub sql: Option<String>,
}

impl SchemaDefinition {
    /// Canonical key of the defined relation
    pub fn key(&self) -> Option<QualifiedKey> {
        qualified_key(&self.name, self.schema.as_deref())
    }
}

/// How a statement touches a referenced relation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceType {
    /// FROM clause read
    Select,
    /// JOIN read
    Join,
    /// Read inside a subquery
    Subquery,
    /// INSERT target
    Insert,
    /// UPDATE target
    Update,
    /// DELETE target
    Delete,
    /// Relation created by the statement
    Create,
    /// DROP / ALTER / TRUNCATE and anything else
    Other,
}

impl ReferenceType {
    /// Relation is read by the statement
    pub fn is_input(self) -> bool {
        matches!(
            self,
            ReferenceType::Select | ReferenceType::Join | ReferenceType::Subquery
        )
    }

    /// Relation is written by the statement
    pub fn is_output(self) -> bool {
        matches!(
            self,
            ReferenceType::Insert | ReferenceType::Update | ReferenceType::Delete
        )
    }
}

/// A relation referenced by a statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableReference {
    /// Relation name as written (may include a schema prefix)
    pub table_name: String,
    /// Schema, if extracted separately
    #[serde(default)]
    pub schema: Option<String>,
    /// Alias the statement binds the relation to
    #[serde(default)]
    pub alias: Option<String>,
    /// Access kind
    pub reference_type: ReferenceType,
    /// Statement index within the file, if known
    #[serde(default)]
    pub statement_index: Option<usize>,
    /// Columns referenced through this relation
    #[serde(default)]
    pub columns: Vec<String>,
    /// 1-based line of the reference
    #[serde(default)]
    pub line_number: usize,
}

impl TableReference {
    /// Canonical key of the referenced relation
    pub fn key(&self) -> Option<QualifiedKey> {
        qualified_key(&self.table_name, self.schema.as_deref())
    }
}

/// Top-level statement kind of a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementType {
    /// Plain SELECT
    #[default]
    Select,
    /// INSERT ... SELECT
    Insert,
    /// UPDATE
    Update,
    /// DELETE
    Delete,
    /// MERGE
    Merge,
    /// CREATE VIEW
    CreateView,
    /// CREATE TABLE (AS SELECT)
    CreateTable,
    /// Anything else
    Other,
}

impl StatementType {
    /// Statement writes into an existing relation
    pub fn is_dml(self) -> bool {
        matches!(
            self,
            StatementType::Insert
                | StatementType::Update
                | StatementType::Delete
                | StatementType::Merge
        )
    }

    /// Statement creates a relation
    pub fn is_create(self) -> bool {
        matches!(self, StatementType::CreateView | StatementType::CreateTable)
    }
}

/// Kind of column-level transformation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformationType {
    /// Pass-through
    Direct,
    /// Pass-through under a different name
    Rename,
    /// Aggregate function
    Aggregate,
    /// Computed expression
    Expression,
    /// CASE expression
    Case,
    /// CAST
    Cast,
    /// COALESCE / IFNULL
    Coalesce,
    /// Join key
    Join,
    /// Filter predicate
    Filter,
    /// Unrecognized
    #[default]
    Unknown,
}

impl std::fmt::Display for TransformationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TransformationType::Direct => "direct",
            TransformationType::Rename => "rename",
            TransformationType::Aggregate => "aggregate",
            TransformationType::Expression => "expression",
            TransformationType::Case => "case",
            TransformationType::Cast => "cast",
            TransformationType::Coalesce => "coalesce",
            TransformationType::Join => "join",
            TransformationType::Filter => "filter",
            TransformationType::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// A source column feeding a transformation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnSource {
    /// Table name or alias qualifying the column, if written
    #[serde(default)]
    pub table: Option<String>,
    /// Column name
    pub column: String,
}

impl ColumnSource {
    /// Column qualified by a table name or alias
    pub fn qualified(table: &str, column: &str) -> Self {
        Self {
            table: Some(table.to_string()),
            column: column.to_string(),
        }
    }

    /// Unqualified column
    pub fn bare(column: &str) -> Self {
        Self {
            table: None,
            column: column.to_string(),
        }
    }
}

/// One output column of a query and the columns it is computed from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnTransformation {
    /// Output column name
    pub output_column: String,
    /// Contributing input columns; empty for literals
    #[serde(default)]
    pub input_columns: Vec<ColumnSource>,
    /// Kind of transformation
    #[serde(default)]
    pub transformation_type: TransformationType,
    /// Expression text
    #[serde(default)]
    pub expression: Option<String>,
    /// 1-based line of the expression
    #[serde(default)]
    pub line_number: usize,
}

/// Structured data about one statement
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryAnalysis {
    /// Statement index within the file, if known
    #[serde(default)]
    pub statement_index: Option<usize>,
    /// Statement kind
    #[serde(default)]
    pub statement_type: StatementType,
    /// Names of CTEs declared by the statement, in declaration order
    #[serde(default)]
    pub ctes: Vec<String>,
    /// Column-level transformations
    #[serde(default)]
    pub transformations: Vec<ColumnTransformation>,
    /// Statement text
    #[serde(default)]
    pub sql: Option<String>,
    /// 1-based line where the statement starts
    #[serde(default)]
    pub line_number: usize,
}

/// Extraction results for one file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileAnalysis {
    /// Referenced relations
    #[serde(default)]
    pub references: Vec<TableReference>,
    /// Relations defined in the file
    #[serde(default)]
    pub definitions: Vec<SchemaDefinition>,
    /// Structured per-statement data; `None` when the extractor produced none
    #[serde(default)]
    pub queries: Option<Vec<QueryAnalysis>>,
}

impl FileAnalysis {
    /// Whether structured query data is available
    pub fn has_query_data(&self) -> bool {
        self.queries.as_ref().is_some_and(|q| !q.is_empty())
    }

    /// Structured queries, empty when absent
    pub fn queries(&self) -> &[QueryAnalysis] {
        self.queries.as_deref().unwrap_or(&[])
    }
}

/// Everything the extractor knows about a workspace snapshot
///
/// Maps are ordered so that graph construction is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceIndex {
    /// Qualified name -> definitions with that name
    #[serde(default)]
    pub definitions: BTreeMap<String, Vec<SchemaDefinition>>,
    /// File path -> extraction results
    #[serde(default)]
    pub files: BTreeMap<String, FileAnalysis>,
}

impl WorkspaceIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an index from JSON
    pub fn from_json(json: &str) -> CoreResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load an index from a JSON file
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::IndexNotFound {
                path: path.display().to_string(),
            });
        }
        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_json(&content)
    }

    /// Register a definition under its display name and in its file entry
    pub fn add_definition(&mut self, definition: SchemaDefinition) {
        let display = crate::identifier::display_name(&definition.name, definition.schema.as_deref());
        self.files
            .entry(definition.file_path.clone())
            .or_default()
            .definitions
            .push(definition.clone());
        self.definitions.entry(display).or_default().push(definition);
    }

    /// Mutable access to a file entry, created on demand
    pub fn file_mut(&mut self, path: &str) -> &mut FileAnalysis {
        self.files.entry(path.to_string()).or_default()
    }

    /// All definitions, across both maps, without duplicates
    ///
    /// Definitions listed in `definitions` come first, then any that only
    /// appear in a file entry. Two definitions are the same when they share
    /// kind, key, file and line.
    pub fn all_definitions(&self) -> Vec<&SchemaDefinition> {
        let mut seen = HashSet::new();
        self.definitions
            .values()
            .flatten()
            .chain(self.files.values().flat_map(|a| a.definitions.iter()))
            .filter(|def| {
                seen.insert((
                    def.def_type,
                    def.key(),
                    def.file_path.as_str(),
                    def.line_number,
                ))
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "index_test.rs"]
mod tests;
