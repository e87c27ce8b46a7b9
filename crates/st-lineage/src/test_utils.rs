//! Shared test utilities for st-lineage

use crate::builder::LineageBuilder;
use crate::source::InMemorySourceProvider;
use st_core::{
    ColumnDefinition, ColumnSource, ColumnTransformation, DefinitionType, LineageGraph,
    QueryAnalysis, ReferenceType, SchemaDefinition, StatementType, TableReference,
    TransformationType, WorkspaceIndex,
};

/// Table definition with nullable, untyped columns
pub fn table_def(name: &str, file: &str, columns: &[&str]) -> SchemaDefinition {
    SchemaDefinition {
        def_type: DefinitionType::Table,
        name: name.to_string(),
        schema: None,
        columns: columns.iter().map(|c| ColumnDefinition::new(c)).collect(),
        file_path: file.to_string(),
        line_number: 1,
        statement_index: None,
        sql: None,
    }
}

/// View definition created by statement `statement` of `file`
pub fn view_def(name: &str, file: &str, statement: usize) -> SchemaDefinition {
    SchemaDefinition {
        def_type: DefinitionType::View,
        statement_index: Some(statement),
        ..table_def(name, file, &[])
    }
}

/// Reference to `name` from statement `statement`
pub fn reference(name: &str, reference_type: ReferenceType, statement: usize) -> TableReference {
    TableReference {
        table_name: name.to_string(),
        schema: None,
        alias: None,
        reference_type,
        statement_index: Some(statement),
        columns: vec![],
        line_number: 1,
    }
}

/// Shorthand for a `select` reference
pub fn select_ref(name: &str, statement: usize) -> TableReference {
    reference(name, ReferenceType::Select, statement)
}

/// Shorthand for an `insert` reference
pub fn insert_ref(name: &str, statement: usize) -> TableReference {
    reference(name, ReferenceType::Insert, statement)
}

/// Column transformation reading `inputs` (`table.column` or `column`)
pub fn transform(output: &str, inputs: &[&str], ty: TransformationType) -> ColumnTransformation {
    ColumnTransformation {
        output_column: output.to_string(),
        input_columns: inputs
            .iter()
            .map(|input| match input.split_once('.') {
                Some((table, column)) => ColumnSource::qualified(table, column),
                None => ColumnSource::bare(input),
            })
            .collect(),
        transformation_type: ty,
        expression: None,
        line_number: 1,
    }
}

/// Structured query for statement `statement`
pub fn query(
    statement: usize,
    statement_type: StatementType,
    transformations: Vec<ColumnTransformation>,
) -> QueryAnalysis {
    QueryAnalysis {
        statement_index: Some(statement),
        statement_type,
        transformations,
        ..Default::default()
    }
}

/// Index where each `(source, target)` pair is one `INSERT ... SELECT`
/// statement in its own file, and every named table is defined.
///
/// `chain_index(&[("a", "b"), ("b", "c")])` models `a -> b -> c`.
pub fn chain_index(flows: &[(&str, &str)]) -> WorkspaceIndex {
    let mut index = WorkspaceIndex::new();
    let mut defined: Vec<&str> = Vec::new();
    for (source, target) in flows {
        for name in [source, target] {
            if !defined.contains(name) {
                defined.push(*name);
                index.add_definition(table_def(name, &format!("ddl/{}.sql", name), &["id"]));
            }
        }
    }
    for (source, target) in flows {
        let file = index.file_mut(&format!("etl/{}_to_{}.sql", source, target));
        file.references.push(select_ref(source, 0));
        file.references.push(insert_ref(target, 0));
    }
    index
}

/// Build without reading any source files
pub fn build_offline(index: &WorkspaceIndex) -> LineageGraph {
    LineageBuilder::new(InMemorySourceProvider::new())
        .with_rescan(false)
        .build(index)
}

/// Build with the given in-memory file contents
pub fn build_with_sources(index: &WorkspaceIndex, files: &[(&str, &str)]) -> LineageGraph {
    let provider = files
        .iter()
        .fold(InMemorySourceProvider::new(), |p, (path, text)| {
            p.with_file(*path, *text)
        });
    LineageBuilder::new(provider).build(index)
}
