use super::*;
use crate::source::InMemorySourceProvider;
use crate::test_utils::*;
use st_core::{EdgeRelationship, ReferenceType, TransformationType};
use std::cell::Cell;
use std::io;
use std::rc::Rc;

struct CountingProvider {
    reads: Rc<Cell<usize>>,
    inner: InMemorySourceProvider,
}

impl SourceTextProvider for CountingProvider {
    fn read(&self, file_path: &str) -> io::Result<String> {
        self.reads.set(self.reads.get() + 1);
        self.inner.read(file_path)
    }
}

fn etl_index() -> WorkspaceIndex {
    let mut index = WorkspaceIndex::new();
    index.add_definition(table_def("orders", "ddl/orders.sql", &["id", "amount"]));
    index.add_definition(table_def("summary", "ddl/summary.sql", &["total"]));
    index
}

#[test]
fn test_definitions_and_columns() {
    let graph = build_offline(&etl_index());

    let orders = graph.node("table:orders").unwrap();
    assert_eq!(orders.node_type, NodeType::Table);
    assert_eq!(orders.file_path.as_deref(), Some("ddl/orders.sql"));

    let amount = graph.node("column:orders.amount").unwrap();
    assert_eq!(amount.parent_id.as_ref().unwrap(), "table:orders");
    let contains = graph.edge("table:orders->column:orders.amount").unwrap();
    assert_eq!(contains.relationship, EdgeRelationship::Contains);
    assert_eq!(graph.columns_of("table:orders").len(), 2);
}

#[test]
fn test_edges_scoped_to_statement() {
    let mut index = WorkspaceIndex::new();
    for name in ["a", "b", "c", "d"] {
        index.add_definition(table_def(name, "ddl.sql", &[]));
    }
    let file = index.file_mut("etl.sql");
    file.references.push(select_ref("a", 0));
    file.references.push(insert_ref("b", 0));
    file.references.push(select_ref("c", 1));
    file.references.push(insert_ref("d", 1));

    let graph = build_offline(&index);
    assert!(graph.edge("table:a->table:b").is_some());
    assert!(graph.edge("table:c->table:d").is_some());
    assert!(graph.edge("table:a->table:d").is_none());
    assert!(graph.edge("table:c->table:b").is_none());

    let edge = graph.edge("table:c->table:d").unwrap();
    assert_eq!(
        edge.relationship,
        EdgeRelationship::DataFlow {
            file_path: "etl.sql".to_string(),
            statement_index: 1
        }
    );
}

#[test]
fn test_missing_statement_index_defaults_to_zero() {
    let mut index = etl_index();
    let file = index.file_mut("etl.sql");
    let mut read = select_ref("orders", 0);
    read.statement_index = None;
    file.references.push(read);
    file.references.push(insert_ref("summary", 0));

    let graph = build_offline(&index);
    assert!(graph.edge("table:orders->table:summary").is_some());
}

#[test]
fn test_undefined_relation_becomes_external() {
    let mut index = etl_index();
    let file = index.file_mut("load.sql");
    file.references.push(select_ref("Staging.Raw_Orders", 0));
    file.references.push(insert_ref("orders", 0));

    let builder = LineageBuilder::new(InMemorySourceProvider::new()).with_rescan(false);
    let (graph, summary) = builder.build_with_summary(&index);

    let external = graph.node("external:staging.raw_orders").unwrap();
    assert!(external.is_external());
    assert_eq!(external.name, "Staging.Raw_Orders");
    assert!(graph
        .edge("external:staging.raw_orders->table:orders")
        .is_some());
    assert_eq!(summary.external_nodes, 1);
}

#[test]
fn test_bare_reference_resolves_to_unique_qualified_definition() {
    let mut index = WorkspaceIndex::new();
    let mut orders = table_def("orders", "ddl.sql", &[]);
    orders.schema = Some("sales".to_string());
    index.add_definition(orders);
    index.add_definition(table_def("summary", "ddl.sql", &[]));
    let file = index.file_mut("etl.sql");
    file.references.push(select_ref("orders", 0));
    file.references.push(insert_ref("summary", 0));

    let graph = build_offline(&index);
    assert!(graph.edge("table:sales.orders->table:summary").is_some());
    assert!(graph.node("external:orders").is_none());
}

#[test]
fn test_view_definition_is_output_of_its_statement() {
    let mut index = WorkspaceIndex::new();
    index.add_definition(table_def("base", "ddl.sql", &[]));
    index.add_definition(view_def("v_base", "views.sql", 0));
    index
        .file_mut("views.sql")
        .references
        .push(reference("base", ReferenceType::Join, 0));

    let graph = build_offline(&index);
    let edge = graph.edge("table:base->view:v_base").unwrap();
    assert_eq!(edge.edge_type, EdgeType::Join);
}

#[test]
fn test_plain_create_table_has_no_edges() {
    let mut index = WorkspaceIndex::new();
    let mut def = table_def("t", "ddl.sql", &[]);
    def.statement_index = Some(0);
    index.add_definition(def);

    let graph = build_offline(&index);
    assert_eq!(graph.stats().data_flow_edges, 0);
}

#[test]
fn test_cte_recovered_from_source_text() {
    let mut index = etl_index();
    let file = index.file_mut("etl.sql");
    file.references.push(select_ref("orders", 0));
    file.references.push(select_ref("recent", 0));
    file.references.push(insert_ref("summary", 0));

    let sql = "WITH recent AS (SELECT * FROM orders)\n\
               INSERT INTO summary SELECT * FROM recent";
    let provider = InMemorySourceProvider::new().with_file("etl.sql", sql);
    let (graph, summary) = LineageBuilder::new(provider).build_with_summary(&index);

    let cte = graph.node("cte:recent").unwrap();
    assert_eq!(cte.node_type, NodeType::Cte);
    assert!(graph.node("external:recent").is_none());
    assert!(graph.edge("table:orders->table:summary").is_some());
    assert!(graph.incoming_edges("cte:recent").is_empty());
    assert_eq!(summary.ctes_recovered, 1);
    assert_eq!(summary.suppressed_references, 1);
}

#[test]
fn test_subquery_alias_suppressed() {
    let mut index = etl_index();
    let file = index.file_mut("etl.sql");
    file.references.push(select_ref("orders", 0));
    file.references.push(reference("agg", ReferenceType::Subquery, 0));
    file.references.push(insert_ref("summary", 0));

    let sql = "INSERT INTO summary\n\
               SELECT agg.total FROM (\n  SELECT SUM(amount) AS total FROM orders\n) agg";
    let graph = build_with_sources(&index, &[("etl.sql", sql)]);

    assert!(graph.node("external:agg").is_none());
    assert!(graph.edge("table:orders->table:summary").is_some());
}

#[test]
fn test_alias_suppression_is_per_file() {
    let mut index = etl_index();
    index.add_definition(table_def("agg", "ddl/agg.sql", &[]));
    index.file_mut("aliases.sql");
    let other = index.file_mut("other.sql");
    other.references.push(select_ref("agg", 0));
    other.references.push(insert_ref("summary", 0));

    let sql = "SELECT agg.x FROM (SELECT 1 AS x) agg";
    let graph = build_with_sources(&index, &[("aliases.sql", sql), ("other.sql", "")]);
    assert!(graph.edge("table:agg->table:summary").is_some());
}

#[test]
fn test_structured_ctes_preferred_over_rescan() {
    let mut index = etl_index();
    let mut q = query(0, StatementType::Insert, vec![]);
    q.ctes = vec!["Staged".to_string()];
    let file = index.file_mut("etl.sql");
    file.queries = Some(vec![q]);
    file.references.push(select_ref("staged", 0));
    file.references.push(select_ref("orders", 0));
    file.references.push(insert_ref("summary", 0));

    // Unreadable source: the structured CTE list alone must be enough
    let builder = LineageBuilder::new(InMemorySourceProvider::new());
    let (graph, summary) = builder.build_with_summary(&index);

    assert_eq!(graph.node("cte:staged").unwrap().name, "Staged");
    assert!(graph.node("external:staged").is_none());
    assert!(graph.edge("table:orders->table:summary").is_some());
    // etl.sql and both ddl files
    assert_eq!(summary.unreadable_files, 3);
}

#[test]
fn test_each_file_read_once() {
    let mut index = etl_index();
    let file = index.file_mut("etl.sql");
    file.references.push(select_ref("orders", 0));
    file.references.push(insert_ref("summary", 0));

    let reads = Rc::new(Cell::new(0));
    let provider = CountingProvider {
        reads: Rc::clone(&reads),
        inner: InMemorySourceProvider::new().with_file("etl.sql", "WITH x AS (SELECT 1) SELECT * FROM x"),
    };
    let builder = LineageBuilder::new(provider);
    let (_, summary) = builder.build_with_summary(&index);

    // etl.sql plus the two ddl files, which have no source text
    assert_eq!(reads.get(), 3);
    assert_eq!(summary.files_scanned, 1);
    assert_eq!(summary.unreadable_files, 2);
}

#[test]
fn test_rescan_disabled_reads_nothing() {
    let reads = Rc::new(Cell::new(0));
    let provider = CountingProvider {
        reads: Rc::clone(&reads),
        inner: InMemorySourceProvider::new(),
    };
    let builder = LineageBuilder::new(provider).with_rescan(false);
    builder.build(&etl_index());
    assert_eq!(reads.get(), 0);
}

#[test]
fn test_custom_structure_chain() {
    use st_sql::structure::{RegexCteStrategy, StructureStrategy};

    let mut index = etl_index();
    let file = index.file_mut("etl.sql");
    for name in ["orders", "recent", "agg"] {
        file.references.push(select_ref(name, 0));
    }
    file.references.push(insert_ref("summary", 0));

    let sql = "WITH recent AS (SELECT * FROM orders)\n\
               INSERT INTO summary SELECT agg.n FROM (SELECT COUNT(*) AS n FROM recent) agg";
    let ctes: Vec<Box<dyn StructureStrategy>> = vec![Box::new(RegexCteStrategy)];
    let chain = StructureChain::with_strategies(ctes, Vec::new());
    let builder = LineageBuilder::new(InMemorySourceProvider::new().with_file("etl.sql", sql))
        .with_structure_chain(chain);
    let (graph, summary) = builder.build_with_summary(&index);

    // no alias strategies: the derived table is left as an undefined relation
    assert!(graph.node("cte:recent").is_some());
    assert!(graph.node("external:agg").is_some());
    assert_eq!(summary.suppressed_references, 1);
}

#[test]
fn test_orphan_columns_skipped() {
    let mut index = WorkspaceIndex::new();
    index.add_definition(table_def("  ", "bad.sql", &["a", "b"]));

    let builder = LineageBuilder::new(InMemorySourceProvider::new()).with_rescan(false);
    let (graph, summary) = builder.build_with_summary(&index);
    assert_eq!(graph.node_count(), 0);
    assert_eq!(summary.orphan_columns, 2);
}

// ── Column edges ────────────────────────────────────────────────────────

#[test]
fn test_column_edge_into_dml_target() {
    let mut index = etl_index();
    let file = index.file_mut("etl.sql");
    let mut orders = select_ref("orders", 0);
    orders.alias = Some("o".to_string());
    file.references.push(orders);
    file.references.push(insert_ref("summary", 0));
    file.queries = Some(vec![query(
        0,
        StatementType::Insert,
        vec![transform("total", &["o.amount"], TransformationType::Aggregate)],
    )]);

    let (graph, summary) = LineageBuilder::new(InMemorySourceProvider::new())
        .with_rescan(false)
        .build_with_summary(&index);

    let edge = &graph.column_edges()[0];
    assert_eq!(edge.id, "table:orders.amount->table:summary.total");
    assert_eq!(edge.transformation_type, TransformationType::Aggregate);
    assert_eq!(edge.file_path, "etl.sql");
    assert_eq!(summary.column_edges, 1);
}

#[test]
fn test_column_edge_into_created_view() {
    let mut index = WorkspaceIndex::new();
    index.add_definition(table_def("base", "ddl.sql", &["id"]));
    index.add_definition(view_def("v_base", "views.sql", 0));
    let file = index.file_mut("views.sql");
    file.references.push(select_ref("base", 0));
    file.queries = Some(vec![query(
        0,
        StatementType::CreateView,
        vec![transform("id", &["id"], TransformationType::Direct)],
    )]);

    let graph = build_offline(&index);
    assert_eq!(graph.column_edges().len(), 1);
    assert_eq!(graph.column_edges()[0].target_table_id, "view:v_base");
    assert_eq!(graph.column_edges()[0].source_table_id, "table:base");
}

#[test]
fn test_literal_output_has_no_column_edge() {
    let mut index = etl_index();
    let file = index.file_mut("etl.sql");
    file.references.push(select_ref("orders", 0));
    file.references.push(insert_ref("summary", 0));
    file.queries = Some(vec![query(
        0,
        StatementType::Insert,
        vec![transform("total", &[], TransformationType::Expression)],
    )]);

    assert!(build_offline(&index).column_edges().is_empty());
}

#[test]
fn test_column_target_from_select_into_text() {
    let mut index = etl_index();
    index.add_definition(table_def("archive", "ddl/archive.sql", &["amount"]));
    let file = index.file_mut("archive.sql");
    file.references.push(select_ref("orders", 0));
    let mut q = query(
        0,
        StatementType::Select,
        vec![transform("amount", &["orders.amount"], TransformationType::Direct)],
    );
    q.sql = Some("SELECT amount INTO archive FROM orders".to_string());
    file.queries = Some(vec![q]);

    let graph = build_offline(&index);
    assert_eq!(graph.column_edges().len(), 1);
    assert_eq!(graph.column_edges()[0].target_table_id, "table:archive");
}

#[test]
fn test_unindexed_queries_share_statement_zero() {
    let mut index = etl_index();
    let file = index.file_mut("etl.sql");
    let mut read = select_ref("orders", 0);
    read.statement_index = None;
    let mut write = insert_ref("summary", 0);
    write.statement_index = None;
    file.references = vec![read, write];

    let mut setup = query(0, StatementType::Insert, vec![]);
    setup.statement_index = None;
    let mut load = query(
        0,
        StatementType::Insert,
        vec![transform("total", &["amount"], TransformationType::Aggregate)],
    );
    load.statement_index = None;
    file.queries = Some(vec![setup, load]);

    let graph = build_offline(&index);
    assert_eq!(graph.column_edges().len(), 1);
    let edge = &graph.column_edges()[0];
    assert_eq!(edge.source_table_id, "table:orders");
    assert_eq!(edge.target_table_id, "table:summary");
}

#[test]
fn test_column_edges_skipped_without_target() {
    let mut index = etl_index();
    let file = index.file_mut("adhoc.sql");
    file.references.push(select_ref("orders", 0));
    file.queries = Some(vec![query(
        0,
        StatementType::Select,
        vec![transform("amount", &["amount"], TransformationType::Direct)],
    )]);

    assert!(build_offline(&index).column_edges().is_empty());
}

// ── Configuration ───────────────────────────────────────────────────────

#[test]
fn test_from_config_rejects_unknown_dialect() {
    let mut config = LineageConfig::default();
    config.builder.dialects = vec!["postgres".to_string(), "cobol".to_string()];
    let result = LineageBuilder::from_config(&config, InMemorySourceProvider::new());
    assert!(matches!(result, Err(crate::LineageError::Sql(_))));
}

#[test]
fn test_from_config_respects_rescan_flag() {
    let mut config = LineageConfig::default();
    config.builder.rescan_sources = false;
    let reads = Rc::new(Cell::new(0));
    let provider = CountingProvider {
        reads: Rc::clone(&reads),
        inner: InMemorySourceProvider::new(),
    };
    let builder = LineageBuilder::from_config(&config, provider).unwrap();
    builder.build(&etl_index());
    assert_eq!(reads.get(), 0);
}

#[test]
fn test_rebuild_is_identical() {
    let index = chain_index(&[("a", "b"), ("b", "c")]);
    let first = build_offline(&index);
    let second = build_offline(&index);

    let ids = |g: &LineageGraph| g.nodes().map(|n| n.id.to_string()).collect::<Vec<_>>();
    assert_eq!(ids(&first), ids(&second));
    assert_eq!(first.edges(), second.edges());
    assert_eq!(first.stats(), second.stats());
}
