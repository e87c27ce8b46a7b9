//! Lineage graph construction from a workspace index.
//!
//! A build runs six passes over the index:
//!
//! 1. one node per table/view definition
//! 2. CTE nodes, from structured query data or, failing that, a re-scan of
//!    the file text
//! 3. a per-file exclusion set of CTE names and subquery aliases
//! 4. column nodes with structural `contains` edges from their owner
//! 5. data-flow edges between the inputs and outputs of each statement
//! 6. column-to-column edges from query transformations
//!
//! Edges are only created between references of the *same* statement, so
//! two unrelated queries in one file are never linked. Nothing in a build
//! fails: unreadable files are skipped and unresolvable names are dropped.

use crate::error::LineageResult;
use crate::source::SourceTextProvider;
use serde::Serialize;
use st_core::identifier::{bare_part, normalize_identifier, qualified_key};
use st_core::{
    ColumnInfo, ColumnLineageEdge, DefinitionType, Edge, EdgeType, FileAnalysis, GraphDraft,
    LineageConfig, LineageGraph, Node, NodeId, NodeMetadata, NodeType, QualifiedKey,
    QualifiedName, QueryAnalysis, SchemaDefinition, StatementType, TableReference,
    WorkspaceIndex,
};
use st_sql::{find_write_target, MultiDialectParser, StructureChain};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Counters describing one build
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BuildSummary {
    /// Files whose text was read for re-scanning
    pub files_scanned: usize,
    /// Files that could not be read
    pub unreadable_files: usize,
    /// CTE nodes created
    pub ctes_recovered: usize,
    /// References dropped because they name a CTE or subquery alias
    pub suppressed_references: usize,
    /// Columns skipped because their owner could not be resolved
    pub orphan_columns: usize,
    /// External nodes created for undefined relations
    pub external_nodes: usize,
    /// Table-level data-flow edges
    pub data_flow_edges: usize,
    /// Column-to-column edges
    pub column_edges: usize,
}

/// Builds [`LineageGraph`]s from [`WorkspaceIndex`] snapshots
pub struct LineageBuilder {
    provider: Box<dyn SourceTextProvider>,
    structure: StructureChain,
    rescan_sources: bool,
}

impl LineageBuilder {
    /// Builder with the default dialect list and re-scanning enabled
    pub fn new(provider: impl SourceTextProvider + 'static) -> Self {
        Self {
            provider: Box::new(provider),
            structure: StructureChain::default(),
            rescan_sources: true,
        }
    }

    /// Builder configured from `builder.*` settings.
    ///
    /// Fails if a configured dialect name is unknown.
    pub fn from_config(
        config: &LineageConfig,
        provider: impl SourceTextProvider + 'static,
    ) -> LineageResult<Self> {
        let parser = MultiDialectParser::from_names(&config.builder.dialects)?;
        Ok(Self {
            provider: Box::new(provider),
            structure: StructureChain::new(parser),
            rescan_sources: config.builder.rescan_sources,
        })
    }

    /// Enable or disable reading source files
    pub fn with_rescan(mut self, rescan_sources: bool) -> Self {
        self.rescan_sources = rescan_sources;
        self
    }

    /// Replace the CTE/alias recovery chain
    pub fn with_structure_chain(mut self, structure: StructureChain) -> Self {
        self.structure = structure;
        self
    }

    /// Build a graph
    pub fn build(&self, index: &WorkspaceIndex) -> LineageGraph {
        self.build_with_summary(index).0
    }

    /// Build a graph and report what the build did
    pub fn build_with_summary(&self, index: &WorkspaceIndex) -> (LineageGraph, BuildSummary) {
        let mut ctx = BuildContext::new(self, index);
        ctx.add_definition_nodes();
        ctx.recover_structure();
        ctx.add_column_nodes();
        ctx.add_data_flow_edges();
        ctx.add_column_edges();

        let mut summary = ctx.summary;
        summary.data_flow_edges = ctx.draft.edge_count() - ctx.structural_edges;
        summary.column_edges = ctx.column_edge_count;
        log::info!(
            "Built lineage graph: {} nodes, {} edges, {} column edges ({} files scanned, {} unreadable)",
            ctx.draft.node_count(),
            ctx.draft.edge_count(),
            summary.column_edges,
            summary.files_scanned,
            summary.unreadable_files
        );
        (ctx.draft.freeze(), summary)
    }
}

/// Mutable state for one build
struct BuildContext<'a> {
    builder: &'a LineageBuilder,
    index: &'a WorkspaceIndex,
    definitions: Vec<&'a SchemaDefinition>,
    draft: GraphDraft,
    summary: BuildSummary,
    structural_edges: usize,
    column_edge_count: usize,

    /// File text, read at most once per build (`None` = unreadable)
    sources: HashMap<String, Option<String>>,
    /// Relation key -> first definition node with that key
    by_key: HashMap<QualifiedKey, NodeId>,
    /// Bare relation name -> definition nodes with that name
    by_bare: HashMap<String, Vec<NodeId>>,
    /// File -> CTE names and subquery aliases declared in it
    exclusions: HashMap<String, HashSet<String>>,
}

impl<'a> BuildContext<'a> {
    fn new(builder: &'a LineageBuilder, index: &'a WorkspaceIndex) -> Self {
        Self {
            builder,
            index,
            definitions: index.all_definitions(),
            draft: GraphDraft::new(),
            summary: BuildSummary::default(),
            structural_edges: 0,
            column_edge_count: 0,
            sources: HashMap::new(),
            by_key: HashMap::new(),
            by_bare: HashMap::new(),
            exclusions: HashMap::new(),
        }
    }

    // ── Step 1: definitions ─────────────────────────────────────────────

    fn add_definition_nodes(&mut self) {
        let definitions = self.definitions.clone();
        for def in definitions {
            let Some(key) = def.key() else {
                log::debug!("Skipping definition with empty name in {}", def.file_path);
                continue;
            };
            let node_type = definition_node_type(def.def_type);
            let id = NodeId::relation(node_type, &key);
            let parsed = QualifiedName::with_schema(&def.name, def.schema.as_deref());
            let node = Node {
                id: id.clone(),
                node_type,
                name: parsed.display_name(),
                parent_id: None,
                file_path: Some(def.file_path.clone()),
                line_number: Some(def.line_number),
                metadata: NodeMetadata::Relation {
                    schema: parsed.schema.clone(),
                    qualified_name: parsed.display_name(),
                    column_count: def.columns.len(),
                },
            };
            if !self.draft.add_node(node) {
                continue;
            }
            let bare = self.by_bare.entry(key.bare_name().to_string()).or_default();
            if !bare.contains(&id) {
                bare.push(id.clone());
            }
            self.by_key.entry(key).or_insert(id);
        }
    }

    // ── Steps 2-3: CTE recovery and alias suppression ───────────────────

    fn recover_structure(&mut self) {
        let index = self.index;
        for (path, analysis) in &index.files {
            if analysis.has_query_data() {
                for query in analysis.queries() {
                    for cte in &query.ctes {
                        self.add_cte(path, cte, Some(query.line_number));
                    }
                }
            }

            if !self.builder.rescan_sources {
                continue;
            }
            let Some(text) = self.source_text(path) else {
                continue;
            };
            if analysis.has_query_data() {
                let aliases = self.builder.structure.extract_aliases(&text);
                self.exclusions.entry(path.clone()).or_default().extend(aliases);
            } else {
                let recovered = self.builder.structure.extract_ctes_and_aliases(&text);
                for cte in &recovered.ctes {
                    self.add_cte(path, cte, None);
                }
                self.exclusions
                    .entry(path.clone())
                    .or_default()
                    .extend(recovered.aliases);
            }
        }
    }

    fn add_cte(&mut self, path: &str, name: &str, line_number: Option<usize>) {
        let normalized = normalize_identifier(name);
        if normalized.is_empty() {
            return;
        }
        let node = Node {
            id: NodeId::cte(&normalized),
            node_type: NodeType::Cte,
            name: name.trim().to_string(),
            parent_id: None,
            file_path: Some(path.to_string()),
            line_number,
            metadata: NodeMetadata::Cte {
                qualified_name: normalized.clone(),
            },
        };
        if self.draft.add_node(node) {
            self.summary.ctes_recovered += 1;
        }
        self.exclusions
            .entry(path.to_string())
            .or_default()
            .insert(normalized);
    }

    fn source_text(&mut self, path: &str) -> Option<String> {
        if let Some(cached) = self.sources.get(path) {
            return cached.clone();
        }
        let text = match self.builder.provider.read(path) {
            Ok(text) => {
                self.summary.files_scanned += 1;
                Some(text)
            }
            Err(e) => {
                log::debug!("Skipping re-scan of unreadable file {}: {}", path, e);
                self.summary.unreadable_files += 1;
                None
            }
        };
        self.sources.insert(path.to_string(), text.clone());
        text
    }

    // ── Step 4: columns ─────────────────────────────────────────────────

    fn add_column_nodes(&mut self) {
        let definitions = self.definitions.clone();
        for def in definitions {
            if def.columns.is_empty() {
                continue;
            }
            let owner = def
                .key()
                .map(|key| (NodeId::relation(definition_node_type(def.def_type), &key), key))
                .filter(|(id, _)| self.draft.contains_node(id));
            let Some((owner_id, owner_key)) = owner else {
                log::warn!(
                    "Skipping {} column(s) of '{}' in {}: owning relation not in graph",
                    def.columns.len(),
                    def.name,
                    def.file_path
                );
                self.summary.orphan_columns += def.columns.len();
                continue;
            };

            for column in &def.columns {
                if column.name.trim().is_empty() {
                    continue;
                }
                let id = NodeId::column(&owner_key, &column.name);
                let node = Node {
                    id: id.clone(),
                    node_type: NodeType::Column,
                    name: column.name.clone(),
                    parent_id: Some(owner_id.clone()),
                    file_path: Some(def.file_path.clone()),
                    line_number: Some(def.line_number),
                    metadata: NodeMetadata::Column(ColumnInfo {
                        data_type: column.data_type.clone(),
                        nullable: column.nullable,
                        primary_key: column.primary_key,
                        foreign_key: column.foreign_key.clone(),
                    }),
                };
                self.draft.add_node(node);
                if self.draft.add_edge(Edge::contains(&owner_id, &id)) {
                    self.structural_edges += 1;
                }
            }
        }
    }

    // ── Step 5: statement data flow ─────────────────────────────────────

    fn add_data_flow_edges(&mut self) {
        let index = self.index;
        for (path, analysis) in &index.files {
            let file_definitions = self.file_definitions(path);
            for (statement, references) in statements_of(analysis) {
                let mut inputs: Vec<(NodeId, EdgeType)> = Vec::new();
                let mut outputs: Vec<NodeId> = Vec::new();

                for reference in references {
                    let is_input = reference.reference_type.is_input();
                    if !is_input && !reference.reference_type.is_output() {
                        continue;
                    }
                    let Some(key) = reference.key() else {
                        continue;
                    };
                    if self.is_excluded(path, &key) {
                        self.summary.suppressed_references += 1;
                        continue;
                    }
                    let id = self.resolve_or_external(&key, reference);
                    if is_input {
                        let edge_type = EdgeType::for_reference(reference.reference_type);
                        if !inputs.iter().any(|(existing, _)| existing == &id) {
                            inputs.push((id, edge_type));
                        }
                    } else if !outputs.contains(&id) {
                        outputs.push(id);
                    }
                }

                if inputs.is_empty() {
                    continue;
                }
                for def in &file_definitions {
                    if def.statement_index.unwrap_or(0) != statement {
                        continue;
                    }
                    if let Some(id) = definition_node_id(def) {
                        if !outputs.contains(&id) {
                            outputs.push(id);
                        }
                    }
                }

                for (source, edge_type) in &inputs {
                    for target in &outputs {
                        if source == target {
                            continue;
                        }
                        self.draft
                            .add_edge(Edge::data_flow(source, target, *edge_type, path, statement));
                    }
                }
            }
        }
    }

    fn is_excluded(&self, path: &str, key: &QualifiedKey) -> bool {
        // CTEs and aliases are never schema-qualified
        key.schema().is_none()
            && self
                .exclusions
                .get(path)
                .is_some_and(|names| names.contains(key.as_str()))
    }

    fn file_definitions(&self, path: &str) -> Vec<&'a SchemaDefinition> {
        self.definitions
            .iter()
            .copied()
            .filter(|def| def.file_path == path)
            .collect()
    }

    /// Definition node for a key: exact key, then a unique bare-name match
    /// for unqualified keys, then the bare key for qualified ones.
    fn resolve_defined(&self, key: &QualifiedKey) -> Option<NodeId> {
        if let Some(id) = self.by_key.get(key) {
            return Some(id.clone());
        }
        if key.schema().is_none() {
            match self.by_bare.get(key.as_str()) {
                Some(ids) if ids.len() == 1 => Some(ids[0].clone()),
                _ => None,
            }
        } else {
            self.by_key.get(key.bare_name()).cloned()
        }
    }

    fn resolve_or_external(&mut self, key: &QualifiedKey, reference: &TableReference) -> NodeId {
        if let Some(id) = self.resolve_defined(key) {
            return id;
        }
        let id = NodeId::relation(NodeType::External, key);
        let parsed = QualifiedName::with_schema(&reference.table_name, reference.schema.as_deref());
        let node = Node {
            id: id.clone(),
            node_type: NodeType::External,
            name: parsed.display_name(),
            parent_id: None,
            file_path: None,
            line_number: None,
            metadata: NodeMetadata::External {
                schema: parsed.schema.clone(),
                qualified_name: parsed.display_name(),
            },
        };
        if self.draft.add_node(node) {
            self.summary.external_nodes += 1;
        }
        id
    }

    // ── Step 6: column edges ────────────────────────────────────────────

    fn add_column_edges(&mut self) {
        let index = self.index;
        for (path, analysis) in &index.files {
            let statements = statements_of(analysis);
            for query in analysis.queries() {
                if query.transformations.is_empty() {
                    continue;
                }
                // same default as the reference grouping in step 5
                let statement = query.statement_index.unwrap_or(0);
                let references = statements.get(&statement).map(Vec::as_slice).unwrap_or(&[]);

                let Some(target) = self.resolve_target(path, query, statement, references) else {
                    log::debug!(
                        "No target relation for statement {} in {}; skipping column lineage",
                        statement,
                        path
                    );
                    continue;
                };
                let scope = SourceScope::new(query, references);

                for transformation in &query.transformations {
                    for input in &transformation.input_columns {
                        let Some(source) = self.resolve_column_source(&scope, input.table.as_deref())
                        else {
                            continue;
                        };
                        let edge = ColumnLineageEdge::new(
                            &source,
                            &input.column,
                            &target,
                            transformation,
                            path,
                        );
                        if self.draft.add_column_edge(edge) {
                            self.column_edge_count += 1;
                        }
                    }
                }
            }
        }
    }

    /// Relation a query's output columns land in
    fn resolve_target(
        &self,
        path: &str,
        query: &QueryAnalysis,
        statement: usize,
        references: &[&TableReference],
    ) -> Option<NodeId> {
        if query.statement_type.is_dml() {
            let explicit = references
                .iter()
                .filter(|r| r.reference_type.is_output())
                .filter_map(|r| r.key())
                .find_map(|key| self.existing_relation(&key));
            if explicit.is_some() {
                return explicit;
            }
        }

        if query.statement_type.is_create() {
            let wanted = match query.statement_type {
                StatementType::CreateView => DefinitionType::View,
                _ => DefinitionType::Table,
            };
            let file_definitions = self.file_definitions(path);
            let definition = file_definitions
                .iter()
                .find(|d| d.def_type == wanted && d.statement_index == Some(statement))
                .or_else(|| file_definitions.iter().find(|d| d.def_type == wanted));
            if let Some(id) = definition.and_then(|d| definition_node_id(d)) {
                return Some(id);
            }
        }

        if let Some(first) = query.ctes.first() {
            let id = NodeId::cte(first);
            if self.draft.contains_node(&id) {
                return Some(id);
            }
        }

        let target = find_write_target(query.sql.as_deref()?)?;
        let key = qualified_key(&target, None)?;
        self.existing_relation(&key)
    }

    fn resolve_column_source(&self, scope: &SourceScope, qualifier: Option<&str>) -> Option<NodeId> {
        let Some(qualifier) = qualifier else {
            // Unqualified columns belong to the statement's only input, if unique
            return match scope.inputs.as_slice() {
                [only] => self.existing_relation(only),
                _ => None,
            };
        };

        let normalized = normalize_identifier(qualifier);
        if scope.ctes.contains(&normalized) {
            let id = NodeId::cte(&normalized);
            if self.draft.contains_node(&id) {
                return Some(id);
            }
        }
        if let Some(key) = scope.aliases.get(&normalized) {
            if let Some(id) = self.existing_relation(key) {
                return Some(id);
            }
        }
        self.resolve_relation_name(qualifier)
    }

    /// Existing node for a key: a definition, or a CTE/external node
    fn existing_relation(&self, key: &QualifiedKey) -> Option<NodeId> {
        if let Some(id) = self.resolve_defined(key) {
            return Some(id);
        }
        NodeType::RELATIONS
            .iter()
            .map(|t| NodeId::relation(*t, key))
            .find(|id| self.draft.contains_node(id))
    }

    /// Resolve a written relation name by prefixed id, then, for unqualified
    /// names, by the single node whose bare name matches
    fn resolve_relation_name(&self, name: &str) -> Option<NodeId> {
        let key = qualified_key(name, None)?;
        if let Some(id) = self.existing_relation(&key) {
            return Some(id);
        }
        if key.schema().is_some() {
            return None;
        }
        let bare = key.bare_name();
        let mut matches = self
            .draft
            .nodes()
            .filter(|n| n.node_type != NodeType::Column)
            .filter(|n| bare_part(n.id.key_part()) == bare);
        match (matches.next(), matches.next()) {
            (Some(only), None) => Some(only.id.clone()),
            _ => None,
        }
    }
}

/// Names visible to the column references of one query
struct SourceScope {
    /// Normalized CTE names declared by the query
    ctes: HashSet<String>,
    /// Normalized alias or name -> relation key
    aliases: HashMap<String, QualifiedKey>,
    /// Keys of the statement's input relations
    inputs: Vec<QualifiedKey>,
}

impl SourceScope {
    fn new(query: &QueryAnalysis, references: &[&TableReference]) -> Self {
        let mut aliases = HashMap::new();
        let mut inputs = Vec::new();
        for reference in references {
            let Some(key) = reference.key() else {
                continue;
            };
            if let Some(alias) = reference.alias.as_deref() {
                aliases.insert(normalize_identifier(alias), key.clone());
            }
            if reference.reference_type.is_input() && !inputs.contains(&key) {
                inputs.push(key);
            }
        }
        Self {
            ctes: query.ctes.iter().map(|c| normalize_identifier(c)).collect(),
            aliases,
            inputs,
        }
    }
}

/// A file's references grouped by statement; unknown indexes count as 0
fn statements_of(analysis: &FileAnalysis) -> BTreeMap<usize, Vec<&TableReference>> {
    let mut statements: BTreeMap<usize, Vec<&TableReference>> = BTreeMap::new();
    for reference in &analysis.references {
        statements
            .entry(reference.statement_index.unwrap_or(0))
            .or_default()
            .push(reference);
    }
    statements
}

fn definition_node_type(def_type: DefinitionType) -> NodeType {
    match def_type {
        DefinitionType::Table => NodeType::Table,
        DefinitionType::View => NodeType::View,
    }
}

fn definition_node_id(def: &SchemaDefinition) -> Option<NodeId> {
    def.key()
        .map(|key| NodeId::relation(definition_node_type(def.def_type), &key))
}

#[cfg(test)]
#[path = "builder_test.rs"]
mod tests;
