//! Best-effort recovery of query-scoped names from raw SQL.
//!
//! CTE names and subquery aliases look like relation references to the
//! extractor but are not tables. Each recovery technique is a
//! [`StructureStrategy`]; [`StructureChain`] runs them in a fixed order:
//!
//! - CTEs: AST parse across the configured dialects, then the
//!   `WITH [RECURSIVE] name AS (` regex when parsing fails or finds nothing.
//! - Aliases: AST derived-table aliases unioned with a balanced-parenthesis
//!   scan for `(SELECT ...) [AS] alias`, which survives SQL no dialect parses.
//!
//! All names are returned normalized (unquoted, lowercase).

use crate::parser::MultiDialectParser;
use crate::text::{find_matching_paren, strip_comments, IDENT_PATTERN};
use regex::Regex;
use sqlparser::ast::{Query, Statement, TableFactor, Visit, Visitor};
use st_core::identifier::normalize_identifier;
use std::collections::BTreeSet;
use std::ops::ControlFlow;
use std::sync::{Arc, OnceLock};

/// One technique for recovering names from SQL text
pub trait StructureStrategy: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Recovered names, or `None` when the technique could not be applied
    /// (for example, no dialect parsed the text).
    fn extract(&self, sql: &str) -> Option<BTreeSet<String>>;
}

// ── AST strategies ───────────────────────────────────────────────────────

#[derive(Default)]
struct CteCollector {
    names: BTreeSet<String>,
}

impl Visitor for CteCollector {
    type Break = ();

    fn pre_visit_query(&mut self, query: &Query) -> ControlFlow<Self::Break> {
        if let Some(with) = &query.with {
            for cte in &with.cte_tables {
                self.names.insert(normalize_identifier(&cte.alias.name.value));
            }
        }
        ControlFlow::Continue(())
    }
}

#[derive(Default)]
struct DerivedAliasCollector {
    names: BTreeSet<String>,
}

impl Visitor for DerivedAliasCollector {
    type Break = ();

    fn pre_visit_table_factor(&mut self, factor: &TableFactor) -> ControlFlow<Self::Break> {
        if let TableFactor::Derived {
            alias: Some(alias), ..
        } = factor
        {
            self.names.insert(normalize_identifier(&alias.name.value));
        }
        ControlFlow::Continue(())
    }
}

fn parse_statements(parser: &MultiDialectParser, sql: &str) -> Option<Vec<Statement>> {
    match parser.parse(sql) {
        Ok((_, statements)) => Some(statements),
        Err(e) => {
            log::debug!("Structure recovery falling back to text scan: {}", e);
            None
        }
    }
}

/// CTE names from `WITH` clauses of a parsed AST, at any nesting level
pub struct AstCteStrategy {
    parser: Arc<MultiDialectParser>,
}

impl AstCteStrategy {
    pub fn new(parser: Arc<MultiDialectParser>) -> Self {
        Self { parser }
    }
}

impl StructureStrategy for AstCteStrategy {
    fn name(&self) -> &'static str {
        "ast-cte"
    }

    fn extract(&self, sql: &str) -> Option<BTreeSet<String>> {
        let statements = parse_statements(&self.parser, sql)?;
        let mut collector = CteCollector::default();
        for statement in &statements {
            let _ = statement.visit(&mut collector);
        }
        Some(collector.names)
    }
}

/// Aliases bound to derived tables (`FROM (SELECT ...) AS alias`)
pub struct AstAliasStrategy {
    parser: Arc<MultiDialectParser>,
}

impl AstAliasStrategy {
    pub fn new(parser: Arc<MultiDialectParser>) -> Self {
        Self { parser }
    }
}

impl StructureStrategy for AstAliasStrategy {
    fn name(&self) -> &'static str {
        "ast-alias"
    }

    fn extract(&self, sql: &str) -> Option<BTreeSet<String>> {
        let statements = parse_statements(&self.parser, sql)?;
        let mut collector = DerivedAliasCollector::default();
        for statement in &statements {
            let _ = statement.visit(&mut collector);
        }
        Some(collector.names)
    }
}

// ── Text strategies ──────────────────────────────────────────────────────

static WITH_RE: OnceLock<Regex> = OnceLock::new();
static CTE_HEAD_RE: OnceLock<Regex> = OnceLock::new();
static SUBQUERY_OPEN_RE: OnceLock<Regex> = OnceLock::new();
static ALIAS_AFTER_RE: OnceLock<Regex> = OnceLock::new();

fn with_regex() -> &'static Regex {
    WITH_RE.get_or_init(|| Regex::new(r"(?i)\bWITH\s+(?:RECURSIVE\s+)?").expect("valid regex"))
}

/// `name [(cols)] AS [[NOT] MATERIALIZED] (` anchored at the start
fn cte_head_regex() -> &'static Regex {
    CTE_HEAD_RE.get_or_init(|| {
        Regex::new(&format!(
            r"(?i)^\s*({IDENT_PATTERN})\s*(?:\([^()]*\)\s*)?AS\s*(?:(?:NOT\s+)?MATERIALIZED\s*)?(\()"
        ))
        .expect("valid regex")
    })
}

fn subquery_open_regex() -> &'static Regex {
    SUBQUERY_OPEN_RE.get_or_init(|| Regex::new(r"(?i)\(\s*(?:SELECT|WITH)\b").expect("valid regex"))
}

fn alias_after_regex() -> &'static Regex {
    ALIAS_AFTER_RE.get_or_init(|| {
        Regex::new(&format!(r"(?i)^\s*(?:AS\s+)?({IDENT_PATTERN})")).expect("valid regex")
    })
}

/// Words that can follow a closing parenthesis without being an alias
const NON_ALIAS_KEYWORDS: &[&str] = &[
    "alter", "and", "as", "between", "create", "cross", "delete", "drop", "else", "end", "except",
    "exists", "fetch", "for", "from", "full", "group", "having", "in", "inner", "insert",
    "intersect", "into", "is", "join", "lateral", "left", "like", "limit", "merge", "minus",
    "natural", "not", "offset", "on", "or", "order", "outer", "over", "pivot", "qualify",
    "returning", "right", "select", "set", "then", "truncate", "union", "unpivot", "update",
    "using", "values", "when", "where", "window", "with",
];

/// `WITH [RECURSIVE] name AS (`, following comma-continued CTEs
pub struct RegexCteStrategy;

impl StructureStrategy for RegexCteStrategy {
    fn name(&self) -> &'static str {
        "regex-cte"
    }

    fn extract(&self, sql: &str) -> Option<BTreeSet<String>> {
        let mut names = BTreeSet::new();
        for with in with_regex().find_iter(sql) {
            let mut pos = with.end();
            loop {
                let Some(caps) = cte_head_regex().captures(&sql[pos..]) else {
                    break;
                };
                let (Some(name), Some(paren)) = (caps.get(1), caps.get(2)) else {
                    break;
                };
                names.insert(normalize_identifier(name.as_str()));

                let Some(close) = find_matching_paren(sql, pos + paren.start()) else {
                    break;
                };
                let after = &sql[close + 1..];
                let trimmed = after.trim_start();
                if !trimmed.starts_with(',') {
                    break;
                }
                pos = close + 1 + (after.len() - trimmed.len()) + 1;
            }
        }
        Some(names)
    }
}

/// Balanced-parenthesis scan for `(SELECT ...) [AS] alias`.
///
/// Handles nested subqueries spanning many lines and statements such as
/// `UPDATE ... FROM (...) AS alias` that some dialects reject.
pub struct DerivedTableScanStrategy;

impl StructureStrategy for DerivedTableScanStrategy {
    fn name(&self) -> &'static str {
        "paren-scan"
    }

    fn extract(&self, sql: &str) -> Option<BTreeSet<String>> {
        let mut names = BTreeSet::new();
        for open in subquery_open_regex().find_iter(sql) {
            let Some(close) = find_matching_paren(sql, open.start()) else {
                continue;
            };
            let Some(alias) = alias_after_regex()
                .captures(&sql[close + 1..])
                .and_then(|caps| caps.get(1))
            else {
                continue;
            };
            let alias = normalize_identifier(alias.as_str());
            if !NON_ALIAS_KEYWORDS.contains(&alias.as_str()) {
                names.insert(alias);
            }
        }
        Some(names)
    }
}

// ── Chain ────────────────────────────────────────────────────────────────

/// Names recovered from one file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveredStructure {
    /// CTE names
    pub ctes: BTreeSet<String>,
    /// Subquery / derived-table aliases
    pub aliases: BTreeSet<String>,
}

impl RecoveredStructure {
    /// Every recovered name; none of them is a real relation
    pub fn names(&self) -> BTreeSet<String> {
        self.ctes.union(&self.aliases).cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.ctes.is_empty() && self.aliases.is_empty()
    }
}

/// Ordered strategy cascade for CTE and alias recovery
pub struct StructureChain {
    cte_strategies: Vec<Box<dyn StructureStrategy>>,
    alias_strategies: Vec<Box<dyn StructureStrategy>>,
}

impl StructureChain {
    /// Standard cascade using `parser` for the AST attempts
    pub fn new(parser: MultiDialectParser) -> Self {
        let parser = Arc::new(parser);
        Self {
            cte_strategies: vec![
                Box::new(AstCteStrategy::new(Arc::clone(&parser))),
                Box::new(RegexCteStrategy),
            ],
            alias_strategies: vec![
                Box::new(AstAliasStrategy::new(parser)),
                Box::new(DerivedTableScanStrategy),
            ],
        }
    }

    /// Chain with explicit strategy lists
    pub fn with_strategies(
        cte_strategies: Vec<Box<dyn StructureStrategy>>,
        alias_strategies: Vec<Box<dyn StructureStrategy>>,
    ) -> Self {
        Self {
            cte_strategies,
            alias_strategies,
        }
    }

    /// Names of the CTE strategies followed by the alias strategies
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.cte_strategies
            .iter()
            .chain(&self.alias_strategies)
            .map(|s| s.name())
            .collect()
    }

    /// CTE names from the first strategy that finds any
    pub fn extract_ctes(&self, sql: &str) -> BTreeSet<String> {
        let sql = strip_comments(sql);
        self.first_non_empty(&sql)
    }

    /// Union of the aliases every alias strategy finds
    pub fn extract_aliases(&self, sql: &str) -> BTreeSet<String> {
        let sql = strip_comments(sql);
        self.union_of_aliases(&sql)
    }

    /// Run both cascades over one text
    pub fn extract_ctes_and_aliases(&self, sql: &str) -> RecoveredStructure {
        let sql = strip_comments(sql);
        RecoveredStructure {
            ctes: self.first_non_empty(&sql),
            aliases: self.union_of_aliases(&sql),
        }
    }

    fn first_non_empty(&self, sql: &str) -> BTreeSet<String> {
        for strategy in &self.cte_strategies {
            match strategy.extract(sql) {
                Some(names) if !names.is_empty() => {
                    log::debug!("{} recovered {} CTE name(s)", strategy.name(), names.len());
                    return names;
                }
                _ => {}
            }
        }
        BTreeSet::new()
    }

    fn union_of_aliases(&self, sql: &str) -> BTreeSet<String> {
        self.alias_strategies
            .iter()
            .filter_map(|s| s.extract(sql))
            .flatten()
            .collect()
    }
}

impl Default for StructureChain {
    fn default() -> Self {
        Self::new(MultiDialectParser::default())
    }
}

#[cfg(test)]
#[path = "structure_test.rs"]
mod tests;
