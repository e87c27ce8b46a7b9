use super::*;

fn set(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|s| s.to_string()).collect()
}

struct Fixed(&'static str, Option<&'static [&'static str]>);

impl StructureStrategy for Fixed {
    fn name(&self) -> &'static str {
        self.0
    }

    fn extract(&self, _sql: &str) -> Option<BTreeSet<String>> {
        self.1.map(set)
    }
}

// ── CTEs ─────────────────────────────────────────────────────────────────

#[test]
fn test_ast_ctes() {
    let chain = StructureChain::default();
    let sql = "WITH a AS (SELECT 1), B AS (SELECT * FROM a) SELECT * FROM b";
    assert_eq!(chain.extract_ctes(sql), set(&["a", "b"]));
}

#[test]
fn test_nested_cte_inside_derived_table() {
    let chain = StructureChain::default();
    let sql = "SELECT * FROM (WITH inner_cte AS (SELECT 1 AS x) SELECT x FROM inner_cte) sub";
    let found = chain.extract_ctes_and_aliases(sql);
    assert_eq!(found.ctes, set(&["inner_cte"]));
    assert!(found.aliases.contains("sub"));
    assert!(found.names().contains("inner_cte"));
}

#[test]
fn test_regex_fallback_when_unparseable() {
    let chain = StructureChain::default();
    let sql = "WITH RECURSIVE tree AS (SELECT id FROM nodes),\n  leaf AS (SELECT id FROM tree)\nSELECT id FROM leaf WHERE ((";
    assert_eq!(chain.extract_ctes(sql), set(&["leaf", "tree"]));
}

#[test]
fn test_regex_column_list_and_quoting() {
    let found = RegexCteStrategy
        .extract("WITH totals (id, amount) AS (SELECT 1, 2), \"Order Stats\" AS MATERIALIZED (SELECT 3) SELECT 1")
        .unwrap();
    assert_eq!(found, set(&["order stats", "totals"]));
}

#[test]
fn test_regex_nested_parens_in_body() {
    let sql = "WITH a AS (SELECT COALESCE(x, (1 + 2)) FROM t), b AS (SELECT 1) SELECT 1";
    assert_eq!(RegexCteStrategy.extract(sql).unwrap(), set(&["a", "b"]));
}

#[test]
fn test_regex_ignores_table_hints() {
    let found = RegexCteStrategy
        .extract("SELECT * FROM orders WITH (NOLOCK)")
        .unwrap();
    assert!(found.is_empty());
}

#[test]
fn test_commented_out_cte_is_ignored() {
    let chain = StructureChain::default();
    let sql = "-- WITH fake AS (SELECT 1)\n/* WITH other AS (SELECT 2) */\nSELECT 1";
    assert!(chain.extract_ctes(sql).is_empty());
}

// ── Aliases ──────────────────────────────────────────────────────────────

#[test]
fn test_ast_derived_alias() {
    let chain = StructureChain::default();
    let sql = "SELECT s.id FROM (SELECT id FROM src) AS S JOIN other o ON o.id = s.id";
    assert_eq!(chain.extract_aliases(sql), set(&["s"]));
}

#[test]
fn test_scan_update_from_subquery() {
    let sql = "UPDATE t SET x = s.x FROM (\n  SELECT id,\n    (SELECT max(v) FROM w) AS mv\n  FROM src\n) AS s\nWHERE t.id = s.id";
    let found = DerivedTableScanStrategy.extract(sql).unwrap();
    assert!(found.contains("s"));
}

#[test]
fn test_scan_skips_keywords_after_paren() {
    let sql = "SELECT * FROM a WHERE id IN (SELECT id FROM b) AND x = 1 UNION (SELECT * FROM c) ORDER BY 1";
    assert!(DerivedTableScanStrategy.extract(sql).unwrap().is_empty());
}

#[test]
fn test_scan_alias_without_as() {
    let sql = "SELECT * FROM (SELECT 1 AS x) derived";
    assert_eq!(DerivedTableScanStrategy.extract(sql).unwrap(), set(&["derived"]));
}

// ── Chain ordering ───────────────────────────────────────────────────────

#[test]
fn test_strategy_order() {
    assert_eq!(
        StructureChain::default().strategy_names(),
        vec!["ast-cte", "regex-cte", "ast-alias", "paren-scan"]
    );
}

#[test]
fn test_first_non_empty_cte_strategy_wins() {
    let chain = StructureChain::with_strategies(
        vec![
            Box::new(Fixed("none", None)),
            Box::new(Fixed("empty", Some(&[]))),
            Box::new(Fixed("hit", Some(&["x"]))),
            Box::new(Fixed("later", Some(&["y"]))),
        ],
        Vec::new(),
    );
    assert_eq!(chain.extract_ctes("SELECT 1"), set(&["x"]));
}

#[test]
fn test_alias_strategies_are_unioned() {
    let chain = StructureChain::with_strategies(
        Vec::new(),
        vec![
            Box::new(Fixed("a", Some(&["p"]))),
            Box::new(Fixed("b", None)),
            Box::new(Fixed("c", Some(&["q", "p"]))),
        ],
    );
    let found = chain.extract_ctes_and_aliases("SELECT 1");
    assert!(found.ctes.is_empty());
    assert_eq!(found.aliases, set(&["p", "q"]));
    assert!(!found.is_empty());
}
