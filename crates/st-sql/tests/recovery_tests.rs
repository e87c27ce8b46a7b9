//! Integration tests for structure recovery on realistic files

use st_sql::{find_write_target, MultiDialectParser, StructureChain};

// ── Multi-statement files ────────────────────────────────────────────────

const ETL_FILE: &str = r#"
-- nightly load
WITH recent AS (
    SELECT * FROM raw.orders WHERE created_at > now() - interval '1 day'
),
enriched AS (
    SELECT r.*, c.segment
    FROM recent r
    JOIN raw.customers c ON c.id = r.customer_id
)
INSERT INTO mart.daily_orders
SELECT * FROM enriched;

UPDATE mart.customer_stats
SET order_count = agg.cnt
FROM (
    SELECT customer_id, count(*) AS cnt
    FROM mart.daily_orders
    GROUP BY customer_id
) AS agg
WHERE mart.customer_stats.customer_id = agg.customer_id;
"#;

#[test]
fn test_etl_file_recovers_ctes_and_aliases() {
    let chain = StructureChain::default();
    let found = chain.extract_ctes_and_aliases(ETL_FILE);

    assert!(found.ctes.contains("recent"));
    assert!(found.ctes.contains("enriched"));
    assert!(found.aliases.contains("agg"));
    // real relations are never reported
    for real in ["raw.orders", "orders", "mart.daily_orders", "daily_orders"] {
        assert!(!found.names().contains(real), "{} reported", real);
    }
}

#[test]
fn test_restricted_dialect_list_still_recovers_ctes() {
    // whichever strategy answers first, both CTEs are found
    let parser = MultiDialectParser::from_names(["sqlite"]).unwrap();
    let chain = StructureChain::new(parser);
    let ctes = chain.extract_ctes(ETL_FILE);
    assert!(ctes.contains("recent"));
    assert!(ctes.contains("enriched"));
}

#[test]
fn test_write_target_of_first_statement() {
    assert_eq!(
        find_write_target(ETL_FILE).as_deref(),
        Some("mart.daily_orders")
    );
}
