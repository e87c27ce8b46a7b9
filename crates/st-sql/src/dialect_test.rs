use super::*;

#[test]
fn test_generic_parse() {
    let dialect = GenericDialect::new();
    let stmts = dialect.parse("SELECT * FROM users").unwrap();
    assert_eq!(stmts.len(), 1);
}

#[test]
fn test_every_named_dialect_parses_simple_select() {
    for name in [
        "generic",
        "postgres",
        "mysql",
        "mssql",
        "snowflake",
        "bigquery",
        "duckdb",
        "sqlite",
    ] {
        let dialect = dialect_by_name(name).unwrap();
        assert_eq!(dialect.name(), name);
        assert!(dialect.parse("SELECT a FROM t").is_ok(), "{} failed", name);
    }
}

#[test]
fn test_dialect_aliases() {
    assert_eq!(dialect_by_name("PostgreSQL").unwrap().name(), "postgres");
    assert_eq!(dialect_by_name("tsql").unwrap().name(), "mssql");
    assert_eq!(dialect_by_name(" ansi ").unwrap().name(), "generic");
}

#[test]
fn test_unknown_dialect() {
    assert!(matches!(
        dialect_by_name("oracle"),
        Err(SqlError::UnknownDialect(name)) if name == "oracle"
    ));
}

#[test]
fn test_parse_error_location() {
    let dialect = DuckDbDialect::new();
    let result = dialect.parse("SELECT a\nFROM t WHERE )");
    if let Err(SqlError::ParseError { line, message, .. }) = result {
        assert_eq!(line, 2, "message: {}", message);
    } else {
        panic!("expected a parse error");
    }
}

#[test]
fn test_parse_location_extraction() {
    assert_eq!(
        parse_location_from_error("Expected: something at Line: 5, Column: 10"),
        (5, 10)
    );
    assert_eq!(parse_location_from_error("Some error without location"), (0, 0));
}
