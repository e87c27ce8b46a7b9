use super::*;

#[test]
fn test_parse_bare_name() {
    let q = QualifiedName::parse("orders");
    assert_eq!(q.schema, None);
    assert_eq!(q.name, "orders");
    assert_eq!(q.display_name(), "orders");
}

#[test]
fn test_parse_schema_qualified() {
    let q = QualifiedName::parse("Sales.Orders");
    assert_eq!(q.schema.as_deref(), Some("Sales"));
    assert_eq!(q.name, "Orders");
    assert_eq!(q.key().unwrap(), "sales.orders");
    assert_eq!(q.display_name(), "Sales.Orders");
}

#[test]
fn test_parse_three_part_name_keeps_dotted_schema() {
    let q = QualifiedName::parse("warehouse.raw.events");
    assert_eq!(q.schema.as_deref(), Some("warehouse.raw"));
    assert_eq!(q.name, "events");
}

#[test]
fn test_parse_strips_quotes() {
    assert_eq!(
        qualified_key("\"Analytics\".\"Daily Revenue\"", None).unwrap(),
        "analytics.daily revenue"
    );
    assert_eq!(qualified_key("`db`.`t`", None).unwrap(), "db.t");
    assert_eq!(qualified_key("[dbo].[Users]", None).unwrap(), "dbo.users");
}

#[test]
fn test_quoted_part_may_contain_dot() {
    let q = QualifiedName::parse("\"my.schema\".orders");
    assert_eq!(q.schema.as_deref(), Some("my.schema"));
    assert_eq!(q.name, "orders");
}

#[test]
fn test_explicit_schema_overrides_embedded() {
    let q = QualifiedName::with_schema("staging.orders", Some("Prod"));
    assert_eq!(q.schema.as_deref(), Some("Prod"));
    assert_eq!(q.key().unwrap(), "prod.orders");
}

#[test]
fn test_blank_schema_is_ignored() {
    assert_eq!(qualified_key("orders", Some("  ")).unwrap(), "orders");
}

#[test]
fn test_key_is_case_insensitive() {
    assert_eq!(
        qualified_key("ORDERS", Some("PUBLIC")),
        qualified_key("orders", Some("public"))
    );
}

#[test]
fn test_empty_name_has_no_key() {
    assert!(qualified_key("", None).is_none());
    assert!(qualified_key("\"\"", None).is_none());
}

#[test]
fn test_display_name_preserves_case() {
    assert_eq!(display_name("Orders", Some("Sales")), "Sales.Orders");
}

#[test]
fn test_key_parts() {
    let key = qualified_key("orders", Some("sales")).unwrap();
    assert_eq!(key.bare_name(), "orders");
    assert_eq!(key.schema(), Some("sales"));

    let bare = qualified_key("orders", None).unwrap();
    assert_eq!(bare.schema(), None);
}

#[test]
fn test_qualified_key_rejects_uppercase() {
    assert!(QualifiedKey::try_new("Orders").is_none());
    assert!(QualifiedKey::try_new("").is_none());
    assert!(QualifiedKey::try_new("orders").is_some());
}

#[test]
fn test_qualified_key_deserialize_validates() {
    let ok: QualifiedKey = serde_json::from_str(r#""public.orders""#).unwrap();
    assert_eq!(ok, "public.orders");
    assert!(serde_json::from_str::<QualifiedKey>(r#""Public.Orders""#).is_err());
}

#[test]
fn test_normalize_identifier() {
    assert_eq!(normalize_identifier(" \"Amount\" "), "amount");
    assert_eq!(normalize_identifier("[Total]"), "total");
    assert_eq!(normalize_identifier("cte_Base"), "cte_base");
}

#[test]
fn test_bare_part() {
    assert_eq!(bare_part("a.b.c"), "c");
    assert_eq!(bare_part("c"), "c");
}
