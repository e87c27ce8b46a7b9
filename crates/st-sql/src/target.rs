//! Regex fallback for locating the relation a statement writes to

use crate::text::{strip_comments, IDENT_PATTERN};
use regex::Regex;
use std::sync::OnceLock;

static INSERT_TARGET_RE: OnceLock<Regex> = OnceLock::new();
static SELECT_RE: OnceLock<Regex> = OnceLock::new();
static FROM_RE: OnceLock<Regex> = OnceLock::new();
static INTO_TARGET_RE: OnceLock<Regex> = OnceLock::new();

/// Dotted name of one or more identifiers; `#temp` names allowed
fn qualified_name_pattern() -> String {
    format!(r"(#{{0,2}}(?:{IDENT_PATTERN})(?:\s*\.\s*(?:{IDENT_PATTERN}))*)")
}

fn insert_target_regex() -> &'static Regex {
    INSERT_TARGET_RE.get_or_init(|| {
        Regex::new(&format!(
            r"(?is)\b(?:INSERT\s+(?:OVERWRITE\s+)?(?:INTO\s+)?|MERGE\s+INTO\s+)(?:TABLE\s+)?{}",
            qualified_name_pattern()
        ))
        .expect("valid regex")
    })
}

fn select_regex() -> &'static Regex {
    SELECT_RE.get_or_init(|| Regex::new(r"(?i)\bSELECT\b").expect("valid regex"))
}

fn from_regex() -> &'static Regex {
    FROM_RE.get_or_init(|| Regex::new(r"(?i)\bFROM\b").expect("valid regex"))
}

fn into_target_regex() -> &'static Regex {
    INTO_TARGET_RE.get_or_init(|| {
        Regex::new(&format!(r"(?is)\bINTO\s+{}", qualified_name_pattern())).expect("valid regex")
    })
}

/// Target of `INSERT [OVERWRITE] INTO t` or `MERGE INTO t`
pub fn find_insert_target(sql: &str) -> Option<String> {
    let sql = strip_comments(sql);
    insert_target_regex()
        .captures(&sql)
        .and_then(|caps| caps.get(1))
        .map(|m| compact_name(m.as_str()))
}

/// Target of `SELECT ... INTO t FROM ...`
///
/// Only an `INTO` between `SELECT` and its `FROM` counts.
pub fn find_select_into_target(sql: &str) -> Option<String> {
    let sql = strip_comments(sql);
    for select in select_regex().find_iter(&sql) {
        let rest = &sql[select.end()..];
        let projection = match from_regex().find(rest) {
            Some(from) => &rest[..from.start()],
            None => rest,
        };
        if let Some(m) = into_target_regex()
            .captures(projection)
            .and_then(|caps| caps.get(1))
        {
            return Some(compact_name(m.as_str()));
        }
    }
    None
}

/// First write target found by either pattern, `INSERT`/`MERGE` first
///
/// ```
/// use st_sql::target::find_write_target;
/// assert_eq!(find_write_target("INSERT INTO mart.daily SELECT * FROM raw").as_deref(), Some("mart.daily"));
/// assert_eq!(find_write_target("SELECT a INTO #tmp FROM t").as_deref(), Some("#tmp"));
/// assert_eq!(find_write_target("SELECT a FROM t"), None);
/// ```
pub fn find_write_target(sql: &str) -> Option<String> {
    find_insert_target(sql).or_else(|| find_select_into_target(sql))
}

/// Drop whitespace around dots (`a . b` -> `a.b`)
fn compact_name(raw: &str) -> String {
    raw.split('.').map(str::trim).collect::<Vec<_>>().join(".")
}
