//! Identifier normalization for relation names.
//!
//! Every component that matches relations by name goes through this module:
//! the builder when it creates node ids, the column tracker when it compares
//! table ids, and the impact analyzer when it resolves user input. Matching
//! is case-insensitive; display keeps the original case.

use crate::newtype_string::define_identifier;
use serde::{Deserialize, Serialize};

define_identifier! {
    /// Canonical lowercase key for a relation: `schema.name` or `name`.
    pub struct QualifiedKey;
    valid = |s| !s.is_empty() && !s.chars().any(char::is_uppercase);
}

impl QualifiedKey {
    /// The relation part of the key, without any schema prefix.
    pub fn bare_name(&self) -> &str {
        bare_part(&self.0)
    }

    /// The schema part of the key, if any.
    pub fn schema(&self) -> Option<&str> {
        self.0.rfind('.').map(|pos| &self.0[..pos])
    }
}

/// A parsed relation name with an optional schema, in original case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QualifiedName {
    /// Schema (may itself be dotted, e.g. `warehouse.raw`)
    pub schema: Option<String>,
    /// Relation name
    pub name: String,
}

impl QualifiedName {
    /// Parse a bare or dotted name. The last part is the relation name.
    ///
    /// ```
    /// use st_core::identifier::QualifiedName;
    /// let q = QualifiedName::parse("\"Sales\".Orders");
    /// assert_eq!(q.schema.as_deref(), Some("Sales"));
    /// assert_eq!(q.name, "Orders");
    /// ```
    pub fn parse(raw: &str) -> Self {
        let parts = split_parts(raw.trim());
        match parts.split_last() {
            Some((name, [])) => Self {
                schema: None,
                name: name.clone(),
            },
            Some((name, schema)) => Self {
                schema: Some(schema.join(".")),
                name: name.clone(),
            },
            None => Self {
                schema: None,
                name: String::new(),
            },
        }
    }

    /// Build from a name and an explicit schema. An explicit schema wins
    /// over any schema embedded in `name`.
    pub fn with_schema(name: &str, schema: Option<&str>) -> Self {
        let mut parsed = Self::parse(name);
        if let Some(schema) = schema.map(str::trim).filter(|s| !s.is_empty()) {
            let schema_parts = split_parts(schema);
            parsed.schema = Some(schema_parts.join("."));
        }
        parsed
    }

    /// Canonical matching key. Returns `None` when the name is empty.
    pub fn key(&self) -> Option<QualifiedKey> {
        if self.name.is_empty() {
            return None;
        }
        QualifiedKey::try_new(self.display_name().to_lowercase())
    }

    /// Original-case `schema.name` form.
    pub fn display_name(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", schema, self.name),
            None => self.name.clone(),
        }
    }
}

/// Canonical key for a name plus optional schema.
///
/// ```
/// use st_core::identifier::qualified_key;
/// let key = qualified_key("Orders", Some("Sales")).unwrap();
/// assert_eq!(key.as_str(), "sales.orders");
/// assert_eq!(qualified_key("[dbo].[Users]", None).unwrap().as_str(), "dbo.users");
/// ```
pub fn qualified_key(name: &str, schema: Option<&str>) -> Option<QualifiedKey> {
    QualifiedName::with_schema(name, schema).key()
}

/// Human-readable name for a relation, original case preserved.
pub fn display_name(name: &str, schema: Option<&str>) -> String {
    QualifiedName::with_schema(name, schema).display_name()
}

/// Normalize a single identifier (column name, alias, CTE name).
///
/// Strips quoting and lowercases; dots are kept as-is.
pub fn normalize_identifier(ident: &str) -> String {
    unquote(ident.trim()).to_lowercase()
}

/// Last dotted component of a key or name (`a.b.c` -> `c`).
pub fn bare_part(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

fn split_parts(raw: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut closing: Option<char> = None;

    for ch in raw.chars() {
        match closing {
            Some(close) if ch == close => closing = None,
            Some(_) => current.push(ch),
            None => match ch {
                '"' => closing = Some('"'),
                '`' => closing = Some('`'),
                '[' => closing = Some(']'),
                '.' => parts.push(std::mem::take(&mut current)),
                c if c.is_whitespace() => {}
                c => current.push(c),
            },
        }
    }
    parts.push(current);
    parts.retain(|p| !p.is_empty());
    parts
}

fn unquote(ident: &str) -> &str {
    let quoted = |open: char, close: char| {
        ident.len() >= 2 && ident.starts_with(open) && ident.ends_with(close)
    };
    if quoted('"', '"') || quoted('`', '`') || quoted('[', ']') {
        &ident[1..ident.len() - 1]
    } else {
        ident
    }
}

#[cfg(test)]
#[path = "identifier_test.rs"]
mod tests;
