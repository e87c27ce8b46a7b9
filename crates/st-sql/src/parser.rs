//! SQL parser wrappers

use crate::dialect::{dialect_by_name, GenericDialect, SqlDialect};
use crate::error::{SqlError, SqlResult};
use sqlparser::ast::Statement;

/// SQL parser that wraps sqlparser-rs with dialect support
pub struct SqlParser {
    dialect: Box<dyn SqlDialect>,
}

impl SqlParser {
    /// Create a parser for a dialect
    pub fn new(dialect: Box<dyn SqlDialect>) -> Self {
        Self { dialect }
    }

    /// Create a new parser with the generic dialect
    pub fn generic() -> Self {
        Self::new(Box::new(GenericDialect::new()))
    }

    /// Create a parser from dialect name
    pub fn from_dialect_name(name: &str) -> SqlResult<Self> {
        Ok(Self::new(dialect_by_name(name)?))
    }

    /// Parse SQL into AST statements
    pub fn parse(&self, sql: &str) -> SqlResult<Vec<Statement>> {
        let sql = sql.trim();
        if sql.is_empty() {
            return Err(SqlError::EmptySql);
        }

        self.dialect.parse(sql)
    }

    /// Get the dialect name
    pub fn dialect_name(&self) -> &'static str {
        self.dialect.name()
    }
}

impl Default for SqlParser {
    fn default() -> Self {
        Self::generic()
    }
}

/// Tries several dialects in order and keeps the first successful parse.
///
/// Workspace files rarely declare their dialect, so a best-effort parse walks
/// the configured list until one of them accepts the text.
pub struct MultiDialectParser {
    parsers: Vec<SqlParser>,
}

impl MultiDialectParser {
    pub fn new(parsers: Vec<SqlParser>) -> Self {
        Self { parsers }
    }

    /// Build from dialect names; any unknown name is an error
    pub fn from_names<I, S>(names: I) -> SqlResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let parsers = names
            .into_iter()
            .map(|name| SqlParser::from_dialect_name(name.as_ref()))
            .collect::<SqlResult<Vec<_>>>()?;
        Ok(Self::new(parsers))
    }

    /// Names of the dialects tried, in order
    pub fn dialect_names(&self) -> Vec<&'static str> {
        self.parsers.iter().map(SqlParser::dialect_name).collect()
    }

    /// Parse with the first dialect that accepts the SQL.
    ///
    /// Returns the accepting dialect's name with the statements.
    pub fn parse(&self, sql: &str) -> SqlResult<(&'static str, Vec<Statement>)> {
        if sql.trim().is_empty() {
            return Err(SqlError::EmptySql);
        }
        for parser in &self.parsers {
            match parser.parse(sql) {
                Ok(statements) => return Ok((parser.dialect_name(), statements)),
                Err(e) => log::debug!("{} dialect rejected SQL: {}", parser.dialect_name(), e),
            }
        }
        Err(SqlError::NoDialectMatched {
            tried: self.dialect_names().join(", "),
        })
    }
}

impl Default for MultiDialectParser {
    fn default() -> Self {
        Self::from_names([
            "generic",
            "postgres",
            "mysql",
            "mssql",
            "snowflake",
            "bigquery",
            "duckdb",
            "sqlite",
        ])
        .unwrap_or_else(|_| Self::new(vec![SqlParser::generic()]))
    }
}

#[cfg(test)]
#[path = "parser_test.rs"]
mod tests;
