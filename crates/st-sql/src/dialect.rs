//! SQL dialect abstraction

use sqlparser::ast::Statement;
use sqlparser::dialect::{self as sp, Dialect};
use sqlparser::parser::Parser;

use crate::error::{SqlError, SqlResult};

/// Trait for SQL dialect implementations
pub trait SqlDialect: Send + Sync {
    /// Get the underlying sqlparser dialect
    fn parser_dialect(&self) -> &dyn Dialect;

    /// Parse SQL into AST statements
    fn parse(&self, sql: &str) -> SqlResult<Vec<Statement>> {
        Parser::parse_sql(self.parser_dialect(), sql).map_err(|e| {
            let msg = e.to_string();
            let (line, column) = parse_location_from_error(&msg);
            SqlError::ParseError {
                message: msg,
                line,
                column,
            }
        })
    }

    /// Get the dialect name
    fn name(&self) -> &'static str;
}

/// Extract "Line: N, Column: M" from a sqlparser error message.
fn parse_location_from_error(msg: &str) -> (usize, usize) {
    let number_after = |label: &str| -> Option<usize> {
        let start = msg.find(label)? + label.len();
        let rest = &msg[start..];
        let end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        rest[..end].parse().ok()
    };
    match (number_after("Line: "), number_after("Column: ")) {
        (Some(line), Some(column)) => (line, column),
        _ => (0, 0),
    }
}

macro_rules! define_dialect {
    (
        $(#[$meta:meta])*
        $Name:ident($Inner:ident), name = $label:literal
    ) => {
        $(#[$meta])*
        pub struct $Name {
            dialect: sp::$Inner,
        }

        impl $Name {
            pub fn new() -> Self {
                Self { dialect: sp::$Inner {} }
            }
        }

        impl Default for $Name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl SqlDialect for $Name {
            fn parser_dialect(&self) -> &dyn Dialect {
                &self.dialect
            }

            fn name(&self) -> &'static str {
                $label
            }
        }
    };
}

define_dialect! {
    /// ANSI-ish dialect accepting the widest range of syntax
    GenericDialect(GenericDialect), name = "generic"
}

define_dialect! {
    /// PostgreSQL dialect
    PostgresDialect(PostgreSqlDialect), name = "postgres"
}

define_dialect! {
    /// MySQL dialect
    MySqlDialect(MySqlDialect), name = "mysql"
}

define_dialect! {
    /// SQL Server (T-SQL) dialect
    MsSqlDialect(MsSqlDialect), name = "mssql"
}

define_dialect! {
    /// Snowflake SQL dialect
    SnowflakeDialect(SnowflakeDialect), name = "snowflake"
}

define_dialect! {
    /// BigQuery dialect
    BigQueryDialect(BigQueryDialect), name = "bigquery"
}

define_dialect! {
    /// DuckDB SQL dialect
    DuckDbDialect(DuckDbDialect), name = "duckdb"
}

define_dialect! {
    /// SQLite dialect
    SqliteDialect(SQLiteDialect), name = "sqlite"
}

/// Look up a dialect by name (case-insensitive, common aliases accepted)
pub fn dialect_by_name(name: &str) -> SqlResult<Box<dyn SqlDialect>> {
    let dialect: Box<dyn SqlDialect> = match name.trim().to_lowercase().as_str() {
        "generic" | "ansi" => Box::new(GenericDialect::new()),
        "postgres" | "postgresql" => Box::new(PostgresDialect::new()),
        "mysql" => Box::new(MySqlDialect::new()),
        "mssql" | "tsql" | "sqlserver" => Box::new(MsSqlDialect::new()),
        "snowflake" => Box::new(SnowflakeDialect::new()),
        "bigquery" => Box::new(BigQueryDialect::new()),
        "duckdb" => Box::new(DuckDbDialect::new()),
        "sqlite" => Box::new(SqliteDialect::new()),
        _ => return Err(SqlError::UnknownDialect(name.to_string())),
    };
    Ok(dialect)
}

#[cfg(test)]
#[path = "dialect_test.rs"]
mod tests;
