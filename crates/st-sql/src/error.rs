//! Error types for st-sql

use thiserror::Error;

/// SQL parsing errors
#[derive(Error, Debug)]
pub enum SqlError {
    /// SQL parse error (S001)
    #[error("[S001] SQL parse error at line {line}, column {column}: {message}")]
    ParseError {
        message: String,
        line: usize,
        column: usize,
    },

    /// Empty SQL (S002)
    #[error("[S002] SQL is empty")]
    EmptySql,

    /// Unknown dialect name (S003)
    #[error("[S003] Unknown SQL dialect: {0}")]
    UnknownDialect(String),

    /// No configured dialect could parse the SQL (S004)
    #[error("[S004] No dialect accepted the SQL (tried: {tried})")]
    NoDialectMatched { tried: String },
}

/// Result type alias for SqlError
pub type SqlResult<T> = Result<T, SqlError>;
