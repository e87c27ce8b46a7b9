//! Error types for st-lineage

use thiserror::Error;

/// Lineage engine error type
///
/// Only setup can fail (loading config, resolving dialects). Building and
/// querying a graph never returns an error.
#[derive(Error, Debug)]
pub enum LineageError {
    /// L001: Core error propagation
    #[error("[L001] Core error: {0}")]
    Core(#[from] st_core::CoreError),

    /// L002: SQL crate error propagation
    #[error("[L002] SQL error: {0}")]
    Sql(#[from] st_sql::SqlError),
}

/// Result type alias for LineageError
pub type LineageResult<T> = Result<T, LineageError>;
