//! Error types for st-core

use thiserror::Error;

/// Core error type for sqltrace
///
/// Graph queries never fail; these errors only come from loading
/// configuration and workspace index files.
#[derive(Error, Debug)]
pub enum CoreError {
    /// C001: Configuration file not found
    #[error("[C001] Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// C002: Invalid configuration value
    #[error("[C002] Invalid config: {message}")]
    ConfigInvalid { message: String },

    /// C003: Workspace index file not found
    #[error("[C003] Workspace index not found: {path}")]
    IndexNotFound { path: String },

    /// C004: IO error with file path context
    #[error("[C004] Failed to read '{path}': {source}")]
    IoWithPath {
        path: String,
        source: std::io::Error,
    },

    /// C005: YAML parse error
    #[error("[C005] Config parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// C006: JSON serialization/deserialization error
    #[error("[C006] JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;
