//! Configuration types and parsing for sqltrace.yml

use crate::error::{CoreError, CoreResult};
use crate::severity::SeverityThresholds;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level lineage configuration from sqltrace.yml
///
/// Every section is optional; an empty file yields the defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LineageConfig {
    /// Graph construction settings
    #[serde(default)]
    pub builder: BuilderConfig,

    /// Traversal defaults
    #[serde(default)]
    pub traversal: TraversalConfig,

    /// Impact analysis settings
    #[serde(default)]
    pub impact: ImpactConfig,
}

/// Settings for the lineage builder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuilderConfig {
    /// Re-read source files to recover CTEs and subquery aliases
    #[serde(default = "default_true")]
    pub rescan_sources: bool,

    /// SQL dialects tried, in order, when parsing source text
    #[serde(default = "default_dialects")]
    pub dialects: Vec<String>,

    /// Base directory for relative source paths
    #[serde(default)]
    pub source_root: Option<PathBuf>,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            rescan_sources: true,
            dialects: default_dialects(),
            source_root: None,
        }
    }
}

/// Traversal defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TraversalConfig {
    /// Default maximum depth; negative means unbounded
    #[serde(default = "default_max_depth")]
    pub default_max_depth: i32,

    /// Upper bound on the number of paths enumerated between two nodes
    #[serde(default = "default_max_paths")]
    pub max_paths: usize,
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            default_max_depth: default_max_depth(),
            max_paths: default_max_paths(),
        }
    }
}

impl TraversalConfig {
    /// The default depth as an optional bound (`None` = unbounded).
    pub fn max_depth(&self) -> Option<usize> {
        usize::try_from(self.default_max_depth).ok()
    }
}

/// Impact analysis settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImpactConfig {
    /// Affected-count thresholds for severity levels
    #[serde(default)]
    pub thresholds: SeverityThresholds,
}

fn default_true() -> bool {
    true
}

fn default_dialects() -> Vec<String> {
    [
        "generic",
        "postgres",
        "mysql",
        "mssql",
        "snowflake",
        "bigquery",
        "duckdb",
        "sqlite",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_max_depth() -> i32 {
    -1
}

fn default_max_paths() -> usize {
    1000
}

impl LineageConfig {
    /// Load configuration from a file
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_yaml_str(&content)
    }

    /// Load configuration from a directory (looks for sqltrace.yml or sqltrace.yaml)
    pub fn load_from_dir(dir: &Path) -> CoreResult<Self> {
        let yml_path = dir.join("sqltrace.yml");
        let yaml_path = dir.join("sqltrace.yaml");

        if yml_path.exists() {
            Self::load(&yml_path)
        } else if yaml_path.exists() {
            Self::load(&yaml_path)
        } else {
            Err(CoreError::ConfigNotFound {
                path: yml_path.display().to_string(),
            })
        }
    }

    /// Parse and validate configuration from YAML text
    pub fn from_yaml_str(content: &str) -> CoreResult<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: LineageConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> CoreResult<()> {
        if self.builder.dialects.is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "builder.dialects must list at least one dialect".to_string(),
            });
        }
        if let Some(name) = self.builder.dialects.iter().find(|d| d.trim().is_empty()) {
            return Err(CoreError::ConfigInvalid {
                message: format!("builder.dialects contains an empty entry: {:?}", name),
            });
        }
        if self.traversal.max_paths == 0 {
            return Err(CoreError::ConfigInvalid {
                message: "traversal.max_paths must be greater than zero".to_string(),
            });
        }
        let t = &self.impact.thresholds;
        if !t.is_ascending() {
            return Err(CoreError::ConfigInvalid {
                message: format!(
                    "impact.thresholds must be strictly ascending (medium={}, high={}, critical={})",
                    t.medium, t.high, t.critical
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
