//! Impact severity levels and the count thresholds that select them.

use serde::{Deserialize, Serialize};

/// Severity of a change impact, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Few or no dependents
    Low,
    /// A handful of dependents
    Medium,
    /// Many dependents
    High,
    /// Widespread impact
    Critical,
}

impl Severity {
    /// One step less severe, saturating at `Low`.
    pub fn downgrade(self) -> Self {
        match self {
            Severity::Critical => Severity::High,
            Severity::High => Severity::Medium,
            Severity::Medium | Severity::Low => Severity::Low,
        }
    }

    /// Whether this severity warrants operational precautions.
    pub fn is_high_or_above(self) -> bool {
        self >= Severity::High
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// Lower bounds (inclusive) of affected-object counts for each severity.
///
/// Counts below `medium` are `Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeverityThresholds {
    /// First count classified as `Medium`
    #[serde(default = "default_medium")]
    pub medium: usize,
    /// First count classified as `High`
    #[serde(default = "default_high")]
    pub high: usize,
    /// First count classified as `Critical`
    #[serde(default = "default_critical")]
    pub critical: usize,
}

fn default_medium() -> usize {
    3
}

fn default_high() -> usize {
    10
}

fn default_critical() -> usize {
    20
}

impl Default for SeverityThresholds {
    fn default() -> Self {
        Self {
            medium: default_medium(),
            high: default_high(),
            critical: default_critical(),
        }
    }
}

impl SeverityThresholds {
    /// Classify a total affected count.
    ///
    /// ```
    /// use st_core::severity::{Severity, SeverityThresholds};
    /// let t = SeverityThresholds::default();
    /// assert_eq!(t.classify(2), Severity::Low);
    /// assert_eq!(t.classify(20), Severity::Critical);
    /// ```
    pub fn classify(&self, total_affected: usize) -> Severity {
        if total_affected < self.medium {
            Severity::Low
        } else if total_affected < self.high {
            Severity::Medium
        } else if total_affected < self.critical {
            Severity::High
        } else {
            Severity::Critical
        }
    }

    /// Whether the thresholds are strictly ascending.
    pub fn is_ascending(&self) -> bool {
        self.medium < self.high && self.high < self.critical
    }
}
