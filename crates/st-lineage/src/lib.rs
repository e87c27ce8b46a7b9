//! st-lineage: lineage graph engine for sqltrace
//!
//! This crate builds a [`LineageGraph`](st_core::LineageGraph) from a
//! workspace index and answers questions about it: directional flow,
//! paths and cycles, column-level tracing, and change impact.

pub mod builder;
pub mod column;
pub(crate) mod error;
pub mod flow;
pub mod impact;
pub mod source;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;

pub use builder::{BuildSummary, LineageBuilder};
pub use column::ColumnLineageTracker;
pub use error::{LineageError, LineageResult};
pub use flow::{FlowAnalyzer, FullLineage};
pub use impact::{ChangeType, ImpactAnalyzer, ImpactItem, ImpactReport, ImpactSummary};
pub use source::{
    CachingSourceProvider, FsSourceProvider, InMemorySourceProvider, SourceTextProvider,
};
