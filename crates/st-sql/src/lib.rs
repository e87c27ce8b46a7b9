//! st-sql - SQL helpers for sqltrace
//!
//! This crate wraps sqlparser-rs with a multi-dialect parser and provides the
//! text heuristics the lineage builder relies on: comment stripping,
//! balanced-parenthesis matching, CTE and subquery-alias recovery, and a
//! regex fallback for statement write targets.

pub mod dialect;
pub mod error;
pub mod parser;
pub mod structure;
pub mod target;
pub mod text;

pub use dialect::{dialect_by_name, SqlDialect};
pub use error::{SqlError, SqlResult};
pub use parser::{MultiDialectParser, SqlParser};
pub use structure::{RecoveredStructure, StructureChain, StructureStrategy};
pub use target::find_write_target;
pub use text::{find_matching_paren, strip_comments};
