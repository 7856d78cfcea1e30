//! Query tree for duckql.
//!
//! The tree is what a builder produces and what [`QueryCompiler`]
//! walks. It carries no SQL text of its own except for explicit raw
//! fragments; quoting and placeholders are decided at compile time.
//!
//! [`QueryCompiler`]: crate::compiler::QueryCompiler

mod expr;
mod statement;

pub use expr::*;
pub use statement::*;
