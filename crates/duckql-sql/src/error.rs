//! Error types for query compilation.

use thiserror::Error;

/// Errors raised while compiling a query tree into SQL text.
///
/// Compile errors are deterministic: the same query tree always fails the
/// same way, so nothing here is worth retrying.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// DuckDB has no auto-increment column attribute.
    #[error(
        "auto-increment is not supported by DuckDB (column \"{column}\"); \
         use a sequence with a nextval() default instead"
    )]
    AutoIncrementUnsupported {
        /// The offending column.
        column: String,
    },

    /// An identifier was empty.
    #[error("empty identifier")]
    EmptyIdentifier,

    /// INSERT without any value rows.
    #[error("insert into {table} has no value rows")]
    EmptyInsert {
        /// Target table name.
        table: String,
    },

    /// An INSERT row whose arity differs from the column list.
    #[error("insert row {row} has {found} values, expected {expected}")]
    InsertArity {
        /// Zero-based row index.
        row: usize,
        /// Number of columns.
        expected: usize,
        /// Number of values in the row.
        found: usize,
    },

    /// UPDATE without any assignments.
    #[error("update of {table} has no assignments")]
    EmptyUpdate {
        /// Target table name.
        table: String,
    },

    /// CREATE TABLE without any columns.
    #[error("create table {table} has no columns")]
    EmptyCreateTable {
        /// Target table name.
        table: String,
    },

    /// `IN ()` with an empty list.
    #[error("empty IN list")]
    EmptyInList,

    /// A value that cannot be written as an inline literal (DDL defaults).
    #[error("{type_id} values cannot be inlined as literals")]
    UnsupportedLiteral {
        /// Runtime tag of the value.
        type_id: &'static str,
    },
}

/// Result type for compile operations.
pub type CompileResult<T> = Result<T, CompileError>;
