//! # duckql-sql
//!
//! Query trees and SQL generation for DuckDB.
//!
//! This crate implements:
//! - A query tree (`ast`) and a fluent builder over it
//! - DuckDB logical types and engine-native values
//! - Table mappings that rewrite logical table names into table expressions
//! - The DuckDB query compiler (quoting, `?` placeholders, dialect quirks)
//!
//! ## Example
//!
//! ```rust
//! use duckql_sql::{DuckDbDialect, QueryBuilder, TableMapping};
//!
//! let mapping = TableMapping::new().with("users", "read_parquet('a.parquet')");
//! let dialect = DuckDbDialect::new(mapping);
//!
//! let query = QueryBuilder::new().select_from("users").build();
//! let compiled = dialect.compile(&query).unwrap();
//! assert_eq!(compiled.sql, "select * from read_parquet('a.parquet')");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Query tree.
pub mod ast;

/// Fluent query builder.
pub mod builder;

/// SQL text generation.
pub mod compiler;

/// The DuckDB dialect.
pub mod dialect;

/// Compile errors.
pub mod error;

/// Table mapping and resolution.
pub mod mapping;

/// Logical types and native values.
pub mod types;

// Re-exports
pub use ast::{
    BinaryOperator, ColumnDef, ColumnRef, CreateTableQuery, DeleteQuery, DropTableQuery,
    ExplainQuery, Expr, InsertQuery, Join, JoinKind, OrderByExpr, Query, RawQuery, SelectItem,
    SelectQuery, SortDirection, TableRef, UpdateQuery,
};
pub use builder::{
    CreateTableBuilder, DeleteBuilder, InsertBuilder, QueryBuilder, SelectBuilder, UpdateBuilder,
};
pub use compiler::{quote_identifier, unquote_identifier, CompiledQuery, QueryCompiler};
pub use dialect::DuckDbDialect;
pub use error::{CompileError, CompileResult};
pub use mapping::{resolve, Resolution, TableMapping, TableResolver};
pub use types::{BitString, LogicalType, NativeValue, ParseBitStringError};
