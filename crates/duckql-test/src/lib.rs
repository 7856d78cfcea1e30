//! # duckql-test
//!
//! Integration tests for duckql.
//!
//! This crate contains:
//! - End-to-end tests from query builder to decoded rows
//! - Shared fixtures over [`MemoryConnection`]

#![warn(missing_docs)]
#![warn(clippy::all)]

use std::sync::{Arc, Once};

use duckql_client::{Client, ClientConfig, ColumnInfo, MemoryConnection, ResultSet};
use duckql_sql::{LogicalType, NativeValue, TableMapping};
use tracing_subscriber::EnvFilter;

static TRACING: Once = Once::new();

/// Installs a test-friendly tracing subscriber once per process.
///
/// Honors `RUST_LOG`, defaulting to `warn`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// Creates a client over a fresh in-memory connection.
///
/// The connection is returned alongside so tests can register results
/// and inspect what was executed.
pub fn memory_client(mapping: TableMapping, chunk_size: usize) -> (MemoryConnection, Client) {
    init_tracing();
    let conn = MemoryConnection::new();
    let config = ClientConfig::new()
        .table_mappings(mapping)
        .stream_chunk_size(chunk_size);
    match Client::new(Arc::new(conn.clone()), config) {
        Ok(client) => (conn, client),
        Err(e) => panic!("invalid test client configuration: {}", e),
    }
}

/// Columns of the `users` fixture.
pub fn users_columns() -> Vec<ColumnInfo> {
    vec![
        ColumnInfo::new("id", LogicalType::Integer),
        ColumnInfo::new("name", LogicalType::Varchar),
        ColumnInfo::new("signup", LogicalType::Date),
        ColumnInfo::new("tags", LogicalType::list(LogicalType::Varchar)),
    ]
}

/// A `users` result set with `n` rows; ids run from 1 to `n`.
///
/// Every third row has a NULL name.
pub fn users_result(n: i32) -> ResultSet {
    let rows = (1..=n)
        .map(|id| {
            let name = if id % 3 == 0 {
                NativeValue::Null
            } else {
                NativeValue::Varchar(format!("user{}", id))
            };
            vec![
                NativeValue::Integer(id),
                name,
                NativeValue::Date(19_000 + id),
                NativeValue::List(vec![NativeValue::Varchar(format!("t{}", id % 2))]),
            ]
        })
        .collect();
    ResultSet::new(users_columns(), rows)
}
