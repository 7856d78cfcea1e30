//! # duckql-client
//!
//! Client library for DuckDB queries built with `duckql-sql`.
//!
//! This crate provides:
//!
//! - **Value Codec**: Conversion between engine-native values and client [`Value`]s
//! - **Row Streaming**: Chunked, lazily decoded result streams with handle release
//! - **Client**: Compile-and-execute over a [`Connection`], with statistics
//! - **Transaction Support**: RAII-style transaction management
//! - **Introspection**: Schemas, tables and columns from `information_schema`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use duckql_client::{Client, ClientConfig, MemoryConnection};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::new().map_table("users", "read_parquet('users.parquet')");
//!     let client = Client::new(Arc::new(MemoryConnection::new()), config)?;
//!
//!     let query = client.query().select_from("users").where_eq("active", true).build();
//!     let mut stream = client.stream(&query).await?;
//!     while let Some(row) = stream.next().await? {
//!         println!("{}", row);
//!     }
//!
//!     let txn = client.begin().await?;
//!     txn.execute(&client.query().delete_from("users").where_eq("id", 1).build()).await?;
//!     txn.commit().await?;
//!
//!     client.close().await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Error types.
pub mod error;

/// Client values and the native value codec.
pub mod value;

/// Decoded rows.
pub mod row;

/// Connection seam.
pub mod connection;

/// In-process connection.
pub mod memory;

/// Row streams.
pub mod stream;

/// Client configuration.
pub mod config;

/// Client.
pub mod client;

/// Transaction handle.
pub mod transaction;

/// Catalog introspection.
pub mod introspect;

// Re-exports
pub use client::{Client, ClientStats, QueryResult};
pub use config::{ClientConfig, DEFAULT_STREAM_CHUNK_SIZE};
pub use connection::{ColumnInfo, Connection, DataChunk, ResultHandle, ResultSet};
pub use error::{ClientError, ClientResult, CodecError, CodecResult};
pub use introspect::{
    ColumnMetadata, IntrospectOptions, Introspector, SchemaMetadata, TableMetadata,
};
pub use memory::MemoryConnection;
pub use row::Row;
pub use stream::{RowStream, StreamState};
pub use transaction::{Transaction, TransactionExt};
pub use value::codec::{decode, encode};
pub use value::construct::{
    array_value, bit_value, blob_value, date_value, enum_value, interval_value, list_value,
    map_value, struct_value, time_value, timestamp_tz_value, timestamp_value, uuid_value,
};
pub use value::{FromValue, Interval, Value};
