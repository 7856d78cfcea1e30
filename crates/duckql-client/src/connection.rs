//! The connection boundary.
//!
//! A [`Connection`] executes compiled queries either to a materialized
//! [`ResultSet`] or to a streaming [`ResultHandle`] that hands out
//! columnar [`DataChunk`]s on demand. Drivers implement these traits;
//! [`MemoryConnection`](crate::memory::MemoryConnection) is the in-process
//! one.

use std::sync::Arc;

use async_trait::async_trait;
use duckql_sql::{CompiledQuery, LogicalType, NativeValue};

use crate::error::{ClientError, ClientResult};

/// Name and logical type of a result column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnInfo {
    /// Column name.
    pub name: String,
    /// Declared logical type.
    pub logical_type: LogicalType,
}

impl ColumnInfo {
    /// Creates a column descriptor.
    pub fn new(name: impl Into<String>, logical_type: LogicalType) -> Self {
        Self {
            name: name.into(),
            logical_type,
        }
    }

    /// Collects the names of `columns` for sharing between rows.
    pub fn names(columns: &[ColumnInfo]) -> Arc<[String]> {
        columns.iter().map(|c| c.name.clone()).collect()
    }
}

/// A batch of rows in columnar layout: one vector per column.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataChunk {
    columns: Vec<Vec<NativeValue>>,
    len: usize,
}

impl DataChunk {
    /// Creates a chunk from column vectors of equal length.
    pub fn new(columns: Vec<Vec<NativeValue>>) -> ClientResult<Self> {
        let len = columns.first().map_or(0, Vec::len);
        if let Some(bad) = columns.iter().position(|c| c.len() != len) {
            return Err(ClientError::Internal(format!(
                "chunk column {} has {} values, expected {}",
                bad,
                columns[bad].len(),
                len
            )));
        }
        Ok(Self { columns, len })
    }

    /// Transposes row-major values into a chunk of `width` columns.
    pub fn from_rows(width: usize, rows: &[Vec<NativeValue>]) -> ClientResult<Self> {
        let mut columns = vec![Vec::with_capacity(rows.len()); width];
        for (index, row) in rows.iter().enumerate() {
            if row.len() != width {
                return Err(ClientError::Internal(format!(
                    "row {} has {} values, expected {}",
                    index,
                    row.len(),
                    width
                )));
            }
            for (column, value) in columns.iter_mut().zip(row) {
                column.push(value.clone());
            }
        }
        Ok(Self {
            columns,
            len: rows.len(),
        })
    }

    /// Returns the number of rows.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the chunk has no rows.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the number of columns.
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Returns the column vectors.
    pub fn columns(&self) -> &[Vec<NativeValue>] {
        &self.columns
    }

    /// Consumes the chunk and returns the column vectors.
    pub fn into_columns(self) -> Vec<Vec<NativeValue>> {
        self.columns
    }
}

/// A materialized result.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultSet {
    /// Column descriptors.
    pub columns: Vec<ColumnInfo>,
    /// Row-major native values.
    pub rows: Vec<Vec<NativeValue>>,
    /// Rows affected by DML, zero for queries.
    pub rows_affected: u64,
}

impl ResultSet {
    /// Creates a result with rows and no affected count.
    pub fn new(columns: Vec<ColumnInfo>, rows: Vec<Vec<NativeValue>>) -> Self {
        Self {
            columns,
            rows,
            rows_affected: 0,
        }
    }

    /// Creates a DML result.
    pub fn affected(count: u64) -> Self {
        Self {
            rows_affected: count,
            ..Default::default()
        }
    }
}

/// An open streaming result.
///
/// `fetch_chunk` returns `Ok(None)` once the result is exhausted.
/// `release` frees the handle; it is idempotent and must not block.
#[async_trait]
pub trait ResultHandle: Send {
    /// Returns the result's column descriptors.
    fn columns(&self) -> &[ColumnInfo];

    /// Fetches the next chunk.
    async fn fetch_chunk(&mut self) -> ClientResult<Option<DataChunk>>;

    /// Releases the handle.
    fn release(&mut self);
}

/// A database connection.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Executes a query and materializes its result.
    async fn execute(&self, query: &CompiledQuery) -> ClientResult<ResultSet>;

    /// Executes a query and opens a streaming handle over its result.
    async fn open_stream(
        &self,
        query: &CompiledQuery,
        chunk_size: usize,
    ) -> ClientResult<Box<dyn ResultHandle>>;

    /// Closes the connection.
    async fn close(&self) -> ClientResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_from_rows_transposes() {
        let rows = vec![
            vec![NativeValue::Integer(1), NativeValue::Varchar("a".to_string())],
            vec![NativeValue::Integer(2), NativeValue::Varchar("b".to_string())],
        ];
        let chunk = DataChunk::from_rows(2, &rows).unwrap();
        assert_eq!(chunk.len(), 2);
        assert_eq!(chunk.width(), 2);
        assert_eq!(
            chunk.columns()[0],
            vec![NativeValue::Integer(1), NativeValue::Integer(2)]
        );
    }

    #[test]
    fn test_chunk_rejects_ragged_columns() {
        let result = DataChunk::new(vec![
            vec![NativeValue::Integer(1)],
            vec![NativeValue::Integer(1), NativeValue::Integer(2)],
        ]);
        assert!(result.is_err());
        assert!(DataChunk::from_rows(2, &[vec![NativeValue::Null]]).is_err());
    }

    #[test]
    fn test_column_names_shared() {
        let columns = vec![
            ColumnInfo::new("a", LogicalType::Integer),
            ColumnInfo::new("b", LogicalType::Varchar),
        ];
        let names = ColumnInfo::names(&columns);
        assert_eq!(&names[..], &["a".to_string(), "b".to_string()]);
    }
}
