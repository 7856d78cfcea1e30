//! In-process connection serving canned results.
//!
//! [`MemoryConnection`] answers queries from result sets registered by
//! SQL text. It does not interpret SQL: an unregistered statement returns
//! an empty result. It tracks open handles so tests can check that every
//! stream released its handle, and it can fail a stream after a given
//! number of chunks or fail a statement outright.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use duckql_sql::{CompiledQuery, NativeValue};
use parking_lot::{Mutex, RwLock};

use crate::connection::{ColumnInfo, Connection, DataChunk, ResultHandle, ResultSet};
use crate::error::{ClientError, ClientResult};

/// A stream failure to inject.
#[derive(Debug, Clone)]
struct InjectedFailure {
    /// Chunks served before failing.
    after_chunks: usize,
    message: String,
}

#[derive(Debug, Default)]
struct MemoryState {
    results: RwLock<HashMap<String, Arc<ResultSet>>>,
    failures: RwLock<HashMap<String, InjectedFailure>>,
    execute_failures: RwLock<HashMap<String, String>>,
    executed: Mutex<Vec<CompiledQuery>>,
    open_handles: AtomicUsize,
    streams_opened: AtomicUsize,
    closed: AtomicBool,
}

impl MemoryState {
    fn check_open(&self) -> ClientResult<()> {
        if self.closed.load(Ordering::Acquire) {
            Err(ClientError::ConnectionClosed)
        } else {
            Ok(())
        }
    }

    fn record(&self, query: &CompiledQuery) {
        self.executed.lock().push(query.clone());
    }

    fn result_for(&self, sql: &str) -> Arc<ResultSet> {
        self.results
            .read()
            .get(sql)
            .cloned()
            .unwrap_or_default()
    }
}

/// In-memory [`Connection`].
///
/// Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryConnection {
    state: Arc<MemoryState>,
}

impl MemoryConnection {
    /// Creates a connection with no registered results.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the result returned for `sql`.
    pub fn register(&self, sql: impl Into<String>, result: ResultSet) {
        self.state
            .results
            .write()
            .insert(sql.into(), Arc::new(result));
    }

    /// Makes streams over `sql` fail after serving `after_chunks` chunks.
    pub fn fail_after(&self, sql: impl Into<String>, after_chunks: usize, message: impl Into<String>) {
        self.state.failures.write().insert(
            sql.into(),
            InjectedFailure {
                after_chunks,
                message: message.into(),
            },
        );
    }

    /// Makes every execution of `sql` fail with `message`.
    pub fn fail_execute(&self, sql: impl Into<String>, message: impl Into<String>) {
        self.state
            .execute_failures
            .write()
            .insert(sql.into(), message.into());
    }

    /// Removes injected failures for `sql`.
    pub fn clear_failure(&self, sql: &str) {
        self.state.failures.write().remove(sql);
        self.state.execute_failures.write().remove(sql);
    }

    /// Returns the number of handles not yet released.
    pub fn open_handles(&self) -> usize {
        self.state.open_handles.load(Ordering::Acquire)
    }

    /// Returns the number of streams opened so far.
    pub fn streams_opened(&self) -> usize {
        self.state.streams_opened.load(Ordering::Acquire)
    }

    /// Returns every statement received, in order.
    pub fn executed(&self) -> Vec<CompiledQuery> {
        self.state.executed.lock().clone()
    }

    /// Returns the SQL text of every statement received, in order.
    pub fn executed_sql(&self) -> Vec<String> {
        self.state
            .executed
            .lock()
            .iter()
            .map(|q| q.sql.clone())
            .collect()
    }

    /// Returns true once [`close`](Connection::close) succeeded.
    pub fn is_closed(&self) -> bool {
        self.state.closed.load(Ordering::Acquire)
    }
}

#[async_trait]
impl Connection for MemoryConnection {
    async fn execute(&self, query: &CompiledQuery) -> ClientResult<ResultSet> {
        self.state.check_open()?;
        self.state.record(query);
        if let Some(message) = self.state.execute_failures.read().get(&query.sql) {
            return Err(ClientError::QueryFailed(message.clone()));
        }
        Ok(self.state.result_for(&query.sql).as_ref().clone())
    }

    async fn open_stream(
        &self,
        query: &CompiledQuery,
        chunk_size: usize,
    ) -> ClientResult<Box<dyn ResultHandle>> {
        self.state.check_open()?;
        if chunk_size == 0 {
            return Err(ClientError::InvalidConfig(
                "chunk size must be positive".to_string(),
            ));
        }
        self.state.record(query);

        let result = self.state.result_for(&query.sql);
        let failure = self.state.failures.read().get(&query.sql).cloned();
        self.state.open_handles.fetch_add(1, Ordering::AcqRel);
        self.state.streams_opened.fetch_add(1, Ordering::AcqRel);

        Ok(Box::new(MemoryHandle {
            state: Arc::clone(&self.state),
            result,
            position: 0,
            chunk_size,
            chunks_served: 0,
            failure,
            released: false,
        }))
    }

    async fn close(&self) -> ClientResult<()> {
        let open = self.open_handles();
        if open > 0 {
            return Err(ClientError::HandlesOutstanding(open));
        }
        self.state.closed.store(true, Ordering::Release);
        tracing::info!("memory connection closed");
        Ok(())
    }
}

/// Streaming handle over a registered result.
struct MemoryHandle {
    state: Arc<MemoryState>,
    result: Arc<ResultSet>,
    position: usize,
    chunk_size: usize,
    chunks_served: usize,
    failure: Option<InjectedFailure>,
    released: bool,
}

impl MemoryHandle {
    fn next_rows(&mut self) -> &[Vec<NativeValue>] {
        let end = (self.position + self.chunk_size).min(self.result.rows.len());
        let start = self.position;
        self.position = end;
        &self.result.rows[start..end]
    }
}

#[async_trait]
impl ResultHandle for MemoryHandle {
    fn columns(&self) -> &[ColumnInfo] {
        &self.result.columns
    }

    async fn fetch_chunk(&mut self) -> ClientResult<Option<DataChunk>> {
        if self.released {
            return Err(ClientError::Internal("fetch on released handle".to_string()));
        }
        if let Some(failure) = &self.failure {
            if self.chunks_served >= failure.after_chunks {
                return Err(ClientError::QueryFailed(failure.message.clone()));
            }
        }
        if self.position >= self.result.rows.len() {
            return Ok(None);
        }

        let width = self.result.columns.len();
        let chunk = DataChunk::from_rows(width, self.next_rows())?;
        self.chunks_served += 1;
        Ok(Some(chunk))
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.state.open_handles.fetch_sub(1, Ordering::AcqRel);
        }
    }
}

impl Drop for MemoryHandle {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duckql_sql::LogicalType;

    fn numbers(n: i32) -> ResultSet {
        ResultSet::new(
            vec![ColumnInfo::new("n", LogicalType::Integer)],
            (0..n).map(|i| vec![NativeValue::Integer(i)]).collect(),
        )
    }

    #[tokio::test]
    async fn test_execute_returns_registered_result() {
        let conn = MemoryConnection::new();
        conn.register("select 1", numbers(1));
        let result = conn.execute(&CompiledQuery::raw("select 1")).await.unwrap();
        assert_eq!(result.rows.len(), 1);
        assert_eq!(conn.executed_sql(), vec!["select 1"]);
    }

    #[tokio::test]
    async fn test_unregistered_sql_is_empty() {
        let conn = MemoryConnection::new();
        let result = conn.execute(&CompiledQuery::raw("commit")).await.unwrap();
        assert!(result.columns.is_empty());
        assert!(result.rows.is_empty());
    }

    #[tokio::test]
    async fn test_handle_chunks_rows() {
        let conn = MemoryConnection::new();
        conn.register("q", numbers(5));
        let mut handle = conn.open_stream(&CompiledQuery::raw("q"), 2).await.unwrap();

        let mut sizes = Vec::new();
        while let Some(chunk) = handle.fetch_chunk().await.unwrap() {
            sizes.push(chunk.len());
        }
        assert_eq!(sizes, vec![2, 2, 1]);
        handle.release();
        handle.release();
        assert_eq!(conn.open_handles(), 0);
    }

    #[tokio::test]
    async fn test_close_refuses_while_handles_open() {
        let conn = MemoryConnection::new();
        conn.register("q", numbers(3));
        let handle = conn.open_stream(&CompiledQuery::raw("q"), 2).await.unwrap();

        assert!(matches!(
            conn.close().await,
            Err(ClientError::HandlesOutstanding(1))
        ));
        drop(handle);
        conn.close().await.unwrap();
        assert!(conn.is_closed());
        assert!(matches!(
            conn.execute(&CompiledQuery::raw("q")).await,
            Err(ClientError::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn test_zero_chunk_size_rejected() {
        let conn = MemoryConnection::new();
        assert!(conn.open_stream(&CompiledQuery::raw("q"), 0).await.is_err());
        assert_eq!(conn.open_handles(), 0);
    }
}
