//! Incremental row retrieval.
//!
//! A [`RowStream`] owns one open [`ResultHandle`]. Rows are pulled one at
//! a time with [`RowStream::next`]; chunks are fetched only when the
//! current one is used up, and each row is decoded as it is pulled.
//!
//! State machine:
//!
//! ```text
//! Created -> Pulling -> Yielding -> Pulling -> ...
//!                    -> Exhausted   (terminal)
//!                    -> Failed      (terminal)
//! ```
//!
//! The handle is released on entering a terminal state, on
//! [`close`](RowStream::close), and on drop.

use std::sync::Arc;

use duckql_sql::NativeValue;
use futures::Stream;

use crate::connection::{ColumnInfo, DataChunk, ResultHandle};
use crate::error::{ClientError, ClientResult};
use crate::row::Row;

/// Lifecycle state of a [`RowStream`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Opened, nothing pulled yet.
    Created,
    /// A pull is in progress.
    Pulling,
    /// The last pull produced a row.
    Yielding,
    /// All rows were produced, or the stream was closed.
    Exhausted,
    /// A pull failed.
    Failed,
}

impl StreamState {
    /// Returns true for `Exhausted` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamState::Exhausted | StreamState::Failed)
    }
}

/// Row cursor over one columnar chunk.
struct ChunkCursor {
    columns: Vec<std::vec::IntoIter<NativeValue>>,
    remaining: usize,
}

impl ChunkCursor {
    fn new(chunk: DataChunk) -> Self {
        let remaining = chunk.len();
        Self {
            columns: chunk.into_columns().into_iter().map(Vec::into_iter).collect(),
            remaining,
        }
    }

    fn next_row(&mut self) -> Option<Vec<NativeValue>> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        self.columns.iter_mut().map(Iterator::next).collect()
    }
}

/// A lazily consumed sequence of decoded rows.
pub struct RowStream {
    /// Open handle; `None` once released.
    handle: Option<Box<dyn ResultHandle>>,
    /// Column descriptors captured at open.
    columns: Vec<ColumnInfo>,
    /// Column names shared by every row.
    names: Arc<[String]>,
    /// Rows of the current chunk not yet yielded.
    cursor: Option<ChunkCursor>,
    state: StreamState,
    /// Message of the error that failed the stream.
    failure: Option<String>,
    rows_yielded: u64,
    chunks_fetched: u64,
}

impl RowStream {
    /// Wraps an open handle.
    pub fn new(handle: Box<dyn ResultHandle>) -> Self {
        let columns = handle.columns().to_vec();
        let names = ColumnInfo::names(&columns);
        Self {
            handle: Some(handle),
            columns,
            names,
            cursor: None,
            state: StreamState::Created,
            failure: None,
            rows_yielded: 0,
            chunks_fetched: 0,
        }
    }

    /// Returns the column descriptors.
    pub fn columns(&self) -> &[ColumnInfo] {
        &self.columns
    }

    /// Returns the current state.
    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Returns the number of rows yielded so far.
    pub fn rows_yielded(&self) -> u64 {
        self.rows_yielded
    }

    /// Pulls the next row.
    ///
    /// Returns `Ok(None)` once exhausted. After a failure the first pull
    /// returns the original error and every later pull returns
    /// [`ClientError::StreamFailed`].
    pub async fn next(&mut self) -> ClientResult<Option<Row>> {
        match self.state {
            StreamState::Exhausted => return Ok(None),
            StreamState::Failed => {
                let message = self.failure.clone().unwrap_or_default();
                return Err(ClientError::StreamFailed(message));
            }
            _ => {}
        }
        self.state = StreamState::Pulling;

        loop {
            if let Some(natives) = self.cursor.as_mut().and_then(ChunkCursor::next_row) {
                return match Row::decode(&self.columns, &self.names, natives) {
                    Ok(row) => {
                        self.rows_yielded += 1;
                        self.state = StreamState::Yielding;
                        Ok(Some(row))
                    }
                    Err(e) => Err(self.fail(e)),
                };
            }
            self.cursor = None;

            let Some(handle) = self.handle.as_mut() else {
                self.finish();
                return Ok(None);
            };

            match handle.fetch_chunk().await {
                Ok(Some(chunk)) => {
                    self.chunks_fetched += 1;
                    tracing::trace!(
                        chunk = self.chunks_fetched,
                        rows = chunk.len(),
                        "fetched chunk"
                    );
                    self.cursor = Some(ChunkCursor::new(chunk));
                }
                Ok(None) => {
                    self.finish();
                    return Ok(None);
                }
                Err(e) => return Err(self.fail(e)),
            }
        }
    }

    /// Drains the stream into a vector.
    pub async fn collect_rows(mut self) -> ClientResult<Vec<Row>> {
        let mut rows = Vec::new();
        while let Some(row) = self.next().await? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Adapts this stream to a [`futures::Stream`].
    ///
    /// The adapter ends after the first error.
    pub fn into_stream(self) -> impl Stream<Item = ClientResult<Row>> + Send {
        futures::stream::unfold(Some(self), |state| async move {
            let mut stream = state?;
            match stream.next().await {
                Ok(Some(row)) => Some((Ok(row), Some(stream))),
                Ok(None) => None,
                Err(e) => Some((Err(e), None)),
            }
        })
    }

    /// Stops the stream early and releases its handle.
    pub fn close(&mut self) {
        if !self.state.is_terminal() {
            tracing::debug!(rows = self.rows_yielded, "stream closed early");
            self.state = StreamState::Exhausted;
        }
        self.cursor = None;
        self.release();
    }

    fn finish(&mut self) {
        tracing::debug!(
            rows = self.rows_yielded,
            chunks = self.chunks_fetched,
            "stream exhausted"
        );
        self.state = StreamState::Exhausted;
        self.release();
    }

    fn fail(&mut self, error: ClientError) -> ClientError {
        tracing::debug!(rows = self.rows_yielded, error = %error, "stream failed");
        self.state = StreamState::Failed;
        self.failure = Some(error.to_string());
        self.cursor = None;
        self.release();
        error
    }

    fn release(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.release();
        }
    }
}

impl Drop for RowStream {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for RowStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowStream")
            .field("columns", &self.names)
            .field("state", &self.state)
            .field("rows_yielded", &self.rows_yielded)
            .field("open", &self.handle.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{Connection, ResultSet};
    use crate::memory::MemoryConnection;
    use crate::value::Value;
    use duckql_sql::{CompiledQuery, LogicalType};
    use futures::StreamExt;

    const SQL: &str = "select * from \"numbers\"";

    fn connection(rows: i32) -> MemoryConnection {
        let conn = MemoryConnection::new();
        conn.register(
            SQL,
            ResultSet::new(
                vec![ColumnInfo::new("n", LogicalType::Integer)],
                (0..rows).map(|n| vec![NativeValue::Integer(n)]).collect(),
            ),
        );
        conn
    }

    async fn open(conn: &MemoryConnection, chunk_size: usize) -> RowStream {
        let handle = conn
            .open_stream(&CompiledQuery::raw(SQL), chunk_size)
            .await
            .unwrap();
        RowStream::new(handle)
    }

    #[tokio::test]
    async fn test_pulls_across_chunks() {
        let conn = connection(5);
        let mut stream = open(&conn, 2).await;
        assert_eq!(stream.state(), StreamState::Created);

        let mut seen = Vec::new();
        while let Some(row) = stream.next().await.unwrap() {
            assert_eq!(stream.state(), StreamState::Yielding);
            seen.push(row.get_as::<i64>("n").unwrap());
        }
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
        assert_eq!(stream.state(), StreamState::Exhausted);
        assert_eq!(conn.open_handles(), 0);

        // Terminal: further pulls keep returning None.
        assert!(stream.next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_empty_result() {
        let conn = connection(0);
        let mut stream = open(&conn, 16).await;
        assert!(stream.next().await.unwrap().is_none());
        assert_eq!(stream.state(), StreamState::Exhausted);
        assert_eq!(stream.rows_yielded(), 0);
        assert_eq!(conn.open_handles(), 0);
    }

    #[tokio::test]
    async fn test_drop_releases_handle() {
        let conn = connection(10);
        {
            let mut stream = open(&conn, 3).await;
            stream.next().await.unwrap();
            assert_eq!(conn.open_handles(), 1);
        }
        assert_eq!(conn.open_handles(), 0);
        conn.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_close_releases_handle() {
        let conn = connection(10);
        let mut stream = open(&conn, 3).await;
        stream.next().await.unwrap();
        stream.close();
        assert_eq!(conn.open_handles(), 0);
        assert!(stream.next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failure_is_terminal() {
        let conn = connection(10);
        conn.fail_after(SQL, 1, "disk on fire");
        let mut stream = open(&conn, 4).await;

        for _ in 0..4 {
            assert!(stream.next().await.unwrap().is_some());
        }
        let err = stream.next().await.unwrap_err();
        assert!(matches!(err, ClientError::QueryFailed(ref m) if m == "disk on fire"));
        assert_eq!(stream.state(), StreamState::Failed);
        assert_eq!(conn.open_handles(), 0);

        match stream.next().await.unwrap_err() {
            ClientError::StreamFailed(message) => assert!(message.contains("disk on fire")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_decode_failure_fails_stream() {
        let conn = MemoryConnection::new();
        conn.register(
            SQL,
            ResultSet::new(
                vec![ColumnInfo::new("n", LogicalType::Integer)],
                vec![
                    vec![NativeValue::Integer(1)],
                    vec![NativeValue::Varchar("x".to_string())],
                ],
            ),
        );
        let mut stream = open(&conn, 8).await;
        assert!(stream.next().await.unwrap().is_some());
        assert!(matches!(
            stream.next().await,
            Err(ClientError::Decode { ref column, .. }) if column == "n"
        ));
        assert_eq!(conn.open_handles(), 0);
    }

    #[tokio::test]
    async fn test_into_stream_adapter() {
        let conn = connection(3);
        let stream = open(&conn, 2).await;
        let rows: Vec<_> = stream.into_stream().collect().await;
        assert_eq!(rows.len(), 3);
        assert_eq!(
            rows[2].as_ref().unwrap().get("n"),
            Some(&Value::Integer(2))
        );
        assert_eq!(conn.open_handles(), 0);
    }

    #[tokio::test]
    async fn test_into_stream_ends_after_error() {
        let conn = connection(5);
        conn.fail_after(SQL, 0, "boom");
        let stream = open(&conn, 2).await;
        let items: Vec<_> = stream.into_stream().collect().await;
        assert_eq!(items.len(), 1);
        assert!(items[0].is_err());
    }
}
