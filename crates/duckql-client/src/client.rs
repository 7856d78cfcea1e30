//! The DuckDB client.
//!
//! A [`Client`] compiles queries with its [`DuckDbDialect`], runs them on
//! a [`Connection`], and decodes the results. Operations on one client
//! are serialized; streams opened by it are independent of each other
//! once open.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use duckql_sql::{CompiledQuery, DuckDbDialect, Query, QueryBuilder};
use parking_lot::RwLock;
use tokio::sync::Mutex as AsyncMutex;

use crate::config::ClientConfig;
use crate::connection::{ColumnInfo, Connection, ResultSet};
use crate::error::{ClientError, ClientResult};
use crate::row::Row;
use crate::stream::RowStream;
use crate::transaction::Transaction;
use crate::value::FromValue;

/// A materialized, decoded result.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    /// Column names.
    pub columns: Vec<String>,
    /// Decoded rows.
    pub rows: Vec<Row>,
    /// Number of rows affected (for DML).
    pub rows_affected: u64,
    /// Execution time.
    pub execution_time: Duration,
}

impl QueryResult {
    /// Decodes every row of `result`.
    pub fn decode(result: ResultSet, execution_time: Duration) -> ClientResult<Self> {
        let names = ColumnInfo::names(&result.columns);
        let rows = result
            .rows
            .into_iter()
            .map(|natives| Row::decode(&result.columns, &names, natives))
            .collect::<ClientResult<Vec<_>>>()?;
        Ok(Self {
            columns: names.to_vec(),
            rows,
            rows_affected: result.rows_affected,
            execution_time,
        })
    }

    /// Returns true if the result has rows.
    pub fn has_rows(&self) -> bool {
        !self.rows.is_empty()
    }

    /// Returns the number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Returns the number of columns.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Returns the first row.
    pub fn first(&self) -> Option<&Row> {
        self.rows.first()
    }

    /// Iterates over rows.
    pub fn iter(&self) -> impl Iterator<Item = &Row> {
        self.rows.iter()
    }
}

/// Statistics about client usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientStats {
    /// Total queries executed to completion.
    pub queries_executed: u64,
    /// Streams opened.
    pub streams_opened: u64,
    /// Total query time.
    pub total_query_time_ms: u64,
    /// Number of transactions.
    pub transactions: u64,
    /// Number of committed transactions.
    pub commits: u64,
    /// Number of rolled back transactions.
    pub rollbacks: u64,
}

/// Transaction bookkeeping.
#[derive(Debug, Default)]
struct ClientInner {
    /// Current transaction ID.
    transaction_id: Option<u64>,
    /// A dropped transaction still needs its rollback.
    rollback_pending: bool,
    /// Set once `close` succeeded.
    closed: bool,
}

/// DuckDB client.
pub struct Client {
    /// Underlying connection.
    connection: Arc<dyn Connection>,
    /// Configuration.
    config: ClientConfig,
    /// Dialect holding the table mapping.
    dialect: DuckDbDialect,
    /// Transaction state.
    inner: RwLock<ClientInner>,
    /// Async lock for operations.
    op_lock: AsyncMutex<()>,
    /// Query counter.
    query_counter: AtomicU64,
    /// Transaction counter.
    txn_counter: AtomicU64,
    /// Statistics.
    stats: RwLock<ClientStats>,
}

impl Client {
    /// Creates a client over `connection`.
    ///
    /// The dialect is built from the configuration's table mappings.
    pub fn new(connection: Arc<dyn Connection>, config: ClientConfig) -> ClientResult<Self> {
        config.validate()?;
        let dialect = DuckDbDialect::new(config.table_mappings.clone());
        tracing::info!(
            database = %config.database,
            mappings = config.table_mappings.len(),
            "client created"
        );
        Ok(Self {
            connection,
            config,
            dialect,
            inner: RwLock::new(ClientInner::default()),
            op_lock: AsyncMutex::new(()),
            query_counter: AtomicU64::new(0),
            txn_counter: AtomicU64::new(0),
            stats: RwLock::new(ClientStats::default()),
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns the dialect.
    pub fn dialect(&self) -> &DuckDbDialect {
        &self.dialect
    }

    /// Returns client statistics.
    pub fn stats(&self) -> ClientStats {
        self.stats.read().clone()
    }

    /// Returns true if in a transaction.
    pub fn in_transaction(&self) -> bool {
        let inner = self.inner.read();
        inner.transaction_id.is_some() && !inner.rollback_pending
    }

    /// Returns true once the client has been closed.
    pub fn is_closed(&self) -> bool {
        self.inner.read().closed
    }

    /// Creates a query builder.
    pub fn query(&self) -> QueryBuilder {
        QueryBuilder::new()
    }

    /// Compiles `query` with this client's dialect.
    pub fn compile(&self, query: &Query) -> ClientResult<CompiledQuery> {
        Ok(self.dialect.compile(query)?)
    }

    // =========================================================================
    // Query Execution
    // =========================================================================

    /// Compiles and executes `query`, decoding the whole result.
    pub async fn execute(&self, query: &Query) -> ClientResult<QueryResult> {
        let compiled = self.compile(query)?;
        self.execute_compiled(&compiled).await
    }

    /// Executes raw SQL without parameters.
    pub async fn execute_sql(&self, sql: &str) -> ClientResult<QueryResult> {
        self.execute_compiled(&CompiledQuery::raw(sql)).await
    }

    /// Executes a compiled query, decoding the whole result.
    pub async fn execute_compiled(&self, query: &CompiledQuery) -> ClientResult<QueryResult> {
        let start = Instant::now();
        let query_id = self.query_counter.fetch_add(1, Ordering::Relaxed);

        let result = {
            let _lock = self.op_lock.lock().await;
            self.run(query).await?
        };
        let result = QueryResult::decode(result, start.elapsed())?;
        let elapsed = start.elapsed();

        tracing::debug!(
            query_id,
            sql = %query.sql,
            params = query.parameters.len(),
            rows = result.row_count(),
            elapsed_us = elapsed.as_micros() as u64,
            "query executed"
        );

        {
            let mut stats = self.stats.write();
            stats.queries_executed += 1;
            stats.total_query_time_ms += elapsed.as_millis() as u64;
        }

        Ok(QueryResult {
            execution_time: elapsed,
            ..result
        })
    }

    /// Executes a query and returns the first column of the first row.
    pub async fn query_one<T: FromValue>(&self, query: &Query) -> ClientResult<Option<T>> {
        let result = self.execute(query).await?;
        Ok(result
            .first()
            .and_then(|row| row.get_index(0))
            .and_then(T::from_value))
    }

    /// Compiles `query` and opens a row stream over it.
    ///
    /// Every call executes the query again on a fresh handle.
    pub async fn stream(&self, query: &Query) -> ClientResult<RowStream> {
        let compiled = self.compile(query)?;
        self.stream_compiled(&compiled).await
    }

    /// Opens a row stream over a compiled query.
    pub async fn stream_compiled(&self, query: &CompiledQuery) -> ClientResult<RowStream> {
        let query_id = self.query_counter.fetch_add(1, Ordering::Relaxed);
        let handle = {
            let _lock = self.op_lock.lock().await;
            self.prepare().await?;
            self.connection
                .open_stream(query, self.config.stream_chunk_size)
                .await?
        };

        tracing::debug!(
            query_id,
            sql = %query.sql,
            params = query.parameters.len(),
            chunk_size = self.config.stream_chunk_size,
            "stream opened"
        );
        self.stats.write().streams_opened += 1;

        Ok(RowStream::new(handle))
    }

    /// Runs a statement. The caller holds `op_lock`.
    async fn run(&self, query: &CompiledQuery) -> ClientResult<ResultSet> {
        self.prepare().await?;
        self.connection.execute(query).await
    }

    /// Checks the client is open and applies a scheduled rollback.
    /// The caller holds `op_lock`.
    async fn prepare(&self) -> ClientResult<()> {
        let pending = {
            let inner = self.inner.read();
            if inner.closed {
                return Err(ClientError::ConnectionClosed);
            }
            inner.rollback_pending
        };
        if pending {
            self.finish_transaction("rollback").await?;
            self.stats.write().rollbacks += 1;
        }
        Ok(())
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    /// Begins a new transaction.
    pub async fn begin(&self) -> ClientResult<Transaction<'_>> {
        let _lock = self.op_lock.lock().await;
        self.prepare().await?;

        if self.inner.read().transaction_id.is_some() {
            return Err(ClientError::TransactionActive);
        }

        self.connection
            .execute(&CompiledQuery::raw("begin transaction"))
            .await
            .map_err(|e| ClientError::TransactionError(e.to_string()))?;

        let txn_id = self.txn_counter.fetch_add(1, Ordering::Relaxed);
        self.inner.write().transaction_id = Some(txn_id);
        self.stats.write().transactions += 1;
        tracing::debug!(txn_id, "transaction started");

        Ok(Transaction::new(self, txn_id))
    }

    /// Commits transaction `txn_id`.
    pub(crate) async fn commit_transaction(&self, txn_id: u64) -> ClientResult<()> {
        let _lock = self.op_lock.lock().await;
        self.ensure_current(txn_id)?;
        self.finish_transaction("commit").await?;
        self.stats.write().commits += 1;
        tracing::debug!(txn_id, "transaction committed");
        Ok(())
    }

    /// Rolls back transaction `txn_id`.
    pub(crate) async fn rollback_transaction(&self, txn_id: u64) -> ClientResult<()> {
        let _lock = self.op_lock.lock().await;
        self.ensure_current(txn_id)?;
        self.finish_transaction("rollback").await?;
        self.stats.write().rollbacks += 1;
        tracing::debug!(txn_id, "transaction rolled back");
        Ok(())
    }

    /// Schedules a rollback of `txn_id` before the next operation.
    pub(crate) fn schedule_rollback(&self, txn_id: u64) {
        let mut inner = self.inner.write();
        if inner.transaction_id == Some(txn_id) && !inner.closed {
            tracing::warn!(txn_id, "transaction dropped without commit, rolling back");
            inner.rollback_pending = true;
        }
    }

    fn ensure_current(&self, txn_id: u64) -> ClientResult<()> {
        let inner = self.inner.read();
        match inner.transaction_id {
            Some(id) if id == txn_id && !inner.rollback_pending => Ok(()),
            _ => Err(ClientError::NoTransaction),
        }
    }

    /// Sends `commit` or `rollback` and clears the transaction state.
    ///
    /// The state is cleared even when the statement fails: DuckDB aborts
    /// the transaction either way.
    async fn finish_transaction(&self, statement: &str) -> ClientResult<()> {
        let result = self
            .connection
            .execute(&CompiledQuery::raw(statement))
            .await;
        {
            let mut inner = self.inner.write();
            inner.transaction_id = None;
            inner.rollback_pending = false;
        }
        result
            .map(|_| ())
            .map_err(|e| ClientError::TransactionError(format!("{} failed: {}", statement, e)))
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Rolls back any open transaction and closes the connection.
    ///
    /// Fails while streams opened by this client are still alive.
    pub async fn close(&self) -> ClientResult<()> {
        let _lock = self.op_lock.lock().await;
        if self.inner.read().closed {
            return Ok(());
        }
        self.prepare().await?;
        if self.inner.read().transaction_id.is_some() {
            self.finish_transaction("rollback").await?;
            self.stats.write().rollbacks += 1;
        }

        self.connection.close().await?;
        self.inner.write().closed = true;
        tracing::info!(
            queries = self.stats.read().queries_executed,
            "client closed"
        );
        Ok(())
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .field("inner", &*self.inner.read())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryConnection;
    use crate::value::Value;
    use duckql_sql::{LogicalType, NativeValue};

    fn setup() -> (MemoryConnection, Client) {
        let conn = MemoryConnection::new();
        let config = ClientConfig::new()
            .stream_chunk_size(2)
            .map_table("users", "read_parquet('users.parquet')");
        let client = Client::new(Arc::new(conn.clone()), config).unwrap();
        (conn, client)
    }

    fn users() -> ResultSet {
        ResultSet::new(
            vec![
                ColumnInfo::new("id", LogicalType::Integer),
                ColumnInfo::new("name", LogicalType::Varchar),
            ],
            vec![
                vec![NativeValue::Integer(1), NativeValue::Varchar("ann".to_string())],
                vec![NativeValue::Integer(2), NativeValue::Varchar("bob".to_string())],
                vec![NativeValue::Integer(3), NativeValue::Varchar("cyd".to_string())],
            ],
        )
    }

    #[tokio::test]
    async fn test_execute_uses_mapping() {
        let (conn, client) = setup();
        conn.register("select * from read_parquet('users.parquet')", users());

        let query = client.query().select_from("users").build();
        let result = client.execute(&query).await.unwrap();

        assert_eq!(result.columns, vec!["id", "name"]);
        assert_eq!(result.row_count(), 3);
        assert_eq!(result.rows[1].get("name"), Some(&Value::from("bob")));
        assert_eq!(client.stats().queries_executed, 1);
    }

    #[tokio::test]
    async fn test_parameters_reach_connection() {
        let (conn, client) = setup();
        let query = client.query().select_from("users").where_eq("id", 2).build();
        client.execute(&query).await.unwrap();

        let executed = conn.executed();
        assert_eq!(
            executed[0].sql,
            "select * from read_parquet('users.parquet') where \"id\" = ?"
        );
        assert_eq!(executed[0].parameters, vec![NativeValue::Integer(2)]);
    }

    #[tokio::test]
    async fn test_query_one() {
        let (conn, client) = setup();
        conn.register("select * from read_parquet('users.parquet')", users());
        let query = client.query().select_from("users").build();
        assert_eq!(client.query_one::<i64>(&query).await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn test_stream_reexecutes() {
        let (conn, client) = setup();
        conn.register("select * from read_parquet('users.parquet')", users());
        let query = client.query().select_from("users").build();

        let first = client.stream(&query).await.unwrap().collect_rows().await.unwrap();
        let second = client.stream(&query).await.unwrap().collect_rows().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(conn.streams_opened(), 2);
        assert_eq!(client.stats().streams_opened, 2);
    }

    #[tokio::test]
    async fn test_compile_error_surfaces() {
        let (_conn, client) = setup();
        let query = client.query().update("users").build();
        assert!(matches!(
            client.execute(&query).await,
            Err(ClientError::Compile(_))
        ));
    }

    #[tokio::test]
    async fn test_close_with_open_stream_fails() {
        let (conn, client) = setup();
        conn.register("select * from read_parquet('users.parquet')", users());
        let query = client.query().select_from("users").build();

        let mut stream = client.stream(&query).await.unwrap();
        stream.next().await.unwrap();
        assert!(matches!(
            client.close().await,
            Err(ClientError::HandlesOutstanding(1))
        ));

        drop(stream);
        client.close().await.unwrap();
        assert!(client.is_closed());
        assert!(matches!(
            client.execute_sql("select 1").await,
            Err(ClientError::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let conn = MemoryConnection::new();
        let config = ClientConfig::new().stream_chunk_size(0);
        assert!(matches!(
            Client::new(Arc::new(conn), config),
            Err(ClientError::InvalidConfig(_))
        ));
    }
}
