//! Transaction handle for explicit transaction control.
//!
//! Provides RAII-style transaction management. DuckDB has a single
//! transaction per connection, so nested transactions are rejected.

use std::sync::atomic::{AtomicBool, Ordering};

use duckql_sql::{CompiledQuery, Query};

use crate::client::{Client, QueryResult};
use crate::error::{ClientError, ClientResult};
use crate::stream::RowStream;

/// A transaction handle.
///
/// If the transaction is neither committed nor rolled back, dropping it
/// schedules a rollback that the client runs before its next operation.
pub struct Transaction<'a> {
    /// Reference to the client.
    client: &'a Client,
    /// Transaction ID.
    txn_id: u64,
    /// Whether the transaction is finished.
    finished: AtomicBool,
}

impl<'a> Transaction<'a> {
    /// Creates a new transaction handle.
    pub(crate) fn new(client: &'a Client, txn_id: u64) -> Self {
        Self {
            client,
            txn_id,
            finished: AtomicBool::new(false),
        }
    }

    /// Returns the transaction ID.
    pub fn id(&self) -> u64 {
        self.txn_id
    }

    /// Returns true if the transaction is still active.
    pub fn is_active(&self) -> bool {
        !self.finished.load(Ordering::Relaxed)
    }

    /// Executes a query within this transaction.
    pub async fn execute(&self, query: &Query) -> ClientResult<QueryResult> {
        self.ensure_active()?;
        self.client.execute(query).await
    }

    /// Executes a compiled query within this transaction.
    pub async fn execute_compiled(&self, query: &CompiledQuery) -> ClientResult<QueryResult> {
        self.ensure_active()?;
        self.client.execute_compiled(query).await
    }

    /// Opens a row stream within this transaction.
    pub async fn stream(&self, query: &Query) -> ClientResult<RowStream> {
        self.ensure_active()?;
        self.client.stream(query).await
    }

    /// Commits the transaction.
    pub async fn commit(self) -> ClientResult<()> {
        self.ensure_active()?;
        self.finished.store(true, Ordering::Relaxed);
        self.client.commit_transaction(self.txn_id).await
    }

    /// Rolls back the transaction.
    pub async fn rollback(self) -> ClientResult<()> {
        self.ensure_active()?;
        self.finished.store(true, Ordering::Relaxed);
        self.client.rollback_transaction(self.txn_id).await
    }

    /// Ensures the transaction is active.
    fn ensure_active(&self) -> ClientResult<()> {
        if self.finished.load(Ordering::Relaxed) {
            return Err(ClientError::TransactionError(
                "transaction already finished".to_string(),
            ));
        }
        Ok(())
    }
}

impl<'a> Drop for Transaction<'a> {
    fn drop(&mut self) {
        if !self.finished.swap(true, Ordering::Relaxed) {
            // Drop cannot await; the client rolls back on its next operation.
            self.client.schedule_rollback(self.txn_id);
        }
    }
}

impl<'a> std::fmt::Debug for Transaction<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.txn_id)
            .field("active", &self.is_active())
            .finish()
    }
}

/// Extension trait for running code in a transaction.
pub trait TransactionExt {
    /// Runs a closure within a transaction.
    ///
    /// If the closure returns Ok, the transaction is committed.
    /// If the closure returns Err, the transaction is rolled back.
    fn run_transaction<F, T, E>(&self, f: F) -> impl std::future::Future<Output = Result<T, E>>
    where
        F: for<'a> FnOnce(
            &'a Transaction<'a>,
        ) -> std::pin::Pin<
            Box<dyn std::future::Future<Output = Result<T, E>> + Send + 'a>,
        >,
        T: Send,
        E: From<ClientError> + Send;
}

impl TransactionExt for Client {
    async fn run_transaction<F, T, E>(&self, f: F) -> Result<T, E>
    where
        F: for<'a> FnOnce(
            &'a Transaction<'a>,
        ) -> std::pin::Pin<
            Box<dyn std::future::Future<Output = Result<T, E>> + Send + 'a>,
        >,
        T: Send,
        E: From<ClientError> + Send,
    {
        let txn = self.begin().await?;
        let txn_id = txn.id();

        let outcome = f(&txn).await;
        match outcome {
            Ok(value) => txn.commit().await.map(|()| value).map_err(E::from),
            Err(body_err) => {
                // The body's error is returned; a failed rollback is only logged.
                if let Err(rollback_err) = txn.rollback().await {
                    tracing::warn!(txn_id, error = %rollback_err, "rollback after failed transaction body failed");
                }
                Err(body_err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::ClientConfig;
    use crate::memory::MemoryConnection;

    fn setup() -> (MemoryConnection, Client) {
        let conn = MemoryConnection::new();
        let client = Client::new(Arc::new(conn.clone()), ClientConfig::default()).unwrap();
        (conn, client)
    }

    #[tokio::test]
    async fn test_transaction_commit() {
        let (conn, client) = setup();

        let txn = client.begin().await.unwrap();
        assert!(txn.is_active());
        assert!(client.in_transaction());
        txn.execute_compiled(&CompiledQuery::raw("insert into t values (1)"))
            .await
            .unwrap();
        txn.commit().await.unwrap();

        assert!(!client.in_transaction());
        assert_eq!(
            conn.executed_sql(),
            vec!["begin transaction", "insert into t values (1)", "commit"]
        );
        assert_eq!(client.stats().commits, 1);
    }

    #[tokio::test]
    async fn test_transaction_rollback() {
        let (conn, client) = setup();

        let txn = client.begin().await.unwrap();
        txn.rollback().await.unwrap();
        assert!(!client.in_transaction());
        assert_eq!(conn.executed_sql(), vec!["begin transaction", "rollback"]);
    }

    #[tokio::test]
    async fn test_nested_transaction_rejected() {
        let (_conn, client) = setup();

        let txn = client.begin().await.unwrap();
        assert!(matches!(
            client.begin().await,
            Err(ClientError::TransactionActive)
        ));
        txn.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_dropped_transaction_rolls_back_before_next_operation() {
        let (conn, client) = setup();

        {
            let _txn = client.begin().await.unwrap();
        }
        assert!(!client.in_transaction());

        client.execute_sql("select 1").await.unwrap();
        assert_eq!(
            conn.executed_sql(),
            vec!["begin transaction", "rollback", "select 1"]
        );
        assert_eq!(client.stats().rollbacks, 1);

        // A new transaction can start afterwards.
        client.begin().await.unwrap().commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_run_transaction_commit() {
        let (conn, client) = setup();

        let result: Result<i32, ClientError> = client
            .run_transaction(|txn| {
                Box::pin(async move {
                    txn.execute_compiled(&CompiledQuery::raw("select 1")).await?;
                    Ok(42)
                })
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert!(!client.in_transaction());
        assert_eq!(conn.executed_sql().last().map(String::as_str), Some("commit"));
    }

    #[tokio::test]
    async fn test_run_transaction_rollback() {
        let (conn, client) = setup();

        let result: Result<i32, ClientError> = client
            .run_transaction(|_txn| {
                Box::pin(async move { Err(ClientError::QueryFailed("test error".to_string())) })
            })
            .await;

        assert!(result.is_err());
        assert!(!client.in_transaction());
        assert_eq!(conn.executed_sql().last().map(String::as_str), Some("rollback"));
    }

    #[tokio::test]
    async fn test_run_transaction_keeps_body_error_when_rollback_fails() {
        let (conn, client) = setup();
        conn.fail_execute("rollback", "connection lost");

        let result: Result<i32, ClientError> = client
            .run_transaction(|_txn| {
                Box::pin(async move { Err(ClientError::QueryFailed("body failed".to_string())) })
            })
            .await;

        assert!(matches!(result, Err(ClientError::QueryFailed(ref m)) if m == "body failed"));
        assert!(!client.in_transaction());
        assert_eq!(conn.executed_sql(), vec!["begin transaction", "rollback"]);

        conn.clear_failure("rollback");
        client.begin().await.unwrap().commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_close_rolls_back_open_transaction() {
        let (conn, client) = setup();
        let txn = client.begin().await.unwrap();
        std::mem::forget(txn);

        client.close().await.unwrap();
        assert_eq!(conn.executed_sql(), vec!["begin transaction", "rollback"]);
        assert!(conn.is_closed());
    }
}
