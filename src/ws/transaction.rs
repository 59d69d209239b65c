use std::sync::atomic::{AtomicBool, Ordering};

use super::executor::{WsClient, release};
use super::stream::Stream;
use crate::batch::{collect_results, compile_sequential};
use crate::error::LibsqlError;
use crate::proto::Stmt;
use crate::results::{ResultSet, build_result_set};
use crate::statement::{Statement, encode_all, encode_script};

/// An interactive transaction pinned to one server-side stream.
///
/// A failing statement leaves the transaction open; the caller decides whether to continue,
/// commit or roll back. After `commit`, `rollback` or `close` every call fails with
/// `TRANSACTION_CLOSED`. Dropping an open transaction releases its stream in the background,
/// which rolls it back.
///
/// ```rust,no_run
/// # use libsql_client::prelude::*;
/// # async fn demo(client: Client) -> Result<(), LibsqlError> {
/// let tx = client.transaction(TransactionMode::Write).await?;
/// tx.execute(("INSERT INTO users (name) VALUES (?)", vec!["ada"])).await?;
/// tx.commit().await?;
/// # Ok(())
/// # }
/// ```
pub struct Transaction {
    client: WsClient,
    stream: Stream,
    closed: AtomicBool,
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("stream", &self.stream)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Transaction {
    pub(crate) fn new(client: WsClient, stream: Stream) -> Self {
        Self {
            client,
            stream,
            closed: AtomicBool::new(false),
        }
    }

    /// True after `commit`, `rollback` or `close`, or once the owning client is closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire) || self.client.is_closed()
    }

    fn ensure_open(&self) -> Result<(), LibsqlError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(LibsqlError::transaction_closed());
        }
        self.client.ensure_open()
    }

    /// # Errors
    ///
    /// `TRANSACTION_CLOSED`, `CLIENT_CLOSED`, or the statement's own error.
    pub async fn execute(&self, stmt: impl Into<Statement>) -> Result<ResultSet, LibsqlError> {
        self.ensure_open()?;
        let stmt = stmt.into().to_proto()?;
        let result = self.stream.execute(stmt).await?;
        // Closing while the statement was in flight fails the call.
        self.ensure_open()?;
        build_result_set(result, self.client.int_mode())
    }

    /// Run statements in order inside the transaction, stopping at the first failure. Earlier
    /// statements stay applied until the transaction is rolled back.
    ///
    /// # Errors
    ///
    /// `TRANSACTION_CLOSED`, `CLIENT_CLOSED`, or the first failing statement's error.
    pub async fn batch<I, S>(&self, stmts: I) -> Result<Vec<ResultSet>, LibsqlError>
    where
        I: IntoIterator<Item = S>,
        S: Into<Statement>,
    {
        self.ensure_open()?;
        let compiled = compile_sequential(encode_all(stmts)?)?;
        let result = self.stream.batch(compiled.batch.clone()).await?;
        self.ensure_open()?;
        collect_results(&compiled, result, self.client.int_mode())
    }

    /// # Errors
    ///
    /// `TRANSACTION_CLOSED`, `CLIENT_CLOSED`, or the first failing statement's error.
    pub async fn execute_multiple(&self, sql: &str) -> Result<(), LibsqlError> {
        self.ensure_open()?;
        let compiled = compile_sequential(encode_script(sql))?;
        let result = self.stream.batch(compiled.batch.clone()).await?;
        self.ensure_open()?;
        collect_results(&compiled, result, self.client.int_mode()).map(|_| ())
    }

    /// Commit and close the transaction.
    ///
    /// # Errors
    ///
    /// `TRANSACTION_CLOSED` if already finished, or the error of `COMMIT`. The transaction is
    /// closed either way.
    pub async fn commit(&self) -> Result<(), LibsqlError> {
        self.finish("COMMIT").await
    }

    /// Roll back and close the transaction.
    ///
    /// # Errors
    ///
    /// `TRANSACTION_CLOSED` if already finished, or the error of `ROLLBACK`.
    pub async fn rollback(&self) -> Result<(), LibsqlError> {
        self.finish("ROLLBACK").await
    }

    async fn finish(&self, sql: &str) -> Result<(), LibsqlError> {
        self.ensure_open()?;
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(LibsqlError::transaction_closed());
        }
        tracing::debug!(stream_id = self.stream.id(), sql, "finishing transaction");
        let outcome = self.stream.execute(Stmt::bare(sql)).await.map(|_| ());
        release(&self.stream).await;
        outcome
    }

    /// Release the transaction without committing. The server rolls back anything not
    /// committed. Calling it again is a no-op.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        tracing::debug!(stream_id = self.stream.id(), "closing transaction");
        release(&self.stream).await;
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            tracing::debug!(stream_id = self.stream.id(), "open transaction dropped");
            self.stream.close_detached();
        }
    }
}
