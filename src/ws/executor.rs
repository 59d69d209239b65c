use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

use super::stream::Stream;
use super::transaction::Transaction;
use super::transport::StreamTransport;
use crate::batch::{collect_results, compile_sequential, compile_transactional};
use crate::error::LibsqlError;
use crate::proto::Batch;
use crate::results::{ResultSet, build_result_set};
use crate::statement::{Statement, encode_all, encode_script};
use crate::types::{IntMode, TransactionMode};

struct Inner {
    conn: Arc<dyn StreamTransport>,
    int_mode: IntMode,
    closed: AtomicBool,
    next_stream_id: AtomicI32,
}

/// Stateful client over one long-lived connection.
///
/// Each `execute`/`batch` call runs on a fresh server-side stream that is released afterwards,
/// so no session state leaks between calls. [`WsClient::transaction`] pins a stream for the
/// lifetime of the transaction.
#[derive(Clone)]
pub struct WsClient {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for WsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsClient")
            .field("int_mode", &self.inner.int_mode)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl WsClient {
    #[must_use]
    pub fn new(conn: Arc<dyn StreamTransport>, int_mode: IntMode) -> Self {
        Self {
            inner: Arc::new(Inner {
                conn,
                int_mode,
                closed: AtomicBool::new(false),
                next_stream_id: AtomicI32::new(1),
            }),
        }
    }

    /// Open a WebSocket for a `ws:` / `wss:` configuration.
    ///
    /// # Errors
    ///
    /// `TRANSPORT_ERROR` if the connection cannot be established.
    #[cfg(feature = "ws")]
    pub async fn connect(config: &crate::config::ExpandedConfig) -> Result<Self, LibsqlError> {
        let conn =
            super::transport::WebSocketTransport::connect(&config.url, config.auth_token.clone())
                .await?;
        Ok(Self::new(Arc::new(conn), config.int_mode))
    }

    /// True once [`WsClient::close`] was called or the connection was lost.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire) || self.inner.conn.is_closed()
    }

    pub(crate) fn ensure_open(&self) -> Result<(), LibsqlError> {
        if self.inner.closed.load(Ordering::Acquire) {
            return Err(LibsqlError::client_closed());
        }
        if self.inner.conn.is_closed() {
            return Err(LibsqlError::transport("The WebSocket connection is closed"));
        }
        Ok(())
    }

    pub(crate) fn int_mode(&self) -> IntMode {
        self.inner.int_mode
    }

    async fn open_stream(&self) -> Result<Stream, LibsqlError> {
        self.ensure_open()?;
        let id = self.inner.next_stream_id.fetch_add(1, Ordering::Relaxed);
        Stream::open(self.inner.conn.clone(), id).await
    }

    /// Run `batch` on a throwaway stream, releasing it whatever the outcome.
    async fn run_batch(&self, batch: Batch) -> Result<crate::proto::BatchResult, LibsqlError> {
        let stream = self.open_stream().await?;
        let result = stream.batch(batch).await;
        release(&stream).await;
        let result = result?;
        self.ensure_open()?;
        Ok(result)
    }

    /// Execute a single statement on a fresh stream.
    ///
    /// # Errors
    ///
    /// `CLIENT_CLOSED`, argument errors, transport errors, or the statement's own error.
    pub async fn execute(&self, stmt: impl Into<Statement>) -> Result<ResultSet, LibsqlError> {
        self.ensure_open()?;
        let stmt = stmt.into().to_proto()?;
        let stream = self.open_stream().await?;
        let result = stream.execute(stmt).await;
        release(&stream).await;
        let result = result?;
        self.ensure_open()?;
        build_result_set(result, self.inner.int_mode)
    }

    /// Execute statements atomically as one compiled step graph.
    ///
    /// # Errors
    ///
    /// The first failing step; nothing the batch wrote is kept.
    pub async fn batch<I, S>(
        &self,
        mode: TransactionMode,
        stmts: I,
    ) -> Result<Vec<ResultSet>, LibsqlError>
    where
        I: IntoIterator<Item = S>,
        S: Into<Statement>,
    {
        self.ensure_open()?;
        let compiled = compile_transactional(mode, encode_all(stmts)?)?;
        let result = self.run_batch(compiled.batch.clone()).await?;
        collect_results(&compiled, result, self.inner.int_mode)
    }

    /// Run a semicolon-separated script without a surrounding transaction, stopping at the
    /// first failing statement.
    ///
    /// # Errors
    ///
    /// The first failing statement's error.
    pub async fn execute_multiple(&self, sql: &str) -> Result<(), LibsqlError> {
        self.ensure_open()?;
        let compiled = compile_sequential(encode_script(sql))?;
        let result = self.run_batch(compiled.batch.clone()).await?;
        collect_results(&compiled, result, self.inner.int_mode).map(|_| ())
    }

    /// Start an interactive transaction on its own stream.
    ///
    /// # Errors
    ///
    /// `CLIENT_CLOSED`, transport errors, or the error of the `BEGIN` statement.
    pub async fn transaction(&self, mode: TransactionMode) -> Result<Transaction, LibsqlError> {
        let stream = self.open_stream().await?;
        if let Err(err) = stream.execute(crate::proto::Stmt::bare(mode.begin_sql())).await {
            release(&stream).await;
            return Err(err);
        }
        // A close() that raced the BEGIN round trip must not hand out a live handle.
        if let Err(err) = self.ensure_open() {
            release(&stream).await;
            return Err(err);
        }
        tracing::debug!(stream_id = stream.id(), ?mode, "transaction started");
        Ok(Transaction::new(self.clone(), stream))
    }

    /// Close the client and its connection. Open transactions are rolled back by the server;
    /// pending and later calls fail with `CLIENT_CLOSED`.
    pub async fn close(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        tracing::debug!("ws client closed");
        self.inner.conn.close().await;
    }
}

/// Close a stream that served one call; a failure here does not change the call's outcome.
pub(crate) async fn release(stream: &Stream) {
    if let Err(err) = stream.close().await {
        tracing::warn!(stream_id = stream.id(), "failed to close stream: {err}");
    }
}
