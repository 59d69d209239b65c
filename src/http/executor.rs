use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::query::decode_response;
use super::transport::HttpTransport;
use super::{BATCH_PATH, EXECUTE_PATH};
use crate::batch::{collect_results, compile_sequential, compile_transactional};
use crate::error::{ErrorCode, LibsqlError};
use crate::proto::{BatchReq, BatchResp, ExecuteReq, ExecuteResp};
use crate::results::{ResultSet, build_result_set};
use crate::statement::{Statement, encode_all, encode_script};
use crate::ws::Transaction;
use crate::types::{IntMode, TransactionMode};

struct Inner {
    transport: Arc<dyn HttpTransport>,
    int_mode: IntMode,
    closed: AtomicBool,
}

/// Stateless client: every call is an independent request, so no server-side state survives
/// between calls and interactive transactions are not available.
#[derive(Clone)]
pub struct HttpClient {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("int_mode", &self.inner.int_mode)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl HttpClient {
    #[must_use]
    pub fn new(transport: Arc<dyn HttpTransport>, int_mode: IntMode) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                int_mode,
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Build a client over `reqwest` for an `http:` / `https:` configuration.
    ///
    /// # Errors
    ///
    /// `TRANSPORT_ERROR` if the HTTP client cannot be initialised.
    #[cfg(feature = "http")]
    pub fn connect(config: &crate::config::ExpandedConfig) -> Result<Self, LibsqlError> {
        let transport =
            super::transport::ReqwestTransport::new(config.url.clone(), config.auth_token.clone())?;
        Ok(Self::new(Arc::new(transport), config.int_mode))
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> Result<(), LibsqlError> {
        if self.is_closed() {
            Err(LibsqlError::client_closed())
        } else {
            Ok(())
        }
    }

    async fn send<Req, Resp>(&self, path: &str, request: &Req) -> Result<Resp, LibsqlError>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        self.ensure_open()?;
        let body = serde_json::to_string(request)?;
        tracing::debug!(path, bytes = body.len(), "sending request");
        let response = self.inner.transport.post(path, body).await?;
        // A close() issued while the request was in flight fails the call.
        self.ensure_open()?;
        decode_response(response)
    }

    /// Execute a single statement.
    ///
    /// # Errors
    ///
    /// `CLIENT_CLOSED`, argument errors, transport errors, or the statement's own error.
    pub async fn execute(&self, stmt: impl Into<Statement>) -> Result<ResultSet, LibsqlError> {
        self.ensure_open()?;
        let stmt = stmt.into().to_proto()?;
        let response: ExecuteResp = self.send(EXECUTE_PATH, &ExecuteReq { stmt }).await?;
        build_result_set(response.result, self.inner.int_mode)
    }

    /// Execute statements atomically in one request.
    ///
    /// # Errors
    ///
    /// The first failing step; the compiled ROLLBACK step has undone every statement.
    pub async fn batch<I, S>(&self, mode: TransactionMode, stmts: I) -> Result<Vec<ResultSet>, LibsqlError>
    where
        I: IntoIterator<Item = S>,
        S: Into<Statement>,
    {
        self.ensure_open()?;
        let compiled = compile_transactional(mode, encode_all(stmts)?)?;
        let response: BatchResp = self
            .send(
                BATCH_PATH,
                &BatchReq {
                    batch: compiled.batch.clone(),
                },
            )
            .await?;
        collect_results(&compiled, response.result, self.inner.int_mode)
    }

    /// Run a semicolon-separated script, stopping at the first failing statement.
    /// Statements are not wrapped in a transaction.
    ///
    /// # Errors
    ///
    /// The first failing statement's error.
    pub async fn execute_multiple(&self, sql: &str) -> Result<(), LibsqlError> {
        self.ensure_open()?;
        let compiled = compile_sequential(encode_script(sql))?;
        let response: BatchResp = self
            .send(
                BATCH_PATH,
                &BatchReq {
                    batch: compiled.batch.clone(),
                },
            )
            .await?;
        collect_results(&compiled, response.result, self.inner.int_mode).map(|_| ())
    }

    /// Always fails: the stateless transport cannot hold a transaction open across requests.
    ///
    /// # Errors
    ///
    /// `TRANSACTIONS_NOT_SUPPORTED`, or `CLIENT_CLOSED` after `close()`.
    #[allow(clippy::unused_async)]
    pub async fn transaction(&self, _mode: TransactionMode) -> Result<Transaction, LibsqlError> {
        self.ensure_open()?;
        Err(LibsqlError::new(
            ErrorCode::TransactionsNotSupported,
            "Interactive transactions are not supported over HTTP; use batch() or a ws/libsql URL",
        ))
    }

    /// Mark the client closed. Later calls, and calls still in flight, fail with `CLIENT_CLOSED`.
    pub fn close(&self) {
        if !self.inner.closed.swap(true, Ordering::AcqRel) {
            tracing::debug!("http client closed");
        }
    }
}
