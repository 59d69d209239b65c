use std::sync::Arc;

use crate::error::LibsqlError;
use crate::proto::{Batch, BatchResult, Request, Response, Stmt, StmtResult};
use crate::ws::transport::StreamTransport;

/// A server-side stream. Statements on one stream run in order on one SQL connection, which is
/// what keeps an interactive transaction alive between calls.
pub struct Stream {
    conn: Arc<dyn StreamTransport>,
    id: i32,
}

impl std::fmt::Debug for Stream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stream").field("id", &self.id).finish()
    }
}

fn unexpected(expected: &str, got: &Response) -> LibsqlError {
    LibsqlError::protocol(format!("Expected a {expected} response, got {got:?}"))
}

impl Stream {
    /// # Errors
    ///
    /// Transport errors, or the server's refusal to open the stream.
    pub async fn open(conn: Arc<dyn StreamTransport>, id: i32) -> Result<Self, LibsqlError> {
        tracing::debug!(stream_id = id, "opening stream");
        match conn.request(Request::OpenStream { stream_id: id }).await? {
            Response::OpenStream => Ok(Self { conn, id }),
            other => Err(unexpected("open_stream", &other)),
        }
    }

    #[must_use]
    pub fn id(&self) -> i32 {
        self.id
    }

    /// # Errors
    ///
    /// Transport errors or the statement's error.
    pub async fn execute(&self, stmt: Stmt) -> Result<StmtResult, LibsqlError> {
        tracing::debug!(stream_id = self.id, "execute");
        match self
            .conn
            .request(Request::Execute {
                stream_id: self.id,
                stmt,
            })
            .await?
        {
            Response::Execute { result } => Ok(result),
            other => Err(unexpected("execute", &other)),
        }
    }

    /// # Errors
    ///
    /// Transport errors. Step errors are part of the returned result.
    pub async fn batch(&self, batch: Batch) -> Result<BatchResult, LibsqlError> {
        tracing::debug!(stream_id = self.id, steps = batch.steps.len(), "batch");
        match self
            .conn
            .request(Request::Batch {
                stream_id: self.id,
                batch,
            })
            .await?
        {
            Response::Batch { result } => Ok(result),
            other => Err(unexpected("batch", &other)),
        }
    }

    /// Release the stream; the server rolls back any transaction still open on it.
    ///
    /// # Errors
    ///
    /// Transport errors. Nothing is sent once the connection is closed.
    pub async fn close(&self) -> Result<(), LibsqlError> {
        if self.conn.is_closed() {
            return Ok(());
        }
        tracing::debug!(stream_id = self.id, "closing stream");
        match self
            .conn
            .request(Request::CloseStream { stream_id: self.id })
            .await?
        {
            Response::CloseStream => Ok(()),
            other => Err(unexpected("close_stream", &other)),
        }
    }

    /// Close without waiting, for use from `Drop`.
    pub(crate) fn close_detached(&self) {
        if self.conn.is_closed() {
            return;
        }
        let conn = self.conn.clone();
        let stream_id = self.id;
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                if let Err(err) = conn.request(Request::CloseStream { stream_id }).await {
                    tracing::warn!(stream_id, "failed to close dropped stream: {err}");
                }
            });
        }
    }
}
