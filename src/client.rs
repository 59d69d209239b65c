use std::sync::Arc;

use crate::config::{Config, Protocol};
use crate::error::{ErrorCode, LibsqlError};
use crate::http::{HttpClient, HttpTransport};
use crate::results::ResultSet;
use crate::statement::Statement;
use crate::types::{IntMode, TransactionMode};
use crate::ws::{StreamTransport, Transaction, WsClient};

/// Unified client over either transport. The variant is chosen once, from the URL scheme, when
/// the client is created.
///
/// ```rust,no_run
/// use libsql_client::prelude::*;
///
/// # async fn demo() -> Result<(), LibsqlError> {
/// let client = Client::connect(&Config::new("libsql://db.example.com").with_auth_token("...")).await?;
/// let rs = client.execute("SELECT 1 AS one").await?;
/// assert_eq!(rs.rows[0]["one"], Value::Integer(1));
/// client.close().await;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub enum Client {
    Http(HttpClient),
    Ws(WsClient),
}

impl Client {
    /// Validate `config` and connect.
    ///
    /// # Errors
    ///
    /// Configuration errors are raised before any network activity; then `TRANSPORT_ERROR` if
    /// the connection fails, or `URL_SCHEME_NOT_SUPPORTED` when the transport was compiled out.
    pub async fn connect(config: &Config) -> Result<Self, LibsqlError> {
        let expanded = config.expand()?;
        tracing::debug!(url = %expanded.url, protocol = expanded.scheme.protocol().as_str(), "connecting");
        match expanded.scheme.protocol() {
            #[cfg(feature = "http")]
            Protocol::Http => Ok(Client::Http(HttpClient::connect(&expanded)?)),
            #[cfg(feature = "ws")]
            Protocol::Ws => Ok(Client::Ws(WsClient::connect(&expanded).await?)),
            #[allow(unreachable_patterns)]
            other => Err(LibsqlError::new(
                ErrorCode::UrlSchemeNotSupported,
                format!(
                    "The {:?} transport is not enabled in this build",
                    other.as_str()
                ),
            )),
        }
    }

    /// Stateless client over a caller-supplied transport.
    #[must_use]
    pub fn from_http(transport: Arc<dyn HttpTransport>, int_mode: IntMode) -> Self {
        Client::Http(HttpClient::new(transport, int_mode))
    }

    /// Stateful client over a caller-supplied connection.
    #[must_use]
    pub fn from_ws(conn: Arc<dyn StreamTransport>, int_mode: IntMode) -> Self {
        Client::Ws(WsClient::new(conn, int_mode))
    }

    #[must_use]
    pub fn protocol(&self) -> Protocol {
        match self {
            Client::Http(_) => Protocol::Http,
            Client::Ws(_) => Protocol::Ws,
        }
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        match self {
            Client::Http(c) => c.is_closed(),
            Client::Ws(c) => c.is_closed(),
        }
    }

    /// Execute one statement.
    ///
    /// # Errors
    ///
    /// `CLIENT_CLOSED`, argument or coercion errors, transport errors, or the statement's error.
    pub async fn execute(&self, stmt: impl Into<Statement>) -> Result<ResultSet, LibsqlError> {
        match self {
            Client::Http(c) => c.execute(stmt).await,
            Client::Ws(c) => c.execute(stmt).await,
        }
    }

    /// Execute statements atomically and in order: either every statement takes effect or none
    /// does.
    ///
    /// # Errors
    ///
    /// The first failing statement's error, after the whole batch was rolled back.
    pub async fn batch<I, S>(
        &self,
        mode: TransactionMode,
        stmts: I,
    ) -> Result<Vec<ResultSet>, LibsqlError>
    where
        I: IntoIterator<Item = S>,
        S: Into<Statement>,
    {
        match self {
            Client::Http(c) => c.batch(mode, stmts).await,
            Client::Ws(c) => c.batch(mode, stmts).await,
        }
    }

    /// Run a semicolon-separated script without a transaction.
    ///
    /// # Errors
    ///
    /// The first failing statement's error; earlier statements stay applied.
    pub async fn execute_multiple(&self, sql: &str) -> Result<(), LibsqlError> {
        match self {
            Client::Http(c) => c.execute_multiple(sql).await,
            Client::Ws(c) => c.execute_multiple(sql).await,
        }
    }

    /// Start an interactive transaction.
    ///
    /// # Errors
    ///
    /// `TRANSACTIONS_NOT_SUPPORTED` on the stateless transport, `CLIENT_CLOSED`, or the error of
    /// `BEGIN`.
    pub async fn transaction(&self, mode: TransactionMode) -> Result<Transaction, LibsqlError> {
        match self {
            Client::Http(c) => c.transaction(mode).await,
            Client::Ws(c) => c.transaction(mode).await,
        }
    }

    /// Close the client. Calls in flight and every later call fail with `CLIENT_CLOSED`.
    pub async fn close(&self) {
        match self {
            Client::Http(c) => c.close(),
            Client::Ws(c) => c.close().await,
        }
    }
}
