use std::fmt;

use thiserror::Error;

/// Taxonomy key attached to every [`LibsqlError`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    UrlSchemeNotSupported,
    UrlParamNotSupported,
    UrlInvalid,
    ClientClosed,
    TransactionClosed,
    TransactionsNotSupported,
    ServerError,
    /// Programmer error, e.g. binding an unset value
    TypeError,
    /// A value that cannot be mapped to or from the wire
    CoercionError,
    /// Malformed statement arguments
    ArgsInvalid,
    /// The peer sent something this client cannot decode
    ProtocolError,
    /// Connection-level failure (socket, HTTP client, stream)
    TransportError,
    Unknown,
    /// A code reported by the server or transport, passed through verbatim
    Other(String),
}

impl ErrorCode {
    /// Map a code string reported on the wire to a taxonomy key.
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        match code {
            "URL_SCHEME_NOT_SUPPORTED" => ErrorCode::UrlSchemeNotSupported,
            "URL_PARAM_NOT_SUPPORTED" => ErrorCode::UrlParamNotSupported,
            "URL_INVALID" => ErrorCode::UrlInvalid,
            "CLIENT_CLOSED" => ErrorCode::ClientClosed,
            "TRANSACTION_CLOSED" => ErrorCode::TransactionClosed,
            "TRANSACTIONS_NOT_SUPPORTED" => ErrorCode::TransactionsNotSupported,
            "SERVER_ERROR" => ErrorCode::ServerError,
            "TYPE_ERROR" => ErrorCode::TypeError,
            "COERCION_ERROR" => ErrorCode::CoercionError,
            "ARGS_INVALID" => ErrorCode::ArgsInvalid,
            "PROTOCOL_ERROR" => ErrorCode::ProtocolError,
            "TRANSPORT_ERROR" => ErrorCode::TransportError,
            "UNKNOWN" | "" => ErrorCode::Unknown,
            other => ErrorCode::Other(other.to_owned()),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            ErrorCode::UrlSchemeNotSupported => "URL_SCHEME_NOT_SUPPORTED",
            ErrorCode::UrlParamNotSupported => "URL_PARAM_NOT_SUPPORTED",
            ErrorCode::UrlInvalid => "URL_INVALID",
            ErrorCode::ClientClosed => "CLIENT_CLOSED",
            ErrorCode::TransactionClosed => "TRANSACTION_CLOSED",
            ErrorCode::TransactionsNotSupported => "TRANSACTIONS_NOT_SUPPORTED",
            ErrorCode::ServerError => "SERVER_ERROR",
            ErrorCode::TypeError => "TYPE_ERROR",
            ErrorCode::CoercionError => "COERCION_ERROR",
            ErrorCode::ArgsInvalid => "ARGS_INVALID",
            ErrorCode::ProtocolError => "PROTOCOL_ERROR",
            ErrorCode::TransportError => "TRANSPORT_ERROR",
            ErrorCode::Unknown => "UNKNOWN",
            ErrorCode::Other(code) => code,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single error type returned by every public operation.
///
/// Transport, codec and protocol failures are all converted into this type before they
/// reach the caller; converting a `LibsqlError` again returns it unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct LibsqlError {
    message: String,
    code: ErrorCode,
}

impl LibsqlError {
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code,
        }
    }

    /// Build from a `{message, code}` pair reported by the server. A missing code becomes
    /// `SERVER_ERROR`.
    #[must_use]
    pub fn from_server(message: impl Into<String>, code: Option<&str>) -> Self {
        let code = match code {
            Some(code) if !code.is_empty() => ErrorCode::from_code(code),
            _ => ErrorCode::ServerError,
        };
        Self::new(code, message)
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn code(&self) -> &ErrorCode {
        &self.code
    }

    pub(crate) fn client_closed() -> Self {
        Self::new(ErrorCode::ClientClosed, "The client is closed")
    }

    pub(crate) fn transaction_closed() -> Self {
        Self::new(
            ErrorCode::TransactionClosed,
            "The transaction is closed due to `commit()`, `rollback()` or `close()`",
        )
    }

    pub(crate) fn coercion(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::CoercionError, message)
    }

    pub(crate) fn protocol(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ProtocolError, message)
    }

    pub(crate) fn transport(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::TransportError, message)
    }
}

/// Map any failure into the uniform error type.
///
/// Idempotent: a `LibsqlError` passes through untouched.
pub fn map_error<E: Into<LibsqlError>>(err: E) -> LibsqlError {
    err.into()
}

impl From<serde_json::Error> for LibsqlError {
    fn from(err: serde_json::Error) -> Self {
        LibsqlError::protocol(format!("Could not decode message: {err}"))
    }
}

impl From<base64::DecodeError> for LibsqlError {
    fn from(err: base64::DecodeError) -> Self {
        LibsqlError::protocol(format!("Invalid base64 in blob value: {err}"))
    }
}

impl From<url::ParseError> for LibsqlError {
    fn from(err: url::ParseError) -> Self {
        LibsqlError::new(ErrorCode::UrlInvalid, format!("The URL is not in a valid format: {err}"))
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for LibsqlError {
    fn from(err: reqwest::Error) -> Self {
        LibsqlError::transport(format!("HTTP request failed: {err}"))
    }
}

#[cfg(feature = "ws")]
impl From<tokio_tungstenite::tungstenite::Error> for LibsqlError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        LibsqlError::transport(format!("WebSocket error: {err}"))
    }
}
