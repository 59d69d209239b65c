use serde::de::DeserializeOwned;

use crate::error::{ErrorCode, LibsqlError};
use crate::http::HttpResponse;
use crate::proto::ProtoError;

/// Decode a successful response body, or map a failed one to a `LibsqlError`.
///
/// A failed response carries either a `{message, code}` body (mapped directly), plain text
/// (`SERVER_ERROR` with status and text) or nothing (`SERVER_ERROR` with the status).
///
/// # Errors
///
/// The mapped server error, or `PROTOCOL_ERROR` when a success body cannot be decoded.
pub fn decode_response<T: DeserializeOwned>(response: HttpResponse) -> Result<T, LibsqlError> {
    if response.is_success() {
        return Ok(serde_json::from_str(&response.body)?);
    }

    let status = response.status;
    let body = response.body.trim();
    if body.is_empty() {
        return Err(LibsqlError::new(
            ErrorCode::ServerError,
            format!("Server returned HTTP status {status}"),
        ));
    }
    if let Ok(err) = serde_json::from_str::<ProtoError>(body) {
        return Err(LibsqlError::from_server(err.message, err.code.as_deref()));
    }
    Err(LibsqlError::new(
        ErrorCode::ServerError,
        format!("Server returned HTTP status {status} and error: {body}"),
    ))
}
