//! Stateful transport: a long-lived connection multiplexing server-side streams.
//!
//! - `transport`: the request seam and its `tokio-tungstenite` implementation
//! - `stream`: one server-side stream (a SQL connection on the server)
//! - `executor`: the client operations
//! - `transaction`: interactive transactions pinned to a stream

pub mod executor;
pub mod stream;
pub mod transaction;
pub mod transport;

pub use executor::WsClient;
pub use transaction::Transaction;
#[cfg(feature = "ws")]
pub use transport::WebSocketTransport;
pub use transport::StreamTransport;

/// WebSocket subprotocol spoken by [`WebSocketTransport`].
pub const SUBPROTOCOL: &str = "hrana2";
