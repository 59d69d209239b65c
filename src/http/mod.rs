//! Stateless transport: one request per call.
//!
//! - `transport`: the request seam and its `reqwest` implementation
//! - `query`: response decoding and error mapping
//! - `executor`: the client operations

pub mod executor;
pub mod query;
pub mod transport;

pub use executor::HttpClient;
pub use query::decode_response;
#[cfg(feature = "http")]
pub use transport::ReqwestTransport;
pub use transport::{HttpResponse, HttpTransport};

pub(crate) const EXECUTE_PATH: &str = "v1/execute";
pub(crate) const BATCH_PATH: &str = "v1/batch";
