//! Async client for libSQL / sqld servers.
//!
//! One [`Client`] speaks either the stateless HTTP protocol or the stateful WebSocket
//! protocol, chosen from the URL scheme. Both offer `execute`, atomic `batch` and
//! `execute_multiple`; the stateful one also offers interactive transactions.
//!
//! ```rust,no_run
//! use libsql_client::prelude::*;
//!
//! # async fn demo() -> Result<(), LibsqlError> {
//! let client = ConfigBuilder::new("http://127.0.0.1:8080").build().await?;
//! client
//!     .batch(
//!         TransactionMode::Write,
//!         [
//!             Statement::new("CREATE TABLE IF NOT EXISTS t (a)"),
//!             Statement::with_args("INSERT INTO t VALUES (?)", ["one"]),
//!         ],
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod http;
pub mod prelude;
pub mod proto;
pub mod results;
pub mod statement;
pub mod translation;
pub mod types;
pub mod ws;

pub use client::Client;
pub use config::{Config, ConfigBuilder, ExpandedConfig, Protocol, Scheme};
pub use error::{ErrorCode, LibsqlError, map_error};
pub use results::{ResultSet, Row};
pub use statement::{Args, Statement};
pub use types::{InValue, IntMode, TransactionMode, Value};
pub use ws::Transaction;

pub type Result<T> = std::result::Result<T, LibsqlError>;
