//! Convenient imports for common functionality.

pub use crate::client::Client;
pub use crate::config::{Config, ConfigBuilder, Protocol};
pub use crate::error::{ErrorCode, LibsqlError};
pub use crate::results::{ResultSet, Row};
pub use crate::statement::{Args, Statement};
pub use crate::types::{InValue, IntMode, TransactionMode, Value};
pub use crate::ws::Transaction;
