use chrono::{DateTime, NaiveDateTime, Utc};
use clap::ValueEnum;

/// Values supplied by the application as statement arguments.
///
/// Every variant maps to exactly one wire [`Value`] (see [`crate::codec::to_wire`]); variants
/// that cannot be represented are rejected rather than approximated:
/// ```rust
/// use libsql_client::prelude::*;
///
/// let args = vec![
///     InValue::Integer(1),
///     InValue::Text("alice".into()),
///     InValue::Bool(true),
/// ];
/// # let _ = args;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum InValue {
    /// SQL NULL
    Null,
    /// An explicitly unset value. Binding one is a programmer error (`TYPE_ERROR`).
    Undefined,
    /// Stored as integer 1 / 0
    Bool(bool),
    /// A floating point number; whole numbers in the safe range are sent as integers
    Number(f64),
    /// 64-bit integer
    Integer(i64),
    /// Wide integer; must fit the 64-bit SQL integer domain
    BigInt(i128),
    /// Text value
    Text(String),
    /// Binary data, copied byte for byte
    Blob(Vec<u8>),
    /// Point in time, sent as milliseconds since the Unix epoch
    Timestamp(DateTime<Utc>),
}

impl From<bool> for InValue {
    fn from(value: bool) -> Self {
        InValue::Bool(value)
    }
}

impl From<f64> for InValue {
    fn from(value: f64) -> Self {
        InValue::Number(value)
    }
}

impl From<i64> for InValue {
    fn from(value: i64) -> Self {
        InValue::Integer(value)
    }
}

impl From<i32> for InValue {
    fn from(value: i32) -> Self {
        InValue::Integer(i64::from(value))
    }
}

impl From<i128> for InValue {
    fn from(value: i128) -> Self {
        InValue::BigInt(value)
    }
}

impl From<&str> for InValue {
    fn from(value: &str) -> Self {
        InValue::Text(value.to_owned())
    }
}

impl From<String> for InValue {
    fn from(value: String) -> Self {
        InValue::Text(value)
    }
}

impl From<Vec<u8>> for InValue {
    fn from(value: Vec<u8>) -> Self {
        InValue::Blob(value)
    }
}

impl From<&[u8]> for InValue {
    fn from(value: &[u8]) -> Self {
        InValue::Blob(value.to_vec())
    }
}

impl From<DateTime<Utc>> for InValue {
    fn from(value: DateTime<Utc>) -> Self {
        InValue::Timestamp(value)
    }
}

impl From<NaiveDateTime> for InValue {
    fn from(value: NaiveDateTime) -> Self {
        InValue::Timestamp(value.and_utc())
    }
}

impl<T: Into<InValue>> From<Option<T>> for InValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(InValue::Null, Into::into)
    }
}

/// A SQL value as it travels on the wire and as it is returned in rows.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// NULL value
    Null,
    /// Integer value (64-bit); encoded as a decimal string on the wire
    Integer(i64),
    /// Floating point value (64-bit)
    Real(f64),
    /// Text/string value
    Text(String),
    /// Binary data
    Blob(Vec<u8>),
}

impl Value {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The integer, if this is an integer cell.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        if let Value::Integer(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    /// The number as `f64`; integers are widened.
    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Real(value) => Some(*value),
            #[allow(clippy::cast_precision_loss)]
            Value::Integer(value) => Some(*value as f64),
            _ => None,
        }
    }

    /// The string, if this is a text cell.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let Value::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    /// The bytes, if this is a blob cell.
    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let Value::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }

    /// `1` and `0` read as booleans; anything else is `None`.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self.as_int() {
            Some(1) => Some(true),
            Some(0) => Some(false),
            _ => None,
        }
    }

    /// Interpret an integer cell as milliseconds since the Unix epoch.
    #[must_use]
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        self.as_int().and_then(DateTime::from_timestamp_millis)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Real(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Blob(value)
    }
}

/// How integer cells in result rows are surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum IntMode {
    /// As `Value::Integer`
    #[default]
    Integer,
    /// As the decimal string, in `Value::Text`
    Text,
}

/// Locking mode used to open a batch or an interactive transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum TransactionMode {
    /// `BEGIN IMMEDIATE`: take the write lock up front
    Write,
    /// `BEGIN TRANSACTION READONLY`
    Read,
    /// `BEGIN DEFERRED`
    #[default]
    Deferred,
}

impl TransactionMode {
    #[must_use]
    pub fn begin_sql(self) -> &'static str {
        match self {
            TransactionMode::Write => "BEGIN IMMEDIATE",
            TransactionMode::Read => "BEGIN TRANSACTION READONLY",
            TransactionMode::Deferred => "BEGIN DEFERRED",
        }
    }
}
