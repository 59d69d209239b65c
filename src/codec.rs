//! Conversion between application values and the wire value model.
//!
//! Pure functions, no I/O. Anything that cannot be represented exactly is rejected with
//! `COERCION_ERROR`; binding an unset value is a `TYPE_ERROR`.

use base64::Engine as _;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};

use crate::error::{ErrorCode, LibsqlError};
use crate::proto::ProtoValue;
use crate::types::{InValue, IntMode, Value};

/// Largest integer an `f64` represents without rounding (2^53 - 1).
pub const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

const BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Convert an application value into a wire value.
///
/// # Errors
///
/// `TYPE_ERROR` for [`InValue::Undefined`]; `COERCION_ERROR` for non-finite numbers and
/// integers outside the 64-bit range.
pub fn to_wire(value: &InValue) -> Result<Value, LibsqlError> {
    match value {
        InValue::Null => Ok(Value::Null),
        InValue::Undefined => Err(LibsqlError::new(
            ErrorCode::TypeError,
            "Cannot bind an undefined value; use InValue::Null for SQL NULL",
        )),
        InValue::Bool(b) => Ok(Value::Integer(i64::from(*b))),
        InValue::Number(n) => number_to_wire(*n),
        InValue::Integer(i) => Ok(Value::Integer(*i)),
        InValue::BigInt(i) => i64::try_from(*i).map(Value::Integer).map_err(|_| {
            LibsqlError::coercion(format!(
                "Integer {i} cannot be stored: it is outside the 64-bit range supported by SQLite"
            ))
        }),
        InValue::Text(s) => Ok(Value::Text(s.clone())),
        InValue::Blob(bytes) => Ok(Value::Blob(bytes.clone())),
        InValue::Timestamp(ts) => Ok(Value::Integer(ts.timestamp_millis())),
    }
}

#[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
fn number_to_wire(n: f64) -> Result<Value, LibsqlError> {
    if !n.is_finite() {
        return Err(LibsqlError::coercion(format!(
            "{n} cannot be represented as a SQL value"
        )));
    }
    if n.trunc() == n && n.abs() <= MAX_SAFE_INTEGER {
        Ok(Value::Integer(n as i64))
    } else {
        Ok(Value::Real(n))
    }
}

/// Encode a wire value for transmission.
#[must_use]
pub fn to_proto(value: &Value) -> ProtoValue {
    match value {
        Value::Null => ProtoValue::Null,
        Value::Integer(i) => ProtoValue::Integer {
            value: i.to_string(),
        },
        Value::Real(f) => ProtoValue::Float { value: *f },
        Value::Text(s) => ProtoValue::Text { value: s.clone() },
        Value::Blob(bytes) => ProtoValue::Blob {
            base64: BASE64.encode(bytes),
        },
    }
}

/// Decode a received wire value into a row value.
///
/// # Errors
///
/// `COERCION_ERROR` when an integer does not fit in 64 bits; `PROTOCOL_ERROR` for
/// malformed base64.
pub fn from_wire(value: ProtoValue, int_mode: IntMode) -> Result<Value, LibsqlError> {
    match value {
        ProtoValue::Null => Ok(Value::Null),
        ProtoValue::Integer { value } => {
            let parsed = value.parse::<i64>().map_err(|e| {
                LibsqlError::coercion(format!("Received integer {value:?} is not a 64-bit integer: {e}"))
            })?;
            match int_mode {
                IntMode::Integer => Ok(Value::Integer(parsed)),
                IntMode::Text => Ok(Value::Text(parsed.to_string())),
            }
        }
        ProtoValue::Float { value } => Ok(Value::Real(value)),
        ProtoValue::Text { value } => Ok(Value::Text(value)),
        ProtoValue::Blob { base64 } => Ok(Value::Blob(BASE64.decode(base64)?)),
    }
}

/// Decode an optional decimal row id.
pub(crate) fn rowid_from_wire(rowid: Option<&str>) -> Result<Option<i64>, LibsqlError> {
    rowid
        .map(|s| {
            s.parse::<i64>()
                .map_err(|e| LibsqlError::protocol(format!("Invalid last_insert_rowid {s:?}: {e}")))
        })
        .transpose()
}
