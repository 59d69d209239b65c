use std::sync::Arc;

use serde_json::{Value as JsonValue, json};

use super::row::{ColumnIndex, Row};
use crate::codec;
use crate::error::LibsqlError;
use crate::proto::StmtResult;
use crate::types::{IntMode, Value};

/// A result set from a statement
///
/// Holds the rows returned by the statement and its write metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    /// Column names shared by all rows
    columns: Arc<ColumnIndex>,
    /// Declared column types, where the server reports them
    pub column_types: Vec<Option<String>>,
    /// The rows returned by the statement
    pub rows: Vec<Row>,
    /// The number of rows changed by the statement
    pub rows_affected: u64,
    /// ROWID of the last successful insert, if the statement inserted anything
    pub last_insert_rowid: Option<i64>,
}

impl ResultSet {
    /// Get the column names for this result set
    #[must_use]
    pub fn columns(&self) -> &[String] {
        self.columns.names()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// JSON rendering, with blobs as arrays of bytes.
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        let rows: Vec<JsonValue> = self
            .rows
            .iter()
            .map(|row| JsonValue::Array(row.iter().map(value_to_json).collect()))
            .collect();
        json!({
            "columns": self.columns(),
            "columnTypes": self.column_types,
            "rows": rows,
            "rowsAffected": self.rows_affected,
            "lastInsertRowid": self.last_insert_rowid,
        })
    }
}

fn value_to_json(value: &Value) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Integer(i) => json!(i),
        Value::Real(f) => json!(f),
        Value::Text(s) => json!(s),
        Value::Blob(bytes) => json!(bytes),
    }
}

/// Build a result set from a decoded statement result.
///
/// # Errors
///
/// Returns `LibsqlError` when a cell or the row id cannot be decoded.
pub fn build_result_set(result: StmtResult, int_mode: IntMode) -> Result<ResultSet, LibsqlError> {
    let mut names = Vec::with_capacity(result.cols.len());
    let mut column_types = Vec::with_capacity(result.cols.len());
    for (i, col) in result.cols.into_iter().enumerate() {
        names.push(col.name.unwrap_or_else(|| format!("column_{i}")));
        column_types.push(col.decltype);
    }
    let columns = Arc::new(ColumnIndex::new(names));

    let mut rows = Vec::with_capacity(result.rows.len());
    for cells in result.rows {
        if cells.len() != columns.names().len() {
            return Err(LibsqlError::protocol(format!(
                "Row has {} values but the result has {} columns",
                cells.len(),
                columns.names().len()
            )));
        }
        let values = cells
            .into_iter()
            .map(|cell| codec::from_wire(cell, int_mode))
            .collect::<Result<Vec<_>, _>>()?;
        rows.push(Row::new(columns.clone(), values));
    }

    Ok(ResultSet {
        columns,
        column_types,
        rows,
        rows_affected: result.affected_row_count,
        last_insert_rowid: codec::rowid_from_wire(result.last_insert_rowid.as_deref())?,
    })
}
