use std::collections::HashMap;
use std::ops::Index;
use std::sync::Arc;

use crate::types::Value;

/// Column names plus a name-to-position map, built once per result set and shared by its rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnIndex {
    names: Vec<String>,
    positions: HashMap<String, usize>,
}

impl ColumnIndex {
    /// Build the lookup table. A duplicated column name resolves to its first occurrence.
    #[must_use]
    pub fn new(names: Vec<String>) -> Self {
        let mut positions = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            positions.entry(name.clone()).or_insert(i);
        }
        Self { names, positions }
    }

    /// Column names in result order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Position of the first column called `name`.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }
}

/// A row from a query result
///
/// Addressable both by position and by column name over the same backing values:
/// `row[0]` and `row["id"]` return the same cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<ColumnIndex>,
    values: Vec<Value>,
}

impl Row {
    /// Create a row over a shared column index.
    ///
    /// # Arguments
    ///
    /// * `columns` - The column index shared by every row of the result set
    /// * `values` - The cells, in column order
    #[must_use]
    pub fn new(columns: Arc<ColumnIndex>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    /// Get a value from the row by column name
    ///
    /// # Returns
    ///
    /// The cell of the first column with that name, or `None` if there is none.
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&Value> {
        self.columns
            .position(column_name)
            .and_then(|idx| self.values.get(idx))
    }

    /// Get a value from the row by column index
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Column names of the result set this row belongs to.
    #[must_use]
    pub fn column_names(&self) -> &[String] {
        self.columns.names()
    }

    /// All cells, in column order.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Number of cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over the cells in column order.
    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.values.iter()
    }

    /// Take ownership of the cells.
    #[must_use]
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

impl Index<usize> for Row {
    type Output = Value;

    fn index(&self, index: usize) -> &Value {
        &self.values[index]
    }
}

impl Index<&str> for Row {
    type Output = Value;

    /// # Panics
    ///
    /// Panics when the row has no column with that name; use [`Row::get`] for a fallible lookup.
    fn index(&self, column_name: &str) -> &Value {
        match self.get(column_name) {
            Some(value) => value,
            None => panic!("no column named {column_name:?} in row"),
        }
    }
}

impl<'a> IntoIterator for &'a Row {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}
