use std::collections::HashMap;

use crate::error::{Result, SqlHelpersError};
use crate::types::SqlValue;

/// Driver-agnostic raw result from a database query.
#[derive(Debug, Clone, Default)]
pub struct RawQueryResult {
    /// Column names in order
    pub columns: Vec<String>,
    /// Rows, where each row is a vector of values in column order
    pub rows: Vec<Vec<SqlValue>>,
}

impl RawQueryResult {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<SqlValue>>) -> Self {
        Self { columns, rows }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Takes the first row, if any, discarding the rest.
    pub fn into_first(self) -> Option<RawRow> {
        let columns = self.columns;
        self.rows
            .into_iter()
            .next()
            .map(|values| RawRow { columns, values })
    }
}

/// A single raw row as returned by a driver's fetch-one path.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    pub columns: Vec<String>,
    pub values: Vec<SqlValue>,
}

/// A single result row: column name to value, in the order the driver returned.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<SqlValue>,
}

impl Row {
    /// Creates a new Row from column names and values.
    pub(crate) fn new(columns: Vec<String>, values: Vec<SqlValue>) -> Self {
        Self { columns, values }
    }

    /// Gets a value by column name.
    pub fn get(&self, column: &str) -> Result<&SqlValue> {
        self.try_get(column)
            .ok_or_else(|| SqlHelpersError::ColumnNotFound(column.to_string()))
    }

    /// Gets a value by column name, or `None` if the row has no such column.
    pub fn try_get(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|i| self.values.get(i))
    }

    /// Returns all column names in this row, in driver order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    /// Iterates `(column, value)` pairs in driver order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.columns
            .iter()
            .map(|c| c.as_str())
            .zip(self.values.iter())
    }

    /// Returns the number of columns in this row.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns true if this row has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Converts into an unordered name to value map.
    /// When a column name repeats, the last value wins.
    pub fn into_map(self) -> HashMap<String, SqlValue> {
        self.columns.into_iter().zip(self.values).collect()
    }
}

impl From<RawRow> for Row {
    fn from(raw: RawRow) -> Self {
        Row::new(raw.columns, raw.values)
    }
}

/// Result of a query execution, containing zero or more rows.
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl QueryResult {
    /// Creates a QueryResult from a RawQueryResult.
    pub fn from_raw(raw: RawQueryResult) -> Self {
        let rows = raw
            .rows
            .into_iter()
            .map(|values| Row::new(raw.columns.clone(), values))
            .collect();
        Self {
            columns: raw.columns,
            rows,
        }
    }

    /// Returns all rows from the result.
    pub fn rows(self) -> Vec<Row> {
        self.rows
    }

    /// Returns a reference to the rows without consuming the result.
    pub fn rows_ref(&self) -> &[Row] {
        &self.rows
    }

    pub fn first(&self) -> Option<&Row> {
        self.rows.first()
    }

    /// Returns the column names from this result.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the number of rows in this result.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if this result contains no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl IntoIterator for QueryResult {
    type Item = Row;
    type IntoIter = std::vec::IntoIter<Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}
