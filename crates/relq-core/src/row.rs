//! Result rows and row materialization.

use crate::error::Error;
use crate::value::Value;

use serde::{Deserialize, Serialize};

/// A single result row: ordered column names with matching values.
///
/// Lookups by name are case-insensitive, matching the engine's
/// column-name-to-field materialization rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Row {
    /// Create a row from parallel column/value lists.
    ///
    /// Both lists must have the same length; extra values are truncated.
    pub fn new(columns: Vec<String>, mut values: Vec<Value>) -> Self {
        values.truncate(columns.len());
        while values.len() < columns.len() {
            values.push(Value::Null);
        }
        Self { columns, values }
    }

    /// Convenience constructor from `(name, value)` pairs.
    pub fn from_pairs(pairs: Vec<(&str, Value)>) -> Self {
        let (columns, values) = pairs
            .into_iter()
            .map(|(c, v)| (c.to_string(), v))
            .unzip();
        Self { columns, values }
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Column names in result order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Look up a value by column name, case-insensitively.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
            .map(|i| &self.values[i])
    }

    /// Look up a value by position.
    pub fn get_at(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// The first value of the row, for single-column scalar reads.
    pub fn scalar(&self) -> Value {
        self.values.first().cloned().unwrap_or(Value::Null)
    }

    /// Required lookup: missing column is an error naming the column.
    pub fn require(&self, name: &str) -> Result<&Value, Error> {
        self.get(name).ok_or_else(|| {
            Error::Execution(crate::error::ExecutionError::new(
                format!("result row has no column `{name}`"),
                String::new(),
                Vec::new(),
            ))
        })
    }
}

/// Materialization from a result row into a typed shape.
///
/// Entities implement this for full-row reads; projection result types
/// implement it for `select(...)` reads. `Row` implements it as identity
/// so callers can stay untyped.
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> Result<Self, Error>;
}

impl FromRow for Row {
    fn from_row(row: &Row) -> Result<Self, Error> {
        Ok(row.clone())
    }
}
