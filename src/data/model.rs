use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Value – a single cell of a table
// ---------------------------------------------------------------------------

/// One cell of a loaded table. Filter selections and group-by keys are
/// ordered sets and maps of cells, hence the total order below.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDate),
    Null,
}

// -- Manual Eq/Ord so we can put Value in BTreeSet --

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use Value::*;
        fn discriminant(v: &Value) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) => 2,
                Float(_) => 3,
                String(_) => 4,
                Date(_) => 5,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (String(a), String(b)) => a.cmp(b),
            (Date(a), Date(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::String(s) => s.hash(state),
            Value::Integer(i) => i.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::Bool(b) => b.hash(state),
            Value::Date(d) => d.hash(state),
            Value::Null => {}
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{s}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Null => write!(f, "<null>"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl Value {
    /// Try to interpret the value as an `f64` for numeric aggregation.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short dtype name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::Date(_) => "date",
            Value::Null => "null",
        }
    }
}

// ---------------------------------------------------------------------------
// Table – the complete loaded dataset
// ---------------------------------------------------------------------------

/// An immutable row-oriented table. Every row holds exactly one value per
/// column, in column order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Build a table, checking that every row matches the column count and
    /// that column names are unique.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self> {
        let mut seen = BTreeSet::new();
        for col in &columns {
            if !seen.insert(col.as_str()) {
                return Err(Error::Schema(format!("duplicate column '{col}'")));
            }
        }
        for (i, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(Error::Schema(format!(
                    "row {i} has {} values but the table has {} columns",
                    row.len(),
                    columns.len()
                )));
            }
        }
        Ok(Table { columns, rows })
    }

    /// A table with the given columns and no rows.
    pub fn empty(columns: Vec<String>) -> Self {
        Table {
            columns,
            rows: Vec::new(),
        }
    }

    /// Ordered list of column names.
    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Position of `name` among the columns.
    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| Error::ColumnNotFound(name.to_string()))
    }

    /// Iterate over the values of one column, top to bottom.
    pub fn column(&self, name: &str) -> Result<impl Iterator<Item = &Value> + '_> {
        let idx = self.column_index(name)?;
        Ok(self.rows.iter().map(move |row| &row[idx]))
    }

    /// The value at `row` in column `name`.
    pub fn value(&self, row: usize, name: &str) -> Result<Option<&Value>> {
        let idx = self.column_index(name)?;
        Ok(self.rows.get(row).map(|r| &r[idx]))
    }

    /// Sorted set of the distinct values in a column.
    pub fn unique_values(&self, name: &str) -> Result<BTreeSet<Value>> {
        Ok(self.column(name)?.cloned().collect())
    }

    /// A new table holding only the rows at `indices`, in that order.
    pub fn select_rows(&self, indices: &[usize]) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }

    /// A new table without the named columns. Names that are not present
    /// are ignored.
    pub fn without_columns(&self, names: &[String]) -> Table {
        let keep: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| !names.contains(c))
            .map(|(i, _)| i)
            .collect();
        Table {
            columns: keep.iter().map(|&i| self.columns[i].clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| keep.iter().map(|&i| row[i].clone()).collect())
                .collect(),
        }
    }

    /// A new table with `name` set to `values`. An existing column of that
    /// name is overwritten in place, otherwise the column is appended.
    pub fn with_column(&self, name: &str, values: Vec<Value>) -> Result<Table> {
        if values.len() != self.rows.len() {
            return Err(Error::Schema(format!(
                "column '{name}' has {} values but the table has {} rows",
                values.len(),
                self.rows.len()
            )));
        }
        let mut table = self.clone();
        match self.columns.iter().position(|c| c == name) {
            Some(idx) => {
                for (row, v) in table.rows.iter_mut().zip(values) {
                    row[idx] = v;
                }
            }
            None => {
                table.columns.push(name.to_string());
                for (row, v) in table.rows.iter_mut().zip(values) {
                    row.push(v);
                }
            }
        }
        Ok(table)
    }
}
