use std::collections::{BTreeMap, BTreeSet};

use super::model::{Table, Value};
use crate::error::Result;

// ---------------------------------------------------------------------------
// Filter predicate: which values are accepted per column
// ---------------------------------------------------------------------------

/// Per-column selection state: maps column_name → set of accepted values.
/// A column absent from the map is unconstrained. A column present with an
/// empty set accepts nothing: the result is an empty table, never "all rows".
pub type FilterState = BTreeMap<String, BTreeSet<Value>>;

/// Initialise a [`FilterState`] with every value of `columns` selected
/// (i.e., show everything). This is the default a selection UI starts from.
pub fn init_filter_state(table: &Table, columns: &[&str]) -> Result<FilterState> {
    columns
        .iter()
        .map(|col| Ok((col.to_string(), table.unique_values(col)?)))
        .collect()
}

/// Return the indices of rows whose `column` value is in `accepted`.
pub fn filtered_indices(table: &Table, column: &str, accepted: &BTreeSet<Value>) -> Result<Vec<usize>> {
    let idx = table.column_index(column)?;
    if accepted.is_empty() {
        // Nothing selected for this column → hide everything
        return Ok(Vec::new());
    }
    Ok(table
        .rows()
        .iter()
        .enumerate()
        .filter(|(_, row)| accepted.contains(&row[idx]))
        .map(|(i, _)| i)
        .collect())
}

/// The sub-table of rows whose `column` value is in `accepted`.
///
/// An empty `accepted` set yields an empty table with the same columns.
/// The input table is left untouched.
pub fn apply(table: &Table, column: &str, accepted: &BTreeSet<Value>) -> Result<Table> {
    let indices = filtered_indices(table, column, accepted)?;
    log::debug!(
        "Filter {column} ({} values) kept {}/{} rows",
        accepted.len(),
        indices.len(),
        table.len()
    );
    Ok(table.select_rows(&indices))
}

/// Apply every column filter in `filters` in turn (logical AND).
pub fn apply_all(table: &Table, filters: &FilterState) -> Result<Table> {
    filters
        .iter()
        .try_fold(table.clone(), |acc, (col, accepted)| apply(&acc, col, accepted))
}
