use std::path::Path;

use arrow::array::{
    Array, ArrayRef, AsArray, BooleanArray, Date32Array, Float32Array, Float64Array, Int32Array,
    Int64Array, StringArray,
};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{Table, Value};
use super::schema::Schema;
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load a table from a file and normalize it against `schema`.
pub fn load_file(path: &Path, schema: &Schema) -> Result<Table> {
    let raw = read_table(path)?;
    log::debug!(
        "Read {} rows from {} with columns {:?}",
        raw.len(),
        path.display(),
        raw.column_names()
    );
    let table = schema.normalize(raw)?;
    log::info!(
        "Loaded {} rows from {} ({} columns)",
        table.len(),
        path.display(),
        table.column_names().len()
    );
    Ok(table)
}

/// Read a raw table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.parquet` – flat Parquet file (strings, ints, floats, bools, dates)
/// * `.json`    – `[{ "Segment": "Champions", "Recency": 3, ... }, ...]`
/// * `.csv`     – header row, cell types guessed per value
pub fn read_table(path: &Path) -> Result<Table> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "parquet" | "pq" => read_parquet(path),
        "json" => read_json(path),
        "csv" => read_csv(path),
        other => Err(Error::UnsupportedFormat(other.to_string())),
    }
}

// ---------------------------------------------------------------------------
// JSON reader
// ---------------------------------------------------------------------------

/// Records-oriented layout, the default `df.to_json(orient='records')`.
/// Columns are the union of all keys; a key missing from a record is Null.
fn read_json(path: &Path) -> Result<Table> {
    let text = std::fs::read_to_string(path)?;
    let root: JsonValue = serde_json::from_str(&text)?;

    let records = root
        .as_array()
        .ok_or_else(|| Error::Schema("expected a top-level JSON array".to_string()))?;

    let mut columns: Vec<String> = Vec::new();
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .ok_or_else(|| Error::Schema(format!("row {i} is not a JSON object")))?;
        for key in obj.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }

    let rows = records
        .iter()
        .filter_map(|rec| rec.as_object())
        .map(|obj| {
            columns
                .iter()
                .map(|col| obj.get(col).map(json_to_value).unwrap_or(Value::Null))
                .collect()
        })
        .collect();

    Table::new(columns, rows)
}

fn json_to_value(val: &JsonValue) -> Value {
    match val {
        JsonValue::String(s) => Value::String(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Integer(i)
            } else if let Some(f) = n.as_f64() {
                Value::Float(f)
            } else {
                Value::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => Value::Bool(*b),
        JsonValue::Null => Value::Null,
        other => Value::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// CSV reader
// ---------------------------------------------------------------------------

fn read_csv(path: &Path) -> Result<Table> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        rows.push(record.iter().map(guess_value_type).collect());
    }

    Table::new(headers, rows)
}

/// Cells pandas writes for missing values.
const NA_VALUES: &[&str] = &["NaN", "nan", "NA", "N/A", "NULL", "null", "<NA>"];

fn guess_value_type(s: &str) -> Value {
    if s.is_empty() || NA_VALUES.contains(&s) {
        return Value::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return Value::Integer(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return Value::Float(f);
    }
    if s == "true" || s == "false" {
        return Value::Bool(s == "true");
    }
    Value::String(s.to_string())
}

// ---------------------------------------------------------------------------
// Parquet reader
// ---------------------------------------------------------------------------

/// Load a flat Parquet file.  Each top-level column becomes a table column.
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`); dictionary-encoded string columns are
/// decoded on read and timestamp columns (pandas `datetime64[ns]`) are
/// truncated to dates.
fn read_parquet(path: &Path) -> Result<Table> {
    let file = std::fs::File::open(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let columns: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build()?;

    let mut rows = Vec::new();

    for batch_result in reader {
        let batch = batch_result?;
        let arrays = batch
            .columns()
            .iter()
            .map(|col| -> Result<ArrayRef> {
                match col.data_type() {
                    DataType::Dictionary(_, _) => Ok(arrow::compute::cast(col, &DataType::Utf8)?),
                    DataType::Timestamp(_, _) => Ok(arrow::compute::cast(col, &DataType::Date32)?),
                    _ => Ok(col.clone()),
                }
            })
            .collect::<Result<Vec<ArrayRef>>>()?;

        for row in 0..batch.num_rows() {
            let values = arrays
                .iter()
                .zip(&columns)
                .map(|(array, name)| extract_value(array, row, name))
                .collect::<Result<Vec<Value>>>()?;
            rows.push(values);
        }
    }

    Table::new(columns, rows)
}

// -- Arrow helpers --

fn downcast<'a, T: 'static>(col: &'a ArrayRef, name: &str) -> Result<&'a T> {
    col.as_any().downcast_ref::<T>().ok_or_else(|| {
        Error::Schema(format!(
            "column '{name}': unexpected array layout for {:?}",
            col.data_type()
        ))
    })
}

/// Extract a single value from an Arrow column at a given row.
fn extract_value(col: &ArrayRef, row: usize, name: &str) -> Result<Value> {
    if col.is_null(row) {
        return Ok(Value::Null);
    }
    let value = match col.data_type() {
        DataType::Utf8 => Value::String(downcast::<StringArray>(col, name)?.value(row).to_string()),
        DataType::LargeUtf8 => Value::String(col.as_string::<i64>().value(row).to_string()),
        DataType::Int32 => Value::Integer(downcast::<Int32Array>(col, name)?.value(row) as i64),
        DataType::Int64 => Value::Integer(downcast::<Int64Array>(col, name)?.value(row)),
        DataType::Float32 => Value::Float(downcast::<Float32Array>(col, name)?.value(row) as f64),
        DataType::Float64 => Value::Float(downcast::<Float64Array>(col, name)?.value(row)),
        DataType::Boolean => Value::Bool(downcast::<BooleanArray>(col, name)?.value(row)),
        DataType::Date32 => downcast::<Date32Array>(col, name)?
            .value_as_date(row)
            .map(Value::Date)
            .unwrap_or(Value::Null),
        other => {
            return Err(Error::Schema(format!(
                "column '{name}' has unsupported type {other:?}"
            )))
        }
    };
    Ok(value)
}
