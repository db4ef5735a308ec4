use std::sync::Arc;

use arrow::array::{ArrayRef, BooleanArray, Date32Array, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use chrono::NaiveDate;

use crate::aggregate::DerivedView;
use crate::dashboard::{DashboardReport, Kpi};
use crate::data::model::{Table, Value};
use crate::error::Result;

// ---------------------------------------------------------------------------
// Plain-text rendering of a report
// ---------------------------------------------------------------------------

/// KPI value rounded to its precision, or `n/a` when undefined.
pub fn format_kpi(kpi: &Kpi) -> String {
    match kpi.value {
        Some(v) => format!("{:.*}", kpi.precision, v),
        None => "n/a".to_string(),
    }
}

/// Render the whole report as text for a terminal.
pub fn render_text(report: &DashboardReport) -> Result<String> {
    let mut lines = vec!["RFM & Sales Dashboard".to_string()];

    for section in &report.kpis {
        lines.push(String::new());
        lines.push(format!("## {}", section.title));
        for kpi in &section.kpis {
            lines.push(format!("  {:<28} {:>14}", kpi.label, format_kpi(kpi)));
        }
    }

    for chart in &report.charts {
        lines.push(String::new());
        lines.push(format!("## {} ({})", chart.title, chart.column));
        match &chart.view {
            DerivedView::Scalar(v) => lines.push(format!("  {v}")),
            DerivedView::Distribution(counts) => {
                for (label, n) in counts {
                    lines.push(format!("  {:<28} {:>8}", label.to_string(), n));
                }
            }
            DerivedView::GroupSeries(series) => {
                for (key, mean) in series {
                    lines.push(format!("  {:<28} {:>14.2}", key.to_string(), mean));
                }
            }
        }
        if view_is_empty(&chart.view) {
            lines.push("  (no rows)".to_string());
        }
    }

    lines.push(String::new());
    lines.push(format!("## RFM Table ({} rows)", report.rfm_table.len()));
    let batch = table_to_batch(&report.rfm_table)?;
    lines.push(pretty_format_batches(&[batch])?.to_string());

    let mut out = lines.join("\n");
    out.push('\n');
    Ok(out)
}

fn view_is_empty(view: &DerivedView) -> bool {
    match view {
        DerivedView::Scalar(_) => false,
        DerivedView::Distribution(d) => d.is_empty(),
        DerivedView::GroupSeries(s) => s.is_empty(),
    }
}

// ---------------------------------------------------------------------------
// Table → Arrow conversion (for pretty-printing)
// ---------------------------------------------------------------------------

/// Pick one Arrow type for a column: integers stay integers, mixed
/// integer/float becomes float, dates and bools keep their type, anything
/// else is rendered as text. Nulls fit every type.
fn column_type<'a>(values: impl Iterator<Item = &'a Value>) -> DataType {
    let mut ty: Option<DataType> = None;
    for v in values {
        let this = match v {
            Value::Null => continue,
            Value::Integer(_) => DataType::Int64,
            Value::Float(_) => DataType::Float64,
            Value::Bool(_) => DataType::Boolean,
            Value::Date(_) => DataType::Date32,
            Value::String(_) => DataType::Utf8,
        };
        ty = Some(match (ty, this) {
            (None, t) => t,
            (Some(a), b) if a == b => a,
            (Some(DataType::Int64), DataType::Float64) | (Some(DataType::Float64), DataType::Int64) => {
                DataType::Float64
            }
            _ => DataType::Utf8,
        });
    }
    ty.unwrap_or(DataType::Utf8)
}

fn days_since_epoch(d: &NaiveDate) -> i32 {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default();
    (*d - epoch).num_days() as i32
}

fn to_array(values: &[&Value], ty: &DataType) -> ArrayRef {
    match ty {
        DataType::Int64 => Arc::new(Int64Array::from_iter(values.iter().map(|v| match v {
            Value::Integer(i) => Some(*i),
            _ => None,
        }))),
        DataType::Float64 => Arc::new(Float64Array::from_iter(values.iter().map(|v| v.as_f64()))),
        DataType::Boolean => Arc::new(BooleanArray::from_iter(values.iter().map(|v| match v {
            Value::Bool(b) => Some(*b),
            _ => None,
        }))),
        DataType::Date32 => Arc::new(Date32Array::from_iter(values.iter().map(|v| match v {
            Value::Date(d) => Some(days_since_epoch(d)),
            _ => None,
        }))),
        _ => Arc::new(StringArray::from_iter(values.iter().map(|v| match v {
            Value::Null => None,
            other => Some(other.to_string()),
        }))),
    }
}

/// Convert a table into a single Arrow record batch.
pub fn table_to_batch(table: &Table) -> Result<RecordBatch> {
    let mut fields = Vec::with_capacity(table.column_names().len());
    let mut arrays = Vec::with_capacity(table.column_names().len());

    for name in table.column_names() {
        let values: Vec<&Value> = table.column(name)?.collect();
        let ty = column_type(values.iter().copied());
        arrays.push(to_array(&values, &ty));
        fields.push(Field::new(name, ty, true));
    }

    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?)
}
