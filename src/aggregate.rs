use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;

use crate::data::model::{Table, Value};
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Aggregation specs
// ---------------------------------------------------------------------------

/// Single-number summary of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarOp {
    Mean,
    Sum,
    /// Number of rows.
    Count,
    /// Number of distinct non-null values.
    CountDistinct,
    /// Number of non-null values.
    CountNonNull,
}

impl ScalarOp {
    pub fn name(self) -> &'static str {
        match self {
            ScalarOp::Mean => "mean",
            ScalarOp::Sum => "sum",
            ScalarOp::Count => "count",
            ScalarOp::CountDistinct => "count_distinct",
            ScalarOp::CountNonNull => "count_nonnull",
        }
    }

    fn is_numeric(self) -> bool {
        matches!(self, ScalarOp::Mean | ScalarOp::Sum)
    }
}

/// What `mean` / `sum` return when there is nothing to aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyPolicy {
    /// Fail with [`Error::EmptyAggregation`].
    #[default]
    Error,
    /// Return `0.0`.
    Zero,
}

/// A declarative request for one derived view.
#[derive(Debug, Clone, PartialEq)]
pub enum AggregationSpec {
    Scalar {
        column: String,
        op: ScalarOp,
        on_empty: EmptyPolicy,
    },
    Distribution {
        column: String,
    },
    GroupMean {
        group_column: String,
        value_column: String,
    },
}

impl AggregationSpec {
    pub fn scalar(column: &str, op: ScalarOp) -> Self {
        AggregationSpec::Scalar {
            column: column.to_string(),
            op,
            on_empty: EmptyPolicy::Error,
        }
    }

    pub fn distribution(column: &str) -> Self {
        AggregationSpec::Distribution {
            column: column.to_string(),
        }
    }

    pub fn group_mean(group_column: &str, value_column: &str) -> Self {
        AggregationSpec::GroupMean {
            group_column: group_column.to_string(),
            value_column: value_column.to_string(),
        }
    }

    /// Switch a scalar spec to the zero-default empty policy.
    pub fn or_zero(mut self) -> Self {
        if let AggregationSpec::Scalar { on_empty, .. } = &mut self {
            *on_empty = EmptyPolicy::Zero;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Derived views
// ---------------------------------------------------------------------------

/// The result of one aggregation. Values are full precision; rounding is
/// left to whoever renders them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum DerivedView {
    Scalar(f64),
    /// Label → row count, by descending count.
    Distribution(Vec<(Value, usize)>),
    /// Group key → mean, by ascending key.
    GroupSeries(Vec<(Value, f64)>),
}

impl DerivedView {
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            DerivedView::Scalar(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_distribution(&self) -> Option<&[(Value, usize)]> {
        match self {
            DerivedView::Distribution(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_series(&self) -> Option<&[(Value, f64)]> {
        match self {
            DerivedView::GroupSeries(s) => Some(s),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Compute one derived view over `table`. Pure: the same inputs always give
/// the same output and the table is never modified.
pub fn aggregate(table: &Table, spec: &AggregationSpec) -> Result<DerivedView> {
    match spec {
        AggregationSpec::Scalar {
            column,
            op,
            on_empty,
        } => scalar(table, column, *op, *on_empty).map(DerivedView::Scalar),
        AggregationSpec::Distribution { column } => {
            distribution(table, column).map(DerivedView::Distribution)
        }
        AggregationSpec::GroupMean {
            group_column,
            value_column,
        } => group_mean(table, group_column, value_column).map(DerivedView::GroupSeries),
    }
}

/// Collect the numeric values of a column, skipping nulls.
fn numeric_values(table: &Table, column: &str, op: &'static str) -> Result<Vec<f64>> {
    table
        .column(column)?
        .filter(|v| !v.is_null())
        .map(|v| {
            v.as_f64().ok_or_else(|| Error::Type {
                column: column.to_string(),
                op,
                found: v.type_name(),
            })
        })
        .collect()
}

pub fn scalar(table: &Table, column: &str, op: ScalarOp, on_empty: EmptyPolicy) -> Result<f64> {
    if op.is_numeric() {
        let values = numeric_values(table, column, op.name())?;
        if values.is_empty() {
            return match on_empty {
                EmptyPolicy::Zero => Ok(0.0),
                EmptyPolicy::Error => Err(Error::EmptyAggregation {
                    column: column.to_string(),
                    op: op.name(),
                }),
            };
        }
        let sum: f64 = values.iter().sum();
        return Ok(match op {
            ScalarOp::Mean => sum / values.len() as f64,
            _ => sum,
        });
    }

    let values = table.column(column)?;
    let n = match op {
        ScalarOp::Count => values.count(),
        ScalarOp::CountNonNull => values.filter(|v| !v.is_null()).count(),
        _ => values.filter(|v| !v.is_null()).collect::<BTreeSet<_>>().len(),
    };
    Ok(n as f64)
}

/// Row count per distinct value, nulls included, by descending count with
/// ties kept in first-seen order.
pub fn distribution(table: &Table, column: &str) -> Result<Vec<(Value, usize)>> {
    let mut order: Vec<(Value, usize)> = Vec::new();
    let mut slot: HashMap<&Value, usize> = HashMap::new();

    for v in table.column(column)? {
        match slot.get(v) {
            Some(&i) => order[i].1 += 1,
            None => {
                slot.insert(v, order.len());
                order.push((v.clone(), 1));
            }
        }
    }

    // stable sort keeps first-seen order among equal counts
    order.sort_by(|a, b| b.1.cmp(&a.1));
    Ok(order)
}

/// Mean of `value_column` per distinct non-null `group_column` value.
/// Groups without any non-null value are left out entirely.
pub fn group_mean(table: &Table, group_column: &str, value_column: &str) -> Result<Vec<(Value, f64)>> {
    let g = table.column_index(group_column)?;
    let v = table.column_index(value_column)?;

    let mut acc: BTreeMap<&Value, (f64, usize)> = BTreeMap::new();
    for row in table.rows() {
        let (key, value) = (&row[g], &row[v]);
        if key.is_null() || value.is_null() {
            continue;
        }
        let x = value.as_f64().ok_or_else(|| Error::Type {
            column: value_column.to_string(),
            op: "mean",
            found: value.type_name(),
        })?;
        let entry = acc.entry(key).or_insert((0.0, 0));
        entry.0 += x;
        entry.1 += 1;
    }

    Ok(acc
        .into_iter()
        .map(|(key, (sum, n))| (key.clone(), sum / n as f64))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rfm() -> Table {
        Table::new(
            vec!["Segment".into(), "Recency".into()],
            vec![
                vec![Value::from("A"), Value::Integer(10)],
                vec![Value::from("A"), Value::Integer(20)],
                vec![Value::from("B"), Value::Integer(5)],
            ],
        )
        .unwrap()
    }

    fn sales() -> Table {
        Table::new(
            vec!["Status".into(), "Net Price".into(), "Year".into()],
            vec![
                vec![Value::from("Paid"), Value::Float(100.0), Value::Integer(2022)],
                vec![Value::from("Open"), Value::Float(-20.0), Value::Integer(2022)],
                vec![Value::from("Paid"), Value::Float(50.0), Value::Integer(2023)],
                vec![Value::from("Open"), Value::Null, Value::Integer(2023)],
                vec![Value::from("Void"), Value::Null, Value::Null],
            ],
        )
        .unwrap()
    }

    #[test]
    fn mean_of_filtered_segment() {
        let t = rfm();
        let a = crate::data::filter::apply(&t, "Segment", &[Value::from("A")].into()).unwrap();
        let view = aggregate(&a, &AggregationSpec::scalar("Recency", ScalarOp::Mean)).unwrap();
        assert_eq!(view, DerivedView::Scalar(15.0));
    }

    #[test]
    fn scalar_ops() {
        let t = sales();
        let get = |col: &str, op| scalar(&t, col, op, EmptyPolicy::Error).unwrap();
        assert_eq!(get("Net Price", ScalarOp::Sum), 130.0);
        assert!((get("Net Price", ScalarOp::Mean) - 130.0 / 3.0).abs() < 1e-12);
        assert_eq!(get("Net Price", ScalarOp::Count), 5.0);
        assert_eq!(get("Net Price", ScalarOp::CountNonNull), 3.0);
        assert_eq!(get("Status", ScalarOp::CountDistinct), 3.0);
        assert_eq!(get("Year", ScalarOp::CountDistinct), 2.0);
    }

    #[test]
    fn empty_table_counts_zero_but_mean_and_sum_fail() {
        let empty = Table::empty(vec!["Recency".into()]);
        assert_eq!(
            aggregate(&empty, &AggregationSpec::scalar("Recency", ScalarOp::Count)).unwrap(),
            DerivedView::Scalar(0.0)
        );
        for op in [ScalarOp::Mean, ScalarOp::Sum] {
            let err = aggregate(&empty, &AggregationSpec::scalar("Recency", op)).unwrap_err();
            assert!(matches!(err, Error::EmptyAggregation { .. }), "{op:?}");
        }
    }

    #[test]
    fn zero_default_policy() {
        let empty = Table::empty(vec!["Monetary".into()]);
        let spec = AggregationSpec::scalar("Monetary", ScalarOp::Sum).or_zero();
        assert_eq!(aggregate(&empty, &spec).unwrap(), DerivedView::Scalar(0.0));
    }

    #[test]
    fn numeric_ops_reject_text_columns() {
        let err = scalar(&rfm(), "Segment", ScalarOp::Mean, EmptyPolicy::Error).unwrap_err();
        assert!(matches!(err, Error::Type { found: "string", .. }));

        let err = group_mean(&sales(), "Year", "Status").unwrap_err();
        assert!(matches!(err, Error::Type { .. }));
    }

    #[test]
    fn unknown_columns_are_reported() {
        let t = rfm();
        for spec in [
            AggregationSpec::scalar("Nope", ScalarOp::Count),
            AggregationSpec::distribution("Nope"),
            AggregationSpec::group_mean("Segment", "Nope"),
            AggregationSpec::group_mean("Nope", "Recency"),
        ] {
            assert!(matches!(aggregate(&t, &spec), Err(Error::ColumnNotFound(_))));
        }
    }

    #[test]
    fn distribution_orders_by_count_then_first_seen() {
        let years = Table::new(
            vec!["Year".into()],
            vec![
                vec![Value::Integer(2022)],
                vec![Value::Integer(2022)],
                vec![Value::Integer(2023)],
            ],
        )
        .unwrap();
        assert_eq!(
            distribution(&years, "Year").unwrap(),
            vec![(Value::Integer(2022), 2), (Value::Integer(2023), 1)]
        );

        let t = sales();
        let d = distribution(&t, "Status").unwrap();
        assert_eq!(
            d,
            vec![
                (Value::from("Paid"), 2),
                (Value::from("Open"), 2),
                (Value::from("Void"), 1),
            ]
        );
        assert_eq!(d.iter().map(|(_, n)| n).sum::<usize>(), t.len());
    }

    #[test]
    fn distribution_counts_nulls() {
        let d = distribution(&sales(), "Year").unwrap();
        assert!(d.contains(&(Value::Null, 1)));
        assert_eq!(d.iter().map(|(_, n)| n).sum::<usize>(), 5);
    }

    #[test]
    fn group_mean_omits_empty_groups() {
        let t = sales();
        let series = group_mean(&t, "Status", "Net Price").unwrap();
        assert_eq!(
            series,
            vec![(Value::from("Open"), -20.0), (Value::from("Paid"), 75.0)]
        );
        // "Void" only has a null price, "Refunded" never occurs
        assert!(series.iter().all(|(k, _)| k != &Value::from("Void")));
        assert!(series.iter().all(|(k, _)| k != &Value::from("Refunded")));
    }

    #[test]
    fn aggregate_is_repeatable() {
        let t = sales();
        let spec = AggregationSpec::group_mean("Year", "Net Price");
        assert_eq!(aggregate(&t, &spec).unwrap(), aggregate(&t, &spec).unwrap());
    }
}
