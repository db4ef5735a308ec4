use std::collections::BTreeSet;

use serde::Serialize;

use crate::aggregate::{aggregate, scalar, AggregationSpec, DerivedView, EmptyPolicy, ScalarOp};
use crate::config::DashboardConfig;
use crate::data::filter::apply;
use crate::data::loader::load_file;
use crate::data::model::{Table, Value};
use crate::data::schema::{DAY, DAY_NAME, MONTH, YEAR};
use crate::error::{Error, Result};

pub const SEGMENT: &str = "Segment";
pub const RECENCY: &str = "Recency";
pub const FREQUENCY: &str = "Frequency";
pub const MONETARY: &str = "Monetary";
pub const STATUS: &str = "Status";
pub const TYPE: &str = "Type";
pub const NET_PRICE: &str = "Net Price";

/// Group columns for the "Average Net Price by ..." series, with chart titles.
const NET_PRICE_BREAKDOWNS: [(&str, &str); 6] = [
    (YEAR, "Average by Year"),
    (MONTH, "Average by Month"),
    (DAY_NAME, "Average by DayName"),
    (DAY, "Average by Day"),
    (STATUS, "Average by Status"),
    (TYPE, "Average by Type"),
];

// ---------------------------------------------------------------------------
// Selection – the two filter inputs
// ---------------------------------------------------------------------------

/// Accepted Segment labels (RFM table) and Year values (sales table).
/// An empty set selects nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub segments: BTreeSet<Value>,
    pub years: BTreeSet<Value>,
}

impl Selection {
    /// Toggle a single segment in or out of the selection.
    pub fn toggle_segment(&mut self, value: &Value) {
        toggle(&mut self.segments, value);
    }

    /// Toggle a single year in or out of the selection.
    pub fn toggle_year(&mut self, value: &Value) {
        toggle(&mut self.years, value);
    }
}

fn toggle(set: &mut BTreeSet<Value>, value: &Value) {
    if !set.remove(value) {
        set.insert(value.clone());
    }
}

// ---------------------------------------------------------------------------
// Report – everything the dashboard displays
// ---------------------------------------------------------------------------

/// A headline number. `value` is `None` when it is undefined for the
/// current selection (an average over zero rows).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Kpi {
    pub label: String,
    pub value: Option<f64>,
    /// Decimal places to show.
    pub precision: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiSection {
    pub title: String,
    pub kpis: Vec<Kpi>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chart {
    pub title: String,
    pub column: String,
    pub view: DerivedView,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardReport {
    pub kpis: Vec<KpiSection>,
    pub charts: Vec<Chart>,
    /// The RFM rows passing the segment filter.
    pub rfm_table: Table,
}

impl DashboardReport {
    /// Find a KPI by label across all sections.
    pub fn kpi(&self, label: &str) -> Option<&Kpi> {
        self.kpis
            .iter()
            .flat_map(|s| &s.kpis)
            .find(|k| k.label == label)
    }

    pub fn chart(&self, title: &str) -> Option<&Chart> {
        self.charts.iter().find(|c| c.title == title)
    }
}

// ---------------------------------------------------------------------------
// Dashboard – the loaded, read-only tables
// ---------------------------------------------------------------------------

/// Both source tables, loaded once and never modified afterwards.
#[derive(Debug, Clone)]
pub struct Dashboard {
    rfm: Table,
    sales: Table,
}

impl Dashboard {
    /// Wrap already-loaded tables, checking the columns the report reads.
    pub fn new(rfm: Table, sales: Table) -> Result<Self> {
        require(&rfm, "RFM", &[SEGMENT, RECENCY, FREQUENCY, MONETARY])?;
        require(
            &sales,
            "sales",
            &[YEAR, MONTH, DAY, DAY_NAME, STATUS, TYPE, NET_PRICE],
        )?;
        Ok(Dashboard { rfm, sales })
    }

    /// Load both sources described by `config`.
    pub fn load(config: &DashboardConfig) -> Result<Self> {
        let rfm = load_file(&config.rfm.path, &config.rfm.schema)?;
        let sales = load_file(&config.sales.path, &config.sales.schema)?;
        Dashboard::new(rfm, sales)
    }

    pub fn rfm(&self) -> &Table {
        &self.rfm
    }

    pub fn sales(&self) -> &Table {
        &self.sales
    }

    /// Every segment and every year selected.
    pub fn default_selection(&self) -> Result<Selection> {
        Ok(Selection {
            segments: self.rfm.unique_values(SEGMENT)?,
            years: self.sales.unique_values(YEAR)?,
        })
    }

    /// Build a selection from user-typed labels, matched against the
    /// rendered form of each known value. An empty label list selects all
    /// values of that column.
    pub fn selection_from_labels(&self, segments: &[String], years: &[String]) -> Result<Selection> {
        let all = self.default_selection()?;
        Ok(Selection {
            segments: match_labels(all.segments, segments, SEGMENT),
            years: match_labels(all.years, years, YEAR),
        })
    }

    /// Compute every view for the given selection.
    pub fn report(&self, selection: &Selection) -> Result<DashboardReport> {
        let rfm = apply(&self.rfm, SEGMENT, &selection.segments)?;
        let sales = apply(&self.sales, YEAR, &selection.years)?;
        log::debug!(
            "Selection keeps {} customers and {} transactions",
            rfm.len(),
            sales.len()
        );

        let kpis = vec![
            KpiSection {
                title: "Averages".to_string(),
                kpis: vec![
                    kpi(&rfm, "Avg Recency (days)", RECENCY, ScalarOp::Mean, 1)?,
                    kpi(&rfm, "Avg Frequency", FREQUENCY, ScalarOp::Mean, 1)?,
                    kpi(&rfm, "Avg Monetary", MONETARY, ScalarOp::Mean, 1)?,
                ],
            },
            KpiSection {
                title: "Totals".to_string(),
                kpis: vec![
                    kpi(&rfm, "Total Frequency", FREQUENCY, ScalarOp::Sum, 0)?,
                    kpi(&rfm, "Total Monetary", MONETARY, ScalarOp::Sum, 2)?,
                ],
            },
            KpiSection {
                title: "Counts".to_string(),
                kpis: vec![
                    kpi(&rfm, "Count of Customers", SEGMENT, ScalarOp::Count, 0)?,
                    kpi(&rfm, "Count of Transactions", FREQUENCY, ScalarOp::Sum, 0)?,
                    kpi(&rfm, "Count of Segments", SEGMENT, ScalarOp::CountDistinct, 0)?,
                ],
            },
        ];

        let mut charts = vec![
            chart(&rfm, "Customer Segments", AggregationSpec::distribution(SEGMENT))?,
            chart(&sales, "Status Distribution", AggregationSpec::distribution(STATUS))?,
            chart(&sales, "Type Distribution", AggregationSpec::distribution(TYPE))?,
        ];
        for (column, title) in NET_PRICE_BREAKDOWNS {
            charts.push(chart(
                &sales,
                title,
                AggregationSpec::group_mean(column, NET_PRICE),
            )?);
        }

        Ok(DashboardReport {
            kpis,
            charts,
            rfm_table: rfm,
        })
    }
}

fn require(table: &Table, name: &str, columns: &[&str]) -> Result<()> {
    match columns.iter().find(|c| !table.has_column(c)) {
        Some(missing) => Err(Error::Schema(format!(
            "{name} table is missing column '{missing}'"
        ))),
        None => Ok(()),
    }
}

fn match_labels(known: BTreeSet<Value>, labels: &[String], column: &str) -> BTreeSet<Value> {
    if labels.is_empty() {
        return known;
    }
    for label in labels {
        if !known.iter().any(|v| v.to_string() == *label) {
            log::warn!("No {column} value matches '{label}'");
        }
    }
    known
        .into_iter()
        .filter(|v| labels.contains(&v.to_string()))
        .collect()
}

/// Sums over an empty selection are zero; averages are undefined.
fn kpi(table: &Table, label: &str, column: &str, op: ScalarOp, precision: usize) -> Result<Kpi> {
    let on_empty = match op {
        ScalarOp::Sum => EmptyPolicy::Zero,
        _ => EmptyPolicy::Error,
    };
    let value = match scalar(table, column, op, on_empty) {
        Ok(v) => Some(v),
        Err(Error::EmptyAggregation { .. }) => {
            log::warn!("{label} is undefined for the current selection");
            None
        }
        Err(e) => return Err(e),
    };
    Ok(Kpi {
        label: label.to_string(),
        value,
        precision,
    })
}

fn chart(table: &Table, title: &str, spec: AggregationSpec) -> Result<Chart> {
    let column = match &spec {
        AggregationSpec::Scalar { column, .. } | AggregationSpec::Distribution { column } => {
            column.clone()
        }
        AggregationSpec::GroupMean { group_column, .. } => group_column.clone(),
    };
    Ok(Chart {
        title: title.to_string(),
        column,
        view: aggregate(table, &spec)?,
    })
}
