//! Integration tests for rfm-dash

use std::collections::BTreeSet;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use arrow::array::{Date32Array, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema as ArrowSchema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use tempfile::{Builder, NamedTempFile, TempDir};

use rfm_dash::render::render_text;
use rfm_dash::{
    aggregate, apply, AggregationSpec, Dashboard, DashboardConfig, DerivedView, Error, ScalarOp,
    Schema, SourceConfig, Table, Value,
};

/// Create an RFM export as pandas writes it (with the index column)
fn create_rfm_csv() -> NamedTempFile {
    let mut file = Builder::new().suffix(".csv").tempfile().unwrap();
    writeln!(file, "Unnamed: 0,Recency,Frequency,Monetary,Segment").unwrap();
    writeln!(file, "0,10,5,500.0,A").unwrap();
    writeln!(file, "1,20,3,250.5,A").unwrap();
    writeln!(file, "2,5,12,1300.25,B").unwrap();
    writeln!(file, "3,300,1,19.99,Lost").unwrap();
    file
}

/// Create a sales log carrying the non-analytic columns that get dropped
fn create_sales_csv() -> NamedTempFile {
    let mut file = Builder::new().suffix(".csv").tempfile().unwrap();
    writeln!(
        file,
        "#,Quotation No,Date,Branch,From,Status,Type,Net Price,Due Price,Remark"
    )
    .unwrap();
    writeln!(file, "1,Q-1,2022-01-03,Dammam,Web,Paid,Retail,100.0,0,").unwrap();
    writeln!(file, "2,Q-2,2022-01-04,Dammam,Web,Paid,Wholesale,300.0,0,").unwrap();
    writeln!(file, "3,Q-3,2023-06-10,Dammam,Shop,Pending,Retail,40.0,40,late").unwrap();
    file
}

fn write_sales_parquet(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("sales.parquet");
    let schema = Arc::new(ArrowSchema::new(vec![
        Field::new("Date", DataType::Date32, true),
        Field::new("Status", DataType::Utf8, false),
        Field::new("Type", DataType::Utf8, false),
        Field::new("Net Price", DataType::Float64, false),
    ]));
    // 2022-01-03 and 2023-06-10 as days since the epoch
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Date32Array::from(vec![18995, 19518])),
            Arc::new(StringArray::from(vec!["Paid", "Refunded"])),
            Arc::new(StringArray::from(vec!["Retail", "Retail"])),
            Arc::new(Float64Array::from(vec![100.0, -40.0])),
        ],
    )
    .unwrap();
    let file = std::fs::File::create(&path).unwrap();
    let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();
    path
}

fn config(rfm: &NamedTempFile, sales: PathBuf) -> DashboardConfig {
    DashboardConfig {
        rfm: SourceConfig {
            path: rfm.path().to_path_buf(),
            schema: Schema::rfm(),
        },
        sales: SourceConfig {
            path: sales,
            schema: Schema::sales(),
        },
    }
}

fn set(values: &[Value]) -> BTreeSet<Value> {
    values.iter().cloned().collect()
}

#[test]
fn test_end_to_end_csv() {
    let rfm = create_rfm_csv();
    let sales = create_sales_csv();
    let dashboard = Dashboard::load(&config(&rfm, sales.path().to_path_buf())).unwrap();

    assert_eq!(
        dashboard.sales().column_names(),
        &["Date", "Status", "Type", "Net Price", "Year", "Month", "Day", "DayName"]
    );
    assert!(!dashboard.rfm().has_column("Unnamed: 0"));

    let selection = dashboard
        .selection_from_labels(&["A".to_string()], &["2022".to_string()])
        .unwrap();
    let report = dashboard.report(&selection).unwrap();

    assert_eq!(report.kpi("Avg Recency (days)").unwrap().value, Some(15.0));
    assert_eq!(report.kpi("Total Frequency").unwrap().value, Some(8.0));
    assert_eq!(report.kpi("Count of Customers").unwrap().value, Some(2.0));
    assert_eq!(report.rfm_table.len(), 2);

    let by_status = report.chart("Average by Status").unwrap();
    assert_eq!(
        by_status.view.as_series().unwrap(),
        &[(Value::from("Paid"), 200.0)]
    );
    let by_day_name = report.chart("Average by DayName").unwrap();
    assert_eq!(
        by_day_name.view.as_series().unwrap(),
        &[(Value::from("Monday"), 100.0), (Value::from("Tuesday"), 300.0)]
    );

    let text = render_text(&report).unwrap();
    assert!(text.contains("Avg Recency (days)"));
    assert!(text.contains("15.0"));

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["charts"][0]["view"]["kind"], "distribution");
    assert_eq!(json["rfm_table"]["rows"].as_array().unwrap().len(), 2);
}

#[test]
fn test_parquet_sales_with_native_dates() {
    let rfm = create_rfm_csv();
    let dir = TempDir::new().unwrap();
    let dashboard = Dashboard::load(&config(&rfm, write_sales_parquet(&dir))).unwrap();

    let years = dashboard.sales().unique_values("Year").unwrap();
    assert_eq!(years, set(&[Value::Integer(2022), Value::Integer(2023)]));

    let report = dashboard.report(&dashboard.default_selection().unwrap()).unwrap();
    let status = report.chart("Status Distribution").unwrap();
    assert_eq!(
        status.view.as_distribution().unwrap(),
        &[(Value::from("Paid"), 1), (Value::from("Refunded"), 1)]
    );
}

#[test]
fn test_refunded_group_absent_when_filtered_out() {
    let rfm = create_rfm_csv();
    let dir = TempDir::new().unwrap();
    let dashboard = Dashboard::load(&config(&rfm, write_sales_parquet(&dir))).unwrap();

    let sales_2022 = apply(dashboard.sales(), "Year", &set(&[Value::Integer(2022)])).unwrap();
    let view = aggregate(
        &sales_2022,
        &AggregationSpec::group_mean("Status", "Net Price"),
    )
    .unwrap();
    let series = view.as_series().unwrap();
    assert!(series.iter().all(|(k, _)| *k != Value::from("Refunded")));
    assert_eq!(series, &[(Value::from("Paid"), 100.0)]);
}

#[test]
fn test_bad_date_format_is_schema_error() {
    let rfm = create_rfm_csv();
    let mut sales = Builder::new().suffix(".csv").tempfile().unwrap();
    writeln!(sales, "Date,Status,Type,Net Price").unwrap();
    writeln!(sales, "03/01/2022,Paid,Retail,10").unwrap();

    let err = Dashboard::load(&config(&rfm, sales.path().to_path_buf())).unwrap_err();
    assert!(matches!(err, Error::Schema(_)));
}

#[test]
fn test_missing_column_is_schema_error() {
    let rfm = create_rfm_csv();
    let mut sales = Builder::new().suffix(".csv").tempfile().unwrap();
    writeln!(sales, "Date,Status,Net Price").unwrap();
    writeln!(sales, "2022-01-03,Paid,10").unwrap();

    let err = Dashboard::load(&config(&rfm, sales.path().to_path_buf())).unwrap_err();
    assert!(matches!(err, Error::Schema(m) if m.contains("Type")));
}

#[test]
fn test_filter_then_aggregate_properties() {
    let table = Table::new(
        vec!["Segment".into(), "Recency".into()],
        vec![
            vec![Value::from("A"), Value::Integer(10)],
            vec![Value::from("A"), Value::Integer(20)],
            vec![Value::from("B"), Value::Integer(5)],
        ],
    )
    .unwrap();

    let filtered = apply(&table, "Segment", &set(&[Value::from("A")])).unwrap();
    let mean = AggregationSpec::scalar("Recency", ScalarOp::Mean);
    assert_eq!(aggregate(&filtered, &mean).unwrap(), DerivedView::Scalar(15.0));

    let none = apply(&table, "Segment", &BTreeSet::new()).unwrap();
    assert_eq!(
        aggregate(&none, &AggregationSpec::scalar("Recency", ScalarOp::Count)).unwrap(),
        DerivedView::Scalar(0.0)
    );
    assert!(matches!(
        aggregate(&none, &mean),
        Err(Error::EmptyAggregation { .. })
    ));

    let dist = aggregate(&table, &AggregationSpec::distribution("Segment")).unwrap();
    let counts = dist.as_distribution().unwrap();
    assert_eq!(counts.iter().map(|(_, n)| n).sum::<usize>(), table.len());
    assert_eq!(counts.len(), table.unique_values("Segment").unwrap().len());
}
