use chrono::{Datelike, NaiveDate, Weekday};

use super::model::{Table, Value};
use crate::error::{Error, Result};

/// Default exact format for the transaction date column.
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Columns appended to a table that carries a date column.
pub const YEAR: &str = "Year";
pub const MONTH: &str = "Month";
pub const DAY: &str = "Day";
pub const DAY_NAME: &str = "DayName";

// ---------------------------------------------------------------------------
// Schema – what a source must look like and how it is normalized
// ---------------------------------------------------------------------------

/// Describes the fixed layout of one tabular source.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    /// Columns that must be present after loading.
    pub required: Vec<String>,
    /// Non-analytic columns removed at load time.
    pub drop: Vec<String>,
    /// Column parsed into a calendar date, with derived Year/Month/Day/DayName.
    pub date_column: Option<String>,
    /// `chrono` format string the date column must match exactly.
    pub date_format: String,
}

impl Default for Schema {
    fn default() -> Self {
        Schema {
            required: Vec::new(),
            drop: Vec::new(),
            date_column: None,
            date_format: DEFAULT_DATE_FORMAT.to_string(),
        }
    }
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl Schema {
    /// Customer segmentation table: one row per customer.
    pub fn rfm() -> Self {
        Schema {
            required: names(&["Recency", "Frequency", "Monetary", "Segment"]),
            drop: names(&["Unnamed: 0"]),
            ..Schema::default()
        }
    }

    /// Raw sales transaction log.
    pub fn sales() -> Self {
        Schema {
            required: names(&["Date", "Status", "Type", "Net Price"]),
            drop: names(&["#", "Quotation No", "Branch", "From", "Remark", "Due Price"]),
            date_column: Some("Date".to_string()),
            date_format: DEFAULT_DATE_FORMAT.to_string(),
        }
    }

    /// Prune, type-coerce and extend a raw table according to this schema.
    pub fn normalize(&self, raw: Table) -> Result<Table> {
        for col in &self.required {
            if !raw.has_column(col) {
                return Err(Error::Schema(format!("missing required column '{col}'")));
            }
        }

        let mut table = raw.without_columns(&self.drop);

        if let Some(date_col) = &self.date_column {
            if !table.has_column(date_col) {
                return Err(Error::Schema(format!("missing date column '{date_col}'")));
            }
            let dates = table
                .column(date_col)?
                .enumerate()
                .map(|(row, v)| parse_date(v, &self.date_format, row, date_col))
                .collect::<Result<Vec<Option<NaiveDate>>>>()?;

            let derive = |f: fn(NaiveDate) -> Value| -> Vec<Value> {
                dates
                    .iter()
                    .map(|d| d.map(f).unwrap_or(Value::Null))
                    .collect()
            };

            table = table
                .with_column(date_col, derive(Value::Date))?
                .with_column(YEAR, derive(|d: NaiveDate| Value::Integer(d.year() as i64)))?
                .with_column(MONTH, derive(|d: NaiveDate| Value::Integer(d.month() as i64)))?
                .with_column(DAY, derive(|d: NaiveDate| Value::Integer(d.day() as i64)))?
                .with_column(DAY_NAME, derive(|d: NaiveDate| Value::from(day_name(d.weekday()))))?;
        }

        Ok(table)
    }
}

/// Parse one date cell. Cells already typed as dates are accepted as-is,
/// Null stays missing, strings must match `format` exactly.
fn parse_date(value: &Value, format: &str, row: usize, column: &str) -> Result<Option<NaiveDate>> {
    match value {
        Value::Date(d) => Ok(Some(*d)),
        Value::Null => Ok(None),
        Value::String(s) => NaiveDate::parse_from_str(s.trim(), format)
            .map(Some)
            .map_err(|e| {
                Error::Schema(format!(
                    "row {row}: '{s}' in column '{column}' does not match date format '{format}': {e}"
                ))
            }),
        other => Err(Error::Schema(format!(
            "row {row}: column '{column}' holds a {} value, expected a date",
            other.type_name()
        ))),
    }
}

/// Locale-independent English weekday name.
pub fn day_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_sales(dates: &[Value]) -> Table {
        let columns = names(&["#", "Date", "Status", "Type", "Net Price", "Remark"]);
        let rows = dates
            .iter()
            .enumerate()
            .map(|(i, d)| {
                vec![
                    Value::Integer(i as i64),
                    d.clone(),
                    Value::from("Paid"),
                    Value::from("Retail"),
                    Value::Float(10.0),
                    Value::Null,
                ]
            })
            .collect();
        Table::new(columns, rows).unwrap()
    }

    #[test]
    fn sales_schema_prunes_and_derives_date_parts() {
        let table = Schema::sales()
            .normalize(raw_sales(&[Value::from("2024-02-29"), Value::from("2023-01-01")]))
            .unwrap();

        assert_eq!(
            table.column_names(),
            &names(&["Date", "Status", "Type", "Net Price", "Year", "Month", "Day", "DayName"])[..]
        );
        assert_eq!(
            table.rows()[0][4..],
            [
                Value::Integer(2024),
                Value::Integer(2),
                Value::Integer(29),
                Value::from("Thursday"),
            ]
        );
        assert_eq!(table.value(1, DAY_NAME).unwrap(), Some(&Value::from("Sunday")));
        assert_eq!(
            table.value(1, "Date").unwrap(),
            Some(&Value::Date(NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()))
        );
    }

    #[test]
    fn date_format_must_match_exactly() {
        let err = Schema::sales()
            .normalize(raw_sales(&[Value::from("2024-01-02"), Value::from("02/01/2024")]))
            .unwrap_err();
        match err {
            Error::Schema(msg) => assert!(msg.contains("row 1"), "{msg}"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn null_date_leaves_derived_fields_null() {
        let table = Schema::sales().normalize(raw_sales(&[Value::Null])).unwrap();
        assert_eq!(table.value(0, YEAR).unwrap(), Some(&Value::Null));
        assert_eq!(table.value(0, DAY_NAME).unwrap(), Some(&Value::Null));
    }

    #[test]
    fn missing_required_column_is_a_schema_error() {
        let raw = Table::new(names(&["Recency", "Frequency", "Segment"]), Vec::new()).unwrap();
        let err = Schema::rfm().normalize(raw).unwrap_err();
        assert!(matches!(err, Error::Schema(ref m) if m.contains("Monetary")));
    }

    #[test]
    fn absent_drop_columns_are_ignored() {
        let raw = Table::new(
            names(&["Recency", "Frequency", "Monetary", "Segment"]),
            vec![vec![
                Value::Integer(3),
                Value::Integer(1),
                Value::Float(9.5),
                Value::from("Champions"),
            ]],
        )
        .unwrap();
        let table = Schema::rfm().normalize(raw.clone()).unwrap();
        assert_eq!(table, raw);
    }
}
