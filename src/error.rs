use thiserror::Error;

/// Errors raised while loading, filtering or aggregating tables.
#[derive(Debug, Error)]
pub enum Error {
    /// The source is missing an expected column or holds a malformed date.
    #[error("schema error: {0}")]
    Schema(String),

    #[error("column not found: '{0}'")]
    ColumnNotFound(String),

    /// A numeric aggregation was requested over a non-numeric column.
    #[error("cannot compute {op} over column '{column}': found {found} value")]
    Type {
        column: String,
        op: &'static str,
        found: &'static str,
    },

    /// `mean` / `sum` over zero rows without a zero-default policy.
    #[error("cannot compute {op} over column '{column}': no rows")]
    EmptyAggregation { column: String, op: &'static str },

    #[error("unsupported file extension: .{0}")]
    UnsupportedFormat(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
}

pub type Result<T> = std::result::Result<T, Error>;
