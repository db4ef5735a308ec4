//! rfm-dash: filtered KPIs, distributions and group-by averages over a
//! customer RFM segmentation table and a sales transaction log.
//!
//! Tables are loaded once into an immutable [`Dashboard`]; every view is a
//! pure function of a table, a filter selection and an aggregation spec.

pub mod aggregate;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod data;
pub mod error;
pub mod render;

// Re-export public items for easier access
pub use aggregate::{aggregate, AggregationSpec, DerivedView, EmptyPolicy, ScalarOp};
pub use cli::{Args, OutputFormat};
pub use config::{DashboardConfig, SourceConfig};
pub use dashboard::{Dashboard, DashboardReport, Kpi, Selection};
pub use data::filter::{apply, apply_all, init_filter_state, FilterState};
pub use data::loader::load_file;
pub use data::model::{Table, Value};
pub use data::schema::Schema;
pub use error::{Error, Result};
