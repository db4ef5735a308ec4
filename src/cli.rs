//! Command-line interface definitions and argument parsing

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::DashboardConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Filtered KPIs, distributions and averages over RFM and sales data
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// JSON file describing both sources (paths, dropped columns, date format)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Path to the RFM segmentation table (overrides the config)
    #[arg(long)]
    pub rfm: Option<PathBuf>,

    /// Path to the sales transaction log (overrides the config)
    #[arg(long)]
    pub sales: Option<PathBuf>,

    /// Segment to include; repeat for several. Defaults to all segments
    #[arg(short, long = "segment")]
    pub segments: Vec<String>,

    /// Year to include; repeat for several. Defaults to all years
    #[arg(short, long = "year")]
    pub years: Vec<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// The config file (or defaults) with any path overrides applied.
    pub fn resolve_config(&self) -> crate::Result<DashboardConfig> {
        let mut config = match &self.config {
            Some(path) => DashboardConfig::load(path)?,
            None => DashboardConfig::default(),
        };
        if let Some(path) = &self.rfm {
            config.rfm.path = path.clone();
        }
        if let Some(path) = &self.sales {
            config.sales.path = path.clone();
        }
        Ok(config)
    }
}
