//! Source locations and schemas, optionally read from a JSON file.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::data::schema::Schema;
use crate::error::Result;

/// One tabular source: where it lives and how to normalize it.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceConfig {
    pub path: PathBuf,
    pub schema: Schema,
}

/// Both sources. Deserialized field by field over the built-in presets, so a
/// file only needs to name what differs.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "ConfigFile")]
pub struct DashboardConfig {
    pub rfm: SourceConfig,
    pub sales: SourceConfig,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        DashboardConfig {
            rfm: SourceConfig {
                path: PathBuf::from("rfm_analysis.csv"),
                schema: Schema::rfm(),
            },
            sales: SourceConfig {
                path: PathBuf::from("sales.parquet"),
                schema: Schema::sales(),
            },
        }
    }
}

/// On-disk layout: every field optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    rfm: Option<SourceOverrides>,
    sales: Option<SourceOverrides>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct SourceOverrides {
    path: Option<PathBuf>,
    required: Option<Vec<String>>,
    drop: Option<Vec<String>>,
    date_column: Option<String>,
    date_format: Option<String>,
}

impl SourceOverrides {
    fn merge_into(self, mut base: SourceConfig) -> SourceConfig {
        if let Some(path) = self.path {
            base.path = path;
        }
        if let Some(required) = self.required {
            base.schema.required = required;
        }
        if let Some(drop) = self.drop {
            base.schema.drop = drop;
        }
        if let Some(date_column) = self.date_column {
            base.schema.date_column = Some(date_column);
        }
        if let Some(date_format) = self.date_format {
            base.schema.date_format = date_format;
        }
        base
    }
}

impl From<ConfigFile> for DashboardConfig {
    fn from(file: ConfigFile) -> Self {
        let defaults = DashboardConfig::default();
        DashboardConfig {
            rfm: file.rfm.unwrap_or_default().merge_into(defaults.rfm),
            sales: file.sales.unwrap_or_default().merge_into(defaults.sales),
        }
    }
}

impl DashboardConfig {
    /// Read a config file. Anything left out keeps its default.
    ///
    /// ```json
    /// {
    ///   "sales": {
    ///     "path": "data/sales.parquet",
    ///     "drop": ["#", "Branch"],
    ///     "date_format": "%d/%m/%Y"
    ///   }
    /// }
    /// ```
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: DashboardConfig = serde_json::from_str(&contents)?;
        Ok(config)
    }
}
