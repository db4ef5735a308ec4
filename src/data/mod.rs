/// Data layer: core types, loading, and filtering.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → raw Table
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  schema   │  prune columns, parse dates, derive Year/Month/Day/DayName
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  accepted-value predicates → sub-Table
///   └──────────┘
/// ```

pub mod filter;
pub mod loader;
pub mod model;
pub mod schema;
