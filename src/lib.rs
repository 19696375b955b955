//! Customer metrics: derives tip, tenure, location and spend-ratio fields
//! from a per-customer summary table and renders summary bar charts.
//!
//! The derivation itself is pure (`derive::CustomerMetricsDeriver`); file
//! reading and writing live in `table`, and the binaries are thin callers.

pub mod charts;
pub mod config;
pub mod dates;
pub mod derive;
pub mod error;
pub mod models;
pub mod summary;
pub mod table;

pub use config::MetricsConfig;
pub use derive::CustomerMetricsDeriver;
pub use error::{MetricsError, Result};
pub use models::{CustomerRecord, CustomerTerm, CustomerType, DerivedMetrics, PreferredLocation};
pub use table::CustomerTable;
