//! Calendar constants and rounding precision used by the deriver.
//!
//! The defaults reproduce the fixed windows of the 2024-10 analysis pass.
//! A JSON file with the same shape can override any of them.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{MetricsError, Result};
use crate::models::CustomerTerm;

/// Closed calendar interval, both ends inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    fn overlaps(&self, other: &DateWindow) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermWindow {
    pub term: CustomerTerm,
    #[serde(flatten)]
    pub window: DateWindow,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Tenure buckets keyed on first order date
    pub term_windows: Vec<TermWindow>,
    /// Last order date must fall here for `customer_term` to be set
    pub recency_gate: DateWindow,
    /// Precision of average_tip and avg_tip_percentage
    pub tip_decimals: u32,
    /// Precision of the favorite category/item spend ratios
    pub spend_ratio_decimals: u32,
}

/// Past this many places an f64 has no digits left to round.
pub const MAX_DECIMALS: u32 = 15;

fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            term_windows: vec![
                TermWindow {
                    term: CustomerTerm::LongTerm,
                    window: DateWindow::new(ymd(2015, 1, 1), ymd(2017, 12, 31)),
                },
                TermWindow {
                    term: CustomerTerm::MediumTerm,
                    window: DateWindow::new(ymd(2018, 1, 1), ymd(2021, 12, 31)),
                },
                TermWindow {
                    term: CustomerTerm::ShortTerm,
                    window: DateWindow::new(ymd(2022, 1, 1), ymd(2024, 12, 31)),
                },
            ],
            recency_gate: DateWindow::new(ymd(2023, 10, 14), ymd(2024, 10, 14)),
            tip_decimals: 2,
            spend_ratio_decimals: 4,
        }
    }
}

impl MetricsConfig {
    /// Load from a JSON file; fields left out keep their defaults.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config: MetricsConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Built-in defaults unless a config file is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::from_path(p),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        for tw in &self.term_windows {
            if tw.window.start > tw.window.end {
                return Err(MetricsError::Config(format!(
                    "{} window starts after it ends ({} > {})",
                    tw.term, tw.window.start, tw.window.end
                )));
            }
        }
        for (i, a) in self.term_windows.iter().enumerate() {
            for b in &self.term_windows[i + 1..] {
                if a.window.overlaps(&b.window) {
                    return Err(MetricsError::Config(format!(
                        "{} and {} windows overlap",
                        a.term, b.term
                    )));
                }
            }
        }
        if self.recency_gate.start > self.recency_gate.end {
            return Err(MetricsError::Config(
                "recency gate starts after it ends".to_string(),
            ));
        }
        for (name, decimals) in [
            ("tip_decimals", self.tip_decimals),
            ("spend_ratio_decimals", self.spend_ratio_decimals),
        ] {
            if decimals > MAX_DECIMALS {
                return Err(MetricsError::Config(format!(
                    "{} must be at most {}, got {}",
                    name, MAX_DECIMALS, decimals
                )));
            }
        }
        Ok(())
    }

    pub fn term_for(&self, date: NaiveDate) -> Option<CustomerTerm> {
        self.term_windows
            .iter()
            .find(|tw| tw.window.contains(date))
            .map(|tw| tw.term)
    }

    pub fn within_recency_gate(&self, date: NaiveDate) -> bool {
        self.recency_gate.contains(date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(MetricsConfig::default().validate().is_ok());
    }

    #[test]
    fn test_term_boundaries_are_inclusive() {
        let config = MetricsConfig::default();
        assert_eq!(config.term_for(ymd(2015, 1, 1)), Some(CustomerTerm::LongTerm));
        assert_eq!(config.term_for(ymd(2017, 12, 31)), Some(CustomerTerm::LongTerm));
        assert_eq!(config.term_for(ymd(2018, 1, 1)), Some(CustomerTerm::MediumTerm));
        assert_eq!(config.term_for(ymd(2021, 12, 31)), Some(CustomerTerm::MediumTerm));
        assert_eq!(config.term_for(ymd(2022, 1, 1)), Some(CustomerTerm::ShortTerm));
        assert_eq!(config.term_for(ymd(2024, 12, 31)), Some(CustomerTerm::ShortTerm));
        assert_eq!(config.term_for(ymd(2014, 12, 31)), None);
        assert_eq!(config.term_for(ymd(2025, 1, 1)), None);
    }

    #[test]
    fn test_recency_gate() {
        let config = MetricsConfig::default();
        assert!(config.within_recency_gate(ymd(2023, 10, 14)));
        assert!(config.within_recency_gate(ymd(2024, 10, 14)));
        assert!(!config.within_recency_gate(ymd(2023, 10, 13)));
        assert!(!config.within_recency_gate(ymd(2024, 10, 15)));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: MetricsConfig = serde_json::from_str(
            r#"{ "recency_gate": { "start": "2024-01-01", "end": "2024-06-30" } }"#,
        )
        .unwrap();
        assert_eq!(config.recency_gate, DateWindow::new(ymd(2024, 1, 1), ymd(2024, 6, 30)));
        assert_eq!(config.term_windows, MetricsConfig::default().term_windows);
        assert_eq!(config.spend_ratio_decimals, 4);
    }

    #[test]
    fn test_term_windows_from_json() {
        let config: MetricsConfig = serde_json::from_str(
            r#"{ "term_windows": [
                { "term": "long-term", "start": "2010-01-01", "end": "2019-12-31" },
                { "term": "short-term", "start": "2020-01-01", "end": "2025-12-31" }
            ] }"#,
        )
        .unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.term_for(ymd(2019, 6, 1)), Some(CustomerTerm::LongTerm));
        assert_eq!(config.term_for(ymd(2025, 6, 1)), Some(CustomerTerm::ShortTerm));
    }

    #[test]
    fn test_overlapping_windows_rejected() {
        let mut config = MetricsConfig::default();
        config.term_windows[1].window.start = ymd(2017, 12, 31);
        assert!(matches!(config.validate(), Err(MetricsError::Config(_))));
    }

    #[test]
    fn test_excessive_precision_rejected() {
        let config: MetricsConfig = serde_json::from_str(r#"{ "tip_decimals": 400 }"#).unwrap();
        assert!(matches!(config.validate(), Err(MetricsError::Config(_))));

        let config: MetricsConfig =
            serde_json::from_str(r#"{ "spend_ratio_decimals": 16 }"#).unwrap();
        assert!(matches!(config.validate(), Err(MetricsError::Config(_))));

        let config: MetricsConfig =
            serde_json::from_str(r#"{ "spend_ratio_decimals": 15 }"#).unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_config_file_is_io_error() {
        let result = MetricsConfig::load(Some(Path::new("/nonexistent/metrics.json")));
        assert!(matches!(result, Err(MetricsError::Io(_))));
    }
}
