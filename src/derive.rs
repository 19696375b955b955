//! Per-customer derived metrics: tip averages, order-volume type, tenure
//! term, preferred location and favorite spend ratios.
//!
//! Every record is handled on its own; the only shared input is the
//! `MetricsConfig` calendar constants.

use tracing::debug;

use crate::config::{MetricsConfig, MAX_DECIMALS};
use crate::error::Result;
use crate::models::{CustomerRecord, CustomerType, DerivedMetrics, PreferredLocation};
use crate::table::CustomerTable;

/// Round half to even at `decimals` places, capped at `MAX_DECIMALS`.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals.min(MAX_DECIMALS) as i32);
    (value * factor).round_ties_even() / factor
}

/// `numerator / denominator` rounded, or None when either side is absent,
/// the denominator is zero, or the result is not finite.
pub fn safe_ratio(numerator: Option<f64>, denominator: Option<f64>, decimals: u32) -> Option<f64> {
    let (numerator, denominator) = (numerator?, denominator?);
    if denominator == 0.0 {
        return None;
    }
    Some(round_to(numerator / denominator, decimals)).filter(|v| v.is_finite())
}

#[derive(Debug, Clone, Default)]
pub struct CustomerMetricsDeriver {
    config: MetricsConfig,
}

impl CustomerMetricsDeriver {
    pub fn new(config: MetricsConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MetricsConfig {
        &self.config
    }

    pub fn derive(&self, record: &CustomerRecord) -> DerivedMetrics {
        let config = &self.config;

        let average_tip = safe_ratio(
            record.total_tips,
            record.total_orders.map(|n| n as f64),
            config.tip_decimals,
        );
        // Uses the already rounded average tip.
        let avg_tip_percentage =
            safe_ratio(average_tip, record.average_order_value, config.tip_decimals);

        let customer_term_full = record
            .first_order_date
            .and_then(|dt| config.term_for(dt.date()));
        let recently_active = record
            .last_order_date
            .is_some_and(|dt| config.within_recency_gate(dt.date()));
        let customer_term = if recently_active {
            customer_term_full
        } else {
            None
        };

        let preferred_location = match (record.front_total_spent, record.central_total_spent) {
            (Some(front), Some(central)) => Some(PreferredLocation::from_spend(front, central)),
            _ => None,
        };

        DerivedMetrics {
            average_tip,
            avg_tip_percentage,
            customer_type: record.total_orders.map(CustomerType::from_total_orders),
            customer_term,
            preferred_location,
            customer_term_full,
            favorite_category_spend_ratio: safe_ratio(
                record.favorite_category_spend_dollars,
                record.total_spent,
                config.spend_ratio_decimals,
            ),
            favorite_item_spend_ratio: safe_ratio(
                record.favorite_item_spend_dollars,
                record.total_spent,
                config.spend_ratio_decimals,
            ),
        }
    }

    /// Derive every record, preserving input order
    pub fn derive_all(&self, records: &[CustomerRecord]) -> Vec<DerivedMetrics> {
        records.iter().map(|r| self.derive(r)).collect()
    }

    /// Read records from `table`, derive, and return the augmented table.
    pub fn derive_table(&self, table: &CustomerTable) -> Result<CustomerTable> {
        let records = table.records()?;
        let derived = self.derive_all(&records);
        debug!("Derived metrics for {} customers", derived.len());
        table.with_derived(&derived)
    }
}
