use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::dates::parse_timestamp;

/// Derived columns, in the order they are appended to the output table
pub const DERIVED_COLUMNS: [&str; 8] = [
    "average_tip",
    "avg_tip_percentage",
    "customer_type",
    "customer_term",
    "preferred_location",
    "customer_term_full",
    "favorite_category_spend_ratio",
    "favorite_item_spend_ratio",
];

/// Raw row as read from the customer summary CSV.
///
/// Every field is kept as text so one bad cell never rejects the row;
/// `to_record` does the permissive conversion.
#[derive(Debug, Clone, Deserialize)]
pub struct CsvCustomerRow {
    pub total_orders: String,
    pub total_tips: String,
    pub total_spent: String,
    pub average_order_value: String,
    pub front_total_spent: String,
    pub central_total_spent: String,
    pub favorite_category_spend_dollars: String,
    pub favorite_item_spend_dollars: String,
    pub first_order_date: String,
    pub last_order_date: String,
}

/// A cell that was present but could not be read
#[derive(Debug, Clone, PartialEq)]
pub struct FieldIssue {
    pub column: &'static str,
    pub value: String,
}

/// One customer, raw aggregates only
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CustomerRecord {
    pub total_orders: Option<u64>,
    pub total_tips: Option<f64>,
    pub total_spent: Option<f64>,
    pub average_order_value: Option<f64>,
    pub front_total_spent: Option<f64>,
    pub central_total_spent: Option<f64>,
    pub favorite_category_spend_dollars: Option<f64>,
    pub favorite_item_spend_dollars: Option<f64>,
    pub first_order_date: Option<NaiveDateTime>,
    pub last_order_date: Option<NaiveDateTime>,
}

/// Classification by lifetime order volume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CustomerType {
    OneTime,
    Repeat,
    Regular,
    DieHard,
}

impl CustomerType {
    pub fn from_total_orders(total_orders: u64) -> Self {
        match total_orders {
            0..=1 => CustomerType::OneTime,
            2..=10 => CustomerType::Repeat,
            11..=100 => CustomerType::Regular,
            _ => CustomerType::DieHard,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CustomerType::OneTime => "one-time",
            CustomerType::Repeat => "repeat",
            CustomerType::Regular => "regular",
            CustomerType::DieHard => "die-hard",
        }
    }
}

/// Tenure bucket from the first order date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CustomerTerm {
    LongTerm,
    MediumTerm,
    ShortTerm,
}

impl CustomerTerm {
    pub fn as_str(&self) -> &'static str {
        match self {
            CustomerTerm::LongTerm => "long-term",
            CustomerTerm::MediumTerm => "medium-term",
            CustomerTerm::ShortTerm => "short-term",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PreferredLocation {
    Front,
    Central,
}

impl PreferredLocation {
    /// Front only when it strictly outspends central; ties go to central.
    pub fn from_spend(front_total_spent: f64, central_total_spent: f64) -> Self {
        if front_total_spent > central_total_spent {
            PreferredLocation::Front
        } else {
            PreferredLocation::Central
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PreferredLocation::Front => "front",
            PreferredLocation::Central => "central",
        }
    }
}

macro_rules! label_enum_impls {
    ($ty:ty, [$($variant:expr),+]) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.trim();
                [$($variant),+]
                    .into_iter()
                    .find(|v| v.as_str() == s)
                    .ok_or_else(|| format!("unknown {}: {}", stringify!($ty), s))
            }
        }
    };
}

label_enum_impls!(
    CustomerType,
    [
        CustomerType::OneTime,
        CustomerType::Repeat,
        CustomerType::Regular,
        CustomerType::DieHard
    ]
);
label_enum_impls!(
    CustomerTerm,
    [
        CustomerTerm::LongTerm,
        CustomerTerm::MediumTerm,
        CustomerTerm::ShortTerm
    ]
);
label_enum_impls!(
    PreferredLocation,
    [PreferredLocation::Front, PreferredLocation::Central]
);

/// Fields computed for one customer, in output column order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DerivedMetrics {
    pub average_tip: Option<f64>,
    pub avg_tip_percentage: Option<f64>,
    pub customer_type: Option<CustomerType>,
    pub customer_term: Option<CustomerTerm>,
    pub preferred_location: Option<PreferredLocation>,
    pub customer_term_full: Option<CustomerTerm>,
    pub favorite_category_spend_ratio: Option<f64>,
    pub favorite_item_spend_ratio: Option<f64>,
}

impl DerivedMetrics {
    /// Cells for `DERIVED_COLUMNS`; undefined values become empty cells.
    pub fn to_fields(&self) -> [String; 8] {
        [
            format_number(self.average_tip),
            format_number(self.avg_tip_percentage),
            format_label(self.customer_type.map(|v| v.as_str())),
            format_label(self.customer_term.map(|v| v.as_str())),
            format_label(self.preferred_location.map(|v| v.as_str())),
            format_label(self.customer_term_full.map(|v| v.as_str())),
            format_number(self.favorite_category_spend_ratio),
            format_number(self.favorite_item_spend_ratio),
        ]
    }
}

fn format_number(value: Option<f64>) -> String {
    // -0.0 prints as "-0"
    value
        .map(|v| if v == 0.0 { 0.0 } else { v })
        .map(|v| v.to_string())
        .unwrap_or_default()
}

fn format_label(value: Option<&str>) -> String {
    value.unwrap_or_default().to_string()
}

/// Null spellings dataframe readers treat as missing, compared case-insensitively
const NULL_SPELLINGS: [&str; 15] = [
    "nan", "-nan", "nat", "null", "none", "na", "n/a", "<na>", "#n/a", "#n/a n/a", "#na",
    "1.#ind", "-1.#ind", "1.#qnan", "-1.#qnan",
];

/// Empty cells and the usual dataframe null spellings
pub fn is_missing(raw: &str) -> bool {
    let s = raw.trim();
    s.is_empty() || NULL_SPELLINGS.iter().any(|n| s.eq_ignore_ascii_case(n))
}

/// Finite decimal, or None
pub fn parse_decimal(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Non-negative whole count; accepts "12" as well as "12.0"
fn parse_count(raw: &str) -> Option<u64> {
    let s = raw.trim();
    if let Ok(n) = s.parse::<u64>() {
        return Some(n);
    }
    parse_decimal(s)
        .filter(|v| *v >= 0.0 && v.fract() == 0.0 && *v <= u64::MAX as f64)
        .map(|v| v as u64)
}

/// Missing cells read as None silently; unreadable ones as None plus an issue.
fn read_cell<T>(
    issues: &mut Vec<FieldIssue>,
    column: &'static str,
    raw: &str,
    parse: fn(&str) -> Option<T>,
) -> Option<T> {
    if is_missing(raw) {
        return None;
    }
    let value = parse(raw);
    if value.is_none() {
        issues.push(FieldIssue {
            column,
            value: raw.to_string(),
        });
    }
    value
}

impl CsvCustomerRow {
    pub fn to_record(&self) -> (CustomerRecord, Vec<FieldIssue>) {
        let mut issues = Vec::new();
        let issues_ref = &mut issues;

        let record = CustomerRecord {
            total_orders: read_cell(issues_ref, "total_orders", &self.total_orders, parse_count),
            total_tips: read_cell(issues_ref, "total_tips", &self.total_tips, parse_decimal),
            total_spent: read_cell(issues_ref, "total_spent", &self.total_spent, parse_decimal),
            average_order_value: read_cell(
                issues_ref,
                "average_order_value",
                &self.average_order_value,
                parse_decimal,
            ),
            front_total_spent: read_cell(
                issues_ref,
                "front_total_spent",
                &self.front_total_spent,
                parse_decimal,
            ),
            central_total_spent: read_cell(
                issues_ref,
                "central_total_spent",
                &self.central_total_spent,
                parse_decimal,
            ),
            favorite_category_spend_dollars: read_cell(
                issues_ref,
                "favorite_category_spend_dollars",
                &self.favorite_category_spend_dollars,
                parse_decimal,
            ),
            favorite_item_spend_dollars: read_cell(
                issues_ref,
                "favorite_item_spend_dollars",
                &self.favorite_item_spend_dollars,
                parse_decimal,
            ),
            first_order_date: read_cell(
                issues_ref,
                "first_order_date",
                &self.first_order_date,
                parse_timestamp,
            ),
            last_order_date: read_cell(
                issues_ref,
                "last_order_date",
                &self.last_order_date,
                parse_timestamp,
            ),
        };

        (record, issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> CsvCustomerRow {
        CsvCustomerRow {
            total_orders: "12".into(),
            total_tips: "30.5".into(),
            total_spent: "240".into(),
            average_order_value: "20".into(),
            front_total_spent: "100".into(),
            central_total_spent: "140".into(),
            favorite_category_spend_dollars: "60".into(),
            favorite_item_spend_dollars: "24".into(),
            first_order_date: "2019-04-02 10:15:00".into(),
            last_order_date: "".into(),
        }
    }

    #[test]
    fn test_customer_type_boundaries() {
        let cases = [
            (0, CustomerType::OneTime),
            (1, CustomerType::OneTime),
            (2, CustomerType::Repeat),
            (10, CustomerType::Repeat),
            (11, CustomerType::Regular),
            (100, CustomerType::Regular),
            (101, CustomerType::DieHard),
            (5000, CustomerType::DieHard),
        ];
        for (orders, expected) in cases {
            assert_eq!(CustomerType::from_total_orders(orders), expected, "orders={}", orders);
        }
    }

    #[test]
    fn test_labels_round_trip_through_from_str() {
        assert_eq!("die-hard".parse::<CustomerType>(), Ok(CustomerType::DieHard));
        assert_eq!("medium-term".parse::<CustomerTerm>(), Ok(CustomerTerm::MediumTerm));
        assert_eq!(PreferredLocation::Front.to_string(), "front");
        assert!("new".parse::<CustomerTerm>().is_err());
    }

    #[test]
    fn test_preferred_location_tie_is_central() {
        assert_eq!(PreferredLocation::from_spend(50.0, 50.0), PreferredLocation::Central);
        assert_eq!(PreferredLocation::from_spend(50.01, 50.0), PreferredLocation::Front);
    }

    #[test]
    fn test_to_record_parses_clean_row() {
        let (record, issues) = row().to_record();
        assert!(issues.is_empty());
        assert_eq!(record.total_orders, Some(12));
        assert_eq!(record.total_tips, Some(30.5));
        assert!(record.first_order_date.is_some());
        assert_eq!(record.last_order_date, None);
    }

    #[test]
    fn test_to_record_reports_bad_cells() {
        let mut raw = row();
        raw.total_orders = "lots".into();
        raw.total_spent = "12,00".into();
        raw.last_order_date = "yesterday".into();

        let (record, issues) = raw.to_record();
        assert_eq!(record.total_orders, None);
        assert_eq!(record.total_spent, None);
        assert_eq!(record.last_order_date, None);
        let columns: Vec<&str> = issues.iter().map(|i| i.column).collect();
        assert_eq!(columns, vec!["total_orders", "total_spent", "last_order_date"]);
    }

    #[test]
    fn test_count_accepts_float_spelling() {
        assert_eq!(parse_count("3.0"), Some(3));
        assert_eq!(parse_count("3.5"), None);
        assert_eq!(parse_count("-2"), None);
    }

    #[test]
    fn test_undefined_metrics_serialize_as_empty_cells() {
        let metrics = DerivedMetrics {
            average_tip: Some(2.54),
            customer_type: Some(CustomerType::Repeat),
            ..Default::default()
        };
        let fields = metrics.to_fields();
        assert_eq!(fields[0], "2.54");
        assert_eq!(fields[1], "");
        assert_eq!(fields[2], "repeat");
        assert_eq!(fields[3], "");
    }

    #[test]
    fn test_negative_zero_is_written_as_zero() {
        let metrics = DerivedMetrics {
            average_tip: Some(-0.0),
            avg_tip_percentage: Some(-0.25),
            ..Default::default()
        };
        let fields = metrics.to_fields();
        assert_eq!(fields[0], "0");
        assert_eq!(fields[1], "-0.25");
    }

    #[test]
    fn test_null_spellings_are_missing() {
        for raw in ["NA", "N/A", "n/a", "<NA>", "#N/A", "-nan", "NaN", "None", " null "] {
            assert!(is_missing(raw), "raw={:?}", raw);
        }
        assert!(!is_missing("NAN bread"));
        assert!(!is_missing("Nachos"));

        let mut raw = row();
        raw.total_tips = "N/A".into();
        let (record, issues) = raw.to_record();
        assert_eq!(record.total_tips, None);
        assert!(issues.is_empty());
    }
}
