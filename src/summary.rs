//! Grouping and aggregation over a derived customer table.
//!
//! Rows whose category or value is missing are left out of every
//! aggregate, the same way the charts treat them.

use std::collections::BTreeMap;

use crate::error::Result;
use crate::models::{is_missing, parse_decimal};
use crate::table::CustomerTable;

pub const TERM_ORDER: [&str; 3] = ["short-term", "medium-term", "long-term"];
pub const TYPE_ORDER: [&str; 4] = ["one-time", "repeat", "regular", "die-hard"];
pub const LOCATION_ORDER: [&str; 2] = ["front", "central"];

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryStat {
    pub category: String,
    pub count: usize,
    pub mean: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryCount {
    pub category: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupedStat {
    pub group: String,
    pub hue: String,
    pub count: usize,
    pub mean: f64,
}

#[derive(Default)]
struct Accumulator {
    count: usize,
    sum: f64,
}

impl Accumulator {
    fn push(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
    }

    fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

fn category_of(cell: &str) -> Option<&str> {
    (!is_missing(cell)).then(|| cell.trim())
}

/// Lay out accumulated categories either in `order` (categories outside
/// it are dropped, absent ones get zero) or in first-seen order.
fn arrange<T>(
    seen: Vec<String>,
    mut acc: BTreeMap<String, T>,
    order: Option<&[&str]>,
) -> Vec<(String, Option<T>)> {
    match order {
        Some(order) => order
            .iter()
            .map(|c| (c.to_string(), acc.remove(*c)))
            .collect(),
        None => seen
            .into_iter()
            .map(|c| {
                let v = acc.remove(&c);
                (c, v)
            })
            .collect(),
    }
}

/// Mean of `value_column` per `category_column`
pub fn mean_by_category(
    table: &CustomerTable,
    category_column: &str,
    value_column: &str,
    order: Option<&[&str]>,
) -> Result<Vec<CategoryStat>> {
    let cat_idx = table.column_index(category_column)?;
    let val_idx = table.column_index(value_column)?;

    let mut seen = Vec::new();
    let mut acc: BTreeMap<String, Accumulator> = BTreeMap::new();
    for row in table.rows() {
        let category = row.get(cat_idx).and_then(category_of);
        let value = row.get(val_idx).and_then(parse_decimal);
        if let (Some(category), Some(value)) = (category, value) {
            if !acc.contains_key(category) {
                seen.push(category.to_string());
            }
            acc.entry(category.to_string()).or_default().push(value);
        }
    }

    Ok(arrange(seen, acc, order)
        .into_iter()
        .map(|(category, a)| CategoryStat {
            category,
            count: a.as_ref().map_or(0, |a| a.count),
            mean: a.and_then(|a| a.mean()),
        })
        .collect())
}

/// Non-missing rows per category
pub fn count_by_category(
    table: &CustomerTable,
    category_column: &str,
    order: Option<&[&str]>,
) -> Result<Vec<CategoryCount>> {
    let cells = table.column(category_column)?;

    let mut seen = Vec::new();
    let mut acc: BTreeMap<String, usize> = BTreeMap::new();
    for category in cells.into_iter().filter_map(category_of) {
        if !acc.contains_key(category) {
            seen.push(category.to_string());
        }
        *acc.entry(category.to_string()).or_default() += 1;
    }

    Ok(arrange(seen, acc, order)
        .into_iter()
        .map(|(category, count)| CategoryCount {
            category,
            count: count.unwrap_or(0),
        })
        .collect())
}

/// Mean of `value_column` per (group, hue) pair, sorted by group then hue
pub fn mean_by_group_and_hue(
    table: &CustomerTable,
    group_column: &str,
    hue_column: &str,
    value_column: &str,
) -> Result<Vec<GroupedStat>> {
    let group_idx = table.column_index(group_column)?;
    let hue_idx = table.column_index(hue_column)?;
    let val_idx = table.column_index(value_column)?;

    let mut acc: BTreeMap<(String, String), Accumulator> = BTreeMap::new();
    for row in table.rows() {
        let group = row.get(group_idx).and_then(category_of);
        let hue = row.get(hue_idx).and_then(category_of);
        let value = row.get(val_idx).and_then(parse_decimal);
        if let (Some(group), Some(hue), Some(value)) = (group, hue, value) {
            acc.entry((group.to_string(), hue.to_string()))
                .or_default()
                .push(value);
        }
    }

    Ok(acc
        .into_iter()
        .filter_map(|((group, hue), a)| {
            a.mean().map(|mean| GroupedStat {
                group,
                hue,
                count: a.count,
                mean,
            })
        })
        .collect())
}

/// The `n` groups with the highest average of their per-hue means
pub fn top_groups_by_mean(stats: &[GroupedStat], n: usize) -> Vec<String> {
    let mut per_group: BTreeMap<&str, Accumulator> = BTreeMap::new();
    for stat in stats {
        per_group.entry(&stat.group).or_default().push(stat.mean);
    }

    let mut ranked: Vec<(&str, f64)> = per_group
        .iter()
        .filter_map(|(g, a)| a.mean().map(|m| (*g, m)))
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked
        .into_iter()
        .take(n)
        .map(|(g, _)| g.to_string())
        .collect()
}
