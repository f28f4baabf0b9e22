//! Aggregation over long-format tables
//!
//! Every aggregate starts from [`sum_by`]: group rows by the display text of
//! a key column and add up a value column. Rankings and time series are
//! orderings of that grouped result.
//!
//! # Examples
//!
//! ```
//! use delistat::aggregation::{Totals, top_n};
//! use delistat_core::{Table, Value};
//!
//! let table = Table::from_rows(
//!     vec!["delito".into(), "cantidad".into()],
//!     vec![
//!         vec![Value::infer("Robo"), Value::infer("10")],
//!         vec![Value::infer("Hurto"), Value::infer("25")],
//!         vec![Value::infer("Robo"), Value::infer("30")],
//!     ],
//! )
//! .unwrap();
//!
//! let top = top_n(&table, "delito", "cantidad", 1).unwrap();
//! assert_eq!(top[0].key, "Robo");
//! assert_eq!(top[0].total, 40.0);
//!
//! let totals = Totals::from_groups(&top);
//! assert_eq!(totals.rows, 2);
//! ```

use crate::filters::RowFilter;
use crate::shape::month_number;
use delistat_core::{Result, Table, Value};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Sum of a value column for one key
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupTotal {
    /// Display text of the key cell
    pub key: String,
    /// Sum of the numeric values in the group
    pub total: f64,
    /// Rows in the group
    pub count: usize,
}

/// Totals across a grouped result
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Totals {
    pub total: f64,
    pub rows: usize,
    pub groups: usize,
}

impl Totals {
    /// Add up a grouped result
    pub fn from_groups(groups: &[GroupTotal]) -> Self {
        groups.iter().fold(
            Totals {
                groups: groups.len(),
                ..Default::default()
            },
            |mut acc, g| {
                acc.total += g.total;
                acc.rows += g.count;
                acc
            },
        )
    }
}

/// Group by `key_column` and sum `value_column`
///
/// Rows with a null key are dropped; non-numeric values count towards the
/// group size but not its total. Groups keep first-seen order.
pub fn sum_by(table: &Table, key_column: &str, value_column: &str) -> Result<Vec<GroupTotal>> {
    let key_idx = table.require_column(key_column)?;
    let value_idx = table.require_column(value_column)?;

    let mut groups: Vec<GroupTotal> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for row in table.rows() {
        let key = &row[key_idx];
        if key.is_null() {
            continue;
        }
        let key = key.to_string();
        let pos = *index.entry(key.clone()).or_insert_with(|| {
            groups.push(GroupTotal {
                key,
                total: 0.0,
                count: 0,
            });
            groups.len() - 1
        });
        let group = &mut groups[pos];
        group.count += 1;
        if let Some(n) = row[value_idx].as_f64() {
            group.total += n;
        }
    }
    Ok(groups)
}

fn by_total_desc(a: &GroupTotal, b: &GroupTotal) -> Ordering {
    b.total.partial_cmp(&a.total).unwrap_or(Ordering::Equal)
}

/// The `n` crimes with the highest totals
pub fn top_n(table: &Table, crime_column: &str, value_column: &str, n: usize) -> Result<Vec<GroupTotal>> {
    let mut groups = sum_by(table, crime_column, value_column)?;
    groups.sort_by(by_total_desc);
    groups.truncate(n);
    Ok(groups)
}

/// Regions ordered by total, highest first
pub fn ranking(table: &Table, region_column: &str, value_column: &str) -> Result<Vec<GroupTotal>> {
    let mut groups = sum_by(table, region_column, value_column)?;
    groups.sort_by(by_total_desc);
    Ok(groups)
}

/// Sort key for a period label: numbers, then month names, then anything else
#[derive(Debug, PartialEq, PartialOrd)]
enum PeriodKey<'a> {
    Numeric(f64),
    Month(u32),
    Text(&'a str),
}

impl<'a> PeriodKey<'a> {
    fn of(label: &'a str) -> Self {
        if let Ok(n) = label.trim().parse::<f64>() {
            return PeriodKey::Numeric(n);
        }
        match month_number(label) {
            Some(month) => PeriodKey::Month(month),
            None => PeriodKey::Text(label),
        }
    }
}

/// Totals per period, in chronological order
pub fn evolution(table: &Table, period_column: &str, value_column: &str) -> Result<Vec<GroupTotal>> {
    let mut groups = sum_by(table, period_column, value_column)?;
    groups.sort_by(|a, b| {
        PeriodKey::of(&a.key)
            .partial_cmp(&PeriodKey::of(&b.key))
            .unwrap_or(Ordering::Equal)
    });
    Ok(groups)
}

/// Month-by-month totals for one region
pub fn monthly_for_region(
    table: &Table,
    region_column: &str,
    region: &str,
    month_column: &str,
    value_column: &str,
) -> Result<Vec<GroupTotal>> {
    let filtered = RowFilter::new()
        .with_equals(region_column, region)
        .apply(table)?;
    evolution(&filtered, month_column, value_column)
}

/// Descriptive statistics for one column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub column: String,
    /// Non-null cells
    pub count: usize,
    #[serde(flatten)]
    pub stats: SummaryStats,
}

/// Statistics that depend on the column type
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SummaryStats {
    Numeric {
        mean: f64,
        /// Sample standard deviation; absent with fewer than two values
        std: Option<f64>,
        min: f64,
        q25: f64,
        q50: f64,
        q75: f64,
        max: f64,
    },
    Categorical {
        unique: usize,
        top: Option<String>,
        freq: usize,
    },
}

/// Linear-interpolated quantile of sorted values
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    sorted[lower] + (sorted[upper] - sorted[lower]) * (pos - lower as f64)
}

fn numeric_stats(values: &mut [f64]) -> SummaryStats {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let std = (values.len() > 1).then(|| {
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
        var.sqrt()
    });
    SummaryStats::Numeric {
        mean,
        std,
        min: values[0],
        q25: quantile(values, 0.25),
        q50: quantile(values, 0.5),
        q75: quantile(values, 0.75),
        max: values[values.len() - 1],
    }
}

fn categorical_stats<'a>(values: impl Iterator<Item = &'a Value>) -> SummaryStats {
    let mut counts: Vec<(String, usize)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for value in values {
        let text = value.to_string();
        match index.get(&text) {
            Some(&pos) => counts[pos].1 += 1,
            None => {
                index.insert(text.clone(), counts.len());
                counts.push((text, 1));
            }
        }
    }

    // First-seen value wins ties
    let mut top: Option<&(String, usize)> = None;
    for entry in &counts {
        if top.is_none_or(|t| entry.1 > t.1) {
            top = Some(entry);
        }
    }
    SummaryStats::Categorical {
        unique: counts.len(),
        top: top.map(|(text, _)| text.clone()),
        freq: top.map(|(_, freq)| *freq).unwrap_or(0),
    }
}

/// Per-column descriptive statistics
pub fn summarize(table: &Table) -> Vec<ColumnSummary> {
    table
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            let cells: Vec<&Value> = table
                .rows()
                .iter()
                .map(|row| &row[idx])
                .filter(|v| !v.is_null())
                .collect();
            let count = cells.len();
            let stats = if table.is_numeric_column(idx) {
                let mut values: Vec<f64> = cells.iter().filter_map(|v| v.as_f64()).collect();
                numeric_stats(&mut values)
            } else {
                categorical_stats(cells.into_iter())
            };
            ColumnSummary {
                column: column.clone(),
                count,
                stats,
            }
        })
        .collect()
}
