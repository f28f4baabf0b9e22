//! Basic cleaning passes applied after loading
//!
//! Cells that cannot be converted become nulls instead of failing the load,
//! so a stray `"s/i"` in a count column does not hide the rest of the file.

use chrono::{NaiveDate, NaiveDateTime};
use delistat_core::normalize::normalize_column_names;
use delistat_core::{Table, Value};
use tracing::debug;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%Y/%m/%d"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

/// Parse a date in any of the formats found in the published datasets
///
/// ```
/// use chrono::NaiveDate;
/// use delistat::cleaning::parse_date;
///
/// let expected = NaiveDate::from_ymd_opt(2023, 3, 14);
/// assert_eq!(parse_date("14/03/2023"), expected);
/// assert_eq!(parse_date("2023-03-14T08:30:00"), expected);
/// assert_eq!(parse_date("marzo"), None);
/// ```
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|dt| dt.date())
        })
}

fn to_number(value: &Value) -> Value {
    match value {
        Value::Number(_) | Value::Null => value.clone(),
        Value::Text(s) => match s.trim().replace(' ', "").parse::<f64>() {
            Ok(n) if n.is_finite() => Value::Number(n),
            _ => Value::Null,
        },
        Value::Date(_) => Value::Null,
    }
}

fn to_date(value: &Value) -> Value {
    match value {
        Value::Date(_) | Value::Null => value.clone(),
        Value::Text(s) => parse_date(s).map(Value::Date).unwrap_or(Value::Null),
        Value::Number(_) => Value::Null,
    }
}

/// Convert the given columns to numbers; unparseable cells become null
///
/// Columns that do not exist are ignored.
pub fn coerce_numeric(table: &mut Table, columns: &[String]) {
    for name in columns {
        if let Some(idx) = table.column_index(name) {
            table.map_column(idx, to_number);
            debug!("Coerced column '{}' to numeric", name);
        }
    }
}

/// Convert the given columns to dates; unparseable cells become null
pub fn parse_dates(table: &mut Table, columns: &[String]) {
    for name in columns {
        if let Some(idx) = table.column_index(name) {
            table.map_column(idx, to_date);
            debug!("Parsed column '{}' as dates", name);
        }
    }
}

/// Normalize column names, then parse dates, then coerce numerics
///
/// Column lists are given in normalized form.
pub fn basic_clean(table: &mut Table, date_columns: &[String], numeric_columns: &[String]) {
    normalize_column_names(table);
    parse_dates(table, date_columns);
    coerce_numeric(table, numeric_columns);
}
