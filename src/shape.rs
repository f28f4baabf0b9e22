//! Shape detection and wide-to-long reshaping
//!
//! The published spreadsheets come in three layouts: one row per crime with a
//! column per month, one row per crime with a column per region, or an
//! already long table. Detection is a name-matching heuristic over normalized
//! column names; month columns are checked before region columns, so a table
//! that has both is treated as wide-by-month.
//!
//! # Examples
//!
//! ```
//! use delistat::shape::{Layout, detect_shape, to_long};
//! use delistat_core::{Table, Value};
//!
//! let wide = Table::from_rows(
//!     vec!["delito".into(), "enero".into(), "febrero".into()],
//!     vec![vec![Value::infer("Robo"), Value::infer("10"), Value::infer("12")]],
//! )
//! .unwrap();
//!
//! let report = detect_shape(&wide);
//! assert_eq!(report.layout, Layout::WideByMonth);
//!
//! let long = to_long(&wide, &report).unwrap();
//! assert_eq!(long.columns(), &["delito", "mes", "cantidad"]);
//! assert_eq!(long.len(), 2);
//! ```

use delistat_core::normalize::normalize_column_name;
use delistat_core::{Result, Table, Value};
use serde::Serialize;
use std::fmt;
use tracing::debug;

const MONTHS: &[(&str, u32)] = &[
    ("enero", 1),
    ("febrero", 2),
    ("marzo", 3),
    ("abril", 4),
    ("mayo", 5),
    ("junio", 6),
    ("julio", 7),
    ("agosto", 8),
    ("septiembre", 9),
    ("setiembre", 9),
    ("octubre", 10),
    ("noviembre", 11),
    ("diciembre", 12),
];

const MONTH_ABBREVIATIONS: &[(&str, u32)] = &[
    ("ene", 1),
    ("feb", 2),
    ("mar", 3),
    ("abr", 4),
    ("may", 5),
    ("jun", 6),
    ("jul", 7),
    ("ago", 8),
    ("sep", 9),
    ("sept", 9),
    ("oct", 10),
    ("nov", 11),
    ("dic", 12),
];

const REGIONS: &[&str] = &[
    "arica",
    "tarapaca",
    "antofagasta",
    "atacama",
    "coquimbo",
    "valparaiso",
    "metropolitana",
    "ohiggins",
    "libertador",
    "maule",
    "nuble",
    "biobio",
    "araucania",
    "los_rios",
    "los_lagos",
    "aysen",
    "magallanes",
];

const VALUE_PREFERENCE: &[&str] = &[
    "cantidad",
    "total",
    "frecuencia",
    "casos",
    "denuncias",
    "valor",
];

const YEAR_TOKENS: &[&str] = &["anio", "ano", "year", "periodo"];
const MONTH_TOKENS: &[&str] = &["mes", "month"];

/// Name given to the category column produced by a wide-by-month melt
pub const MONTH_VAR: &str = "mes";
/// Name given to the category column produced by a wide-by-region melt
pub const REGION_VAR: &str = "region";
/// Name given to the value column produced by a melt
pub const VALUE_VAR: &str = "cantidad";

/// How a table lays out its observations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    /// One column per month
    WideByMonth,
    /// One column per region
    WideByRegion,
    /// One row per observation
    Long,
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Layout::WideByMonth => write!(f, "wide by month"),
            Layout::WideByRegion => write!(f, "wide by region"),
            Layout::Long => write!(f, "long"),
        }
    }
}

/// What [`detect_shape`] found out about a table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShapeReport {
    pub layout: Layout,
    pub numeric_columns: Vec<String>,
    pub categorical_columns: Vec<String>,
    /// Numeric columns named after a month
    pub month_columns: Vec<String>,
    /// Numeric columns named after a region
    pub region_columns: Vec<String>,
    pub crime_column: Option<String>,
    /// Categorical column holding region names
    pub region_column: Option<String>,
    /// Column holding month names or numbers
    pub month_column: Option<String>,
    pub year_column: Option<String>,
    pub value_column: Option<String>,
}

fn tokens(normalized: &str) -> impl Iterator<Item = &str> {
    normalized
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
}

fn compact(s: &str) -> String {
    s.chars().filter(|c| c.is_alphanumeric()).collect()
}

/// Calendar month (1-12) for a Spanish month name or abbreviation
///
/// ```
/// use delistat::shape::month_number;
///
/// assert_eq!(month_number("Marzo"), Some(3));
/// assert_eq!(month_number("total_sept"), Some(9));
/// assert_eq!(month_number("marca"), None);
/// ```
pub fn month_number(name: &str) -> Option<u32> {
    let normalized = normalize_column_name(name);
    MONTHS
        .iter()
        .find(|(month, _)| normalized.contains(month))
        .map(|(_, n)| *n)
        .or_else(|| {
            tokens(&normalized).find_map(|token| {
                MONTH_ABBREVIATIONS
                    .iter()
                    .find(|(abbr, _)| *abbr == token)
                    .map(|(_, n)| *n)
            })
        })
}

/// Whether a column name refers to a month
pub fn is_month_name(name: &str) -> bool {
    month_number(name).is_some()
}

/// Whether a column name refers to a region
pub fn is_region_name(name: &str) -> bool {
    let normalized = normalize_column_name(name);
    if normalized.contains("region") {
        return true;
    }
    let compacted = compact(&normalized);
    REGIONS.iter().any(|region| compacted.contains(&compact(region)))
}

fn has_token(name: &str, vocabulary: &[&str]) -> bool {
    let normalized = normalize_column_name(name);
    tokens(&normalized).any(|token| vocabulary.contains(&token))
}

/// Classify the columns of a table and decide its layout
pub fn detect_shape(table: &Table) -> ShapeReport {
    let numeric_columns = table.numeric_columns();
    let categorical_columns: Vec<String> = table
        .columns()
        .iter()
        .filter(|c| !numeric_columns.contains(c))
        .cloned()
        .collect();

    let month_columns: Vec<String> = numeric_columns
        .iter()
        .filter(|c| is_month_name(c))
        .cloned()
        .collect();
    let region_columns: Vec<String> = numeric_columns
        .iter()
        .filter(|c| is_region_name(c))
        .cloned()
        .collect();

    let layout = if month_columns.len() >= 2 {
        Layout::WideByMonth
    } else if region_columns.len() >= 2 {
        Layout::WideByRegion
    } else {
        Layout::Long
    };

    let crime_column = categorical_columns
        .iter()
        .chain(table.columns())
        .find(|c| normalize_column_name(c).contains("delito"))
        .cloned();
    let region_column = categorical_columns
        .iter()
        .find(|c| is_region_name(c))
        .cloned();
    let month_column = table
        .columns()
        .iter()
        .find(|c| has_token(c, MONTH_TOKENS))
        .cloned();
    let year_column = table
        .columns()
        .iter()
        .find(|c| has_token(c, YEAR_TOKENS))
        .cloned();

    let candidates: Vec<&String> = numeric_columns
        .iter()
        .filter(|c| c.as_str() != "_id")
        .filter(|c| Some(*c) != year_column.as_ref() && Some(*c) != month_column.as_ref())
        .collect();
    let value_column = VALUE_PREFERENCE
        .iter()
        .find_map(|preferred| {
            candidates
                .iter()
                .find(|c| normalize_column_name(c).contains(preferred))
        })
        .or_else(|| candidates.last())
        .map(|c| (*c).clone());

    let report = ShapeReport {
        layout,
        numeric_columns,
        categorical_columns,
        month_columns,
        region_columns,
        crime_column,
        region_column,
        month_column,
        year_column,
        value_column,
    };
    debug!("Detected {} layout", report.layout);
    report
}

/// Unpivot `value_columns` into `(var_name, value_name)` pairs
///
/// The result has the `id_columns`, then `var_name`, then `value_name`.
/// Rows come out value-column major: every input row for the first value
/// column, then every input row for the second, and so on.
pub fn melt(
    table: &Table,
    id_columns: &[String],
    value_columns: &[String],
    var_name: &str,
    value_name: &str,
) -> Result<Table> {
    let id_idx: Vec<usize> = id_columns
        .iter()
        .map(|c| table.require_column(c))
        .collect::<Result<_>>()?;
    let value_idx: Vec<usize> = value_columns
        .iter()
        .map(|c| table.require_column(c))
        .collect::<Result<_>>()?;

    let mut columns = id_columns.to_vec();
    columns.push(var_name.to_string());
    columns.push(value_name.to_string());

    let mut long = Table::new(columns);
    for (name, &vi) in value_columns.iter().zip(&value_idx) {
        for row in table.rows() {
            let mut out: Vec<Value> = id_idx.iter().map(|&i| row[i].clone()).collect();
            out.push(Value::Text(name.clone()));
            out.push(row[vi].clone());
            long.push_row(out)?;
        }
    }
    Ok(long)
}

/// A column name not already used by `taken`
fn free_name(taken: &[String], base: &str) -> String {
    if !taken.iter().any(|c| c == base) {
        return base.to_string();
    }
    (2..)
        .map(|n| format!("{base}_{n}"))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| base.to_string())
}

/// Convert a wide table to long form; long tables are returned unchanged
pub fn to_long(table: &Table, report: &ShapeReport) -> Result<Table> {
    let (value_columns, var_base) = match report.layout {
        Layout::Long => return Ok(table.clone()),
        Layout::WideByMonth => (&report.month_columns, MONTH_VAR),
        Layout::WideByRegion => (&report.region_columns, REGION_VAR),
    };

    let id_columns: Vec<String> = table
        .columns()
        .iter()
        .filter(|c| !value_columns.contains(c))
        .cloned()
        .collect();
    let var_name = free_name(&id_columns, var_base);
    let mut taken = id_columns.clone();
    taken.push(var_name.clone());
    let value_name = free_name(&taken, VALUE_VAR);

    debug!(
        "Melting {} columns into '{}'/'{}'",
        value_columns.len(),
        var_name,
        value_name
    );
    melt(table, &id_columns, value_columns, &var_name, &value_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use delistat_core::DelistatError;

    fn table(columns: &[&str], rows: &[&[&str]]) -> Table {
        Table::from_rows(
            columns.iter().map(|c| c.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|c| Value::infer(c)).collect())
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_month_vocabulary() {
        assert_eq!(month_number("enero"), Some(1));
        assert_eq!(month_number("Setiembre"), Some(9));
        assert_eq!(month_number("casos_dic"), Some(12));
        assert_eq!(month_number("DIC 2023"), Some(12));
        // Abbreviations only count as whole tokens
        assert_eq!(month_number("diciplina"), None);
        assert_eq!(month_number("marco"), None);
        assert_eq!(month_number("mes"), None);
    }

    #[test]
    fn test_region_vocabulary() {
        assert!(is_region_name("Región"));
        assert!(is_region_name("VALPARAÍSO"));
        assert!(is_region_name("Los Ríos"));
        assert!(is_region_name("O'Higgins"));
        assert!(!is_region_name("delito"));
    }

    #[test]
    fn test_detect_wide_by_month() {
        let t = table(
            &["delito", "enero", "febrero", "marzo", "total"],
            &[&["Robo", "1", "2", "3", "6"], &["Hurto", "4", "5", "6", "15"]],
        );
        let report = detect_shape(&t);
        assert_eq!(report.layout, Layout::WideByMonth);
        assert_eq!(report.month_columns, vec!["enero", "febrero", "marzo"]);
        assert_eq!(report.crime_column.as_deref(), Some("delito"));
        assert_eq!(report.value_column.as_deref(), Some("total"));
    }

    #[test]
    fn test_detect_wide_by_region() {
        let t = table(
            &["tipo_delito", "maule", "nuble", "biobio"],
            &[&["Robo", "1", "2", "3"]],
        );
        let report = detect_shape(&t);
        assert_eq!(report.layout, Layout::WideByRegion);
        assert_eq!(report.region_columns.len(), 3);
        assert_eq!(report.crime_column.as_deref(), Some("tipo_delito"));
    }

    #[test]
    fn test_month_wins_over_region() {
        let t = table(
            &["delito", "maule", "nuble", "enero", "febrero"],
            &[&["Robo", "1", "2", "3", "4"]],
        );
        assert_eq!(detect_shape(&t).layout, Layout::WideByMonth);
    }

    #[test]
    fn test_detect_long() {
        let t = table(
            &["_id", "ano", "mes", "region", "delito", "frecuencia", "tasa"],
            &[
                &["1", "2023", "1", "Maule", "Robo", "10", "0.5"],
                &["2", "2023", "2", "Maule", "Hurto", "7", "0.2"],
            ],
        );
        let report = detect_shape(&t);
        assert_eq!(report.layout, Layout::Long);
        assert_eq!(report.region_column.as_deref(), Some("region"));
        assert_eq!(report.month_column.as_deref(), Some("mes"));
        assert_eq!(report.year_column.as_deref(), Some("ano"));
        assert_eq!(report.value_column.as_deref(), Some("frecuencia"));
        assert_eq!(report.categorical_columns, vec!["region", "delito"]);
    }

    #[test]
    fn test_value_column_fallback_is_last_numeric() {
        let t = table(&["delito", "ano", "x", "y"], &[&["Robo", "2023", "1", "2"]]);
        assert_eq!(detect_shape(&t).value_column.as_deref(), Some("y"));
    }

    #[test]
    fn test_non_numeric_month_columns_stay_long() {
        let t = table(&["delito", "enero", "febrero"], &[&["Robo", "a", "b"]]);
        assert_eq!(detect_shape(&t).layout, Layout::Long);
    }

    #[test]
    fn test_melt_order() {
        let t = table(&["id", "a", "b"], &[&["x", "1", "2"], &["y", "3", "4"]]);
        let long = melt(
            &t,
            &["id".to_string()],
            &["a".to_string(), "b".to_string()],
            "var",
            "val",
        )
        .unwrap();

        assert_eq!(long.columns(), &["id", "var", "val"]);
        let flat: Vec<String> = long
            .rows()
            .iter()
            .map(|r| format!("{}{}{}", r[0], r[1], r[2]))
            .collect();
        assert_eq!(flat, vec!["xa1", "ya3", "xb2", "yb4"]);
    }

    #[test]
    fn test_melt_unknown_column() {
        let t = table(&["id", "a"], &[&["x", "1"]]);
        let err = melt(&t, &["id".into()], &["zz".into()], "v", "n").unwrap_err();
        assert!(matches!(err, DelistatError::ColumnNotFound { .. }));
    }

    #[test]
    fn test_to_long_by_region_and_passthrough() {
        let t = table(&["delito", "maule", "nuble"], &[&["Robo", "1", "2"]]);
        let report = detect_shape(&t);
        let long = to_long(&t, &report).unwrap();
        assert_eq!(long.columns(), &["delito", "region", "cantidad"]);
        assert_eq!(long.rows()[1][1], Value::Text("nuble".into()));

        let again = to_long(&long, &detect_shape(&long)).unwrap();
        assert_eq!(again, long);
    }

    #[test]
    fn test_to_long_avoids_name_clash() {
        let t = table(
            &["mes", "enero", "febrero"],
            &[&["x", "1", "2"]],
        );
        let long = to_long(&t, &detect_shape(&t)).unwrap();
        assert_eq!(long.columns(), &["mes", "mes_2", "cantidad"]);
    }
}
