//! Row filtering for loaded tables
//!
//! Filters compare the display text of a cell, so numbers and dates can be
//! searched the same way as text. Missing cells never match.
//!
//! # Examples
//!
//! ```
//! use delistat::filters::RowFilter;
//! use delistat_core::{Table, Value};
//!
//! let table = Table::from_rows(
//!     vec!["region".into(), "delito".into()],
//!     vec![
//!         vec![Value::infer("Maule"), Value::infer("Robo con violencia")],
//!         vec![Value::infer("Maule"), Value::infer("Hurto")],
//!         vec![Value::infer("Ñuble"), Value::infer("Robo en lugar habitado")],
//!     ],
//! )
//! .unwrap();
//!
//! let filtered = RowFilter::new()
//!     .with_contains("delito", "ROBO")
//!     .with_equals("region", "Maule")
//!     .apply(&table)
//!     .unwrap();
//! assert_eq!(filtered.len(), 1);
//! ```

use delistat_core::{Result, Table, Value};
use std::collections::BTreeSet;

#[derive(Debug, Clone)]
enum Condition {
    /// Case-insensitive substring; the needle is stored lowercased
    Contains { column: String, needle: String },
    Equals { column: String, value: String },
}

impl Condition {
    fn column(&self) -> &str {
        match self {
            Condition::Contains { column, .. } | Condition::Equals { column, .. } => column,
        }
    }

    fn matches(&self, cell: &Value) -> bool {
        if cell.is_null() {
            return false;
        }
        match self {
            Condition::Contains { needle, .. } => {
                cell.to_string().to_lowercase().contains(needle.as_str())
            }
            Condition::Equals { value, .. } => cell.to_string() == *value,
        }
    }
}

/// Conjunction of per-column conditions
#[derive(Debug, Default, Clone)]
pub struct RowFilter {
    conditions: Vec<Condition>,
}

impl RowFilter {
    /// Create a filter that keeps every row
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep rows whose `column` contains `text`, ignoring case
    pub fn with_contains(mut self, column: impl Into<String>, text: &str) -> Self {
        self.conditions.push(Condition::Contains {
            column: column.into(),
            needle: text.to_lowercase(),
        });
        self
    }

    /// Keep rows whose `column` is exactly `value`
    pub fn with_equals(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.conditions.push(Condition::Equals {
            column: column.into(),
            value: value.into(),
        });
        self
    }

    /// Whether no condition has been added
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Rows of `table` that satisfy every condition
    ///
    /// # Errors
    ///
    /// Returns `ColumnNotFound` if a condition names a missing column.
    pub fn apply(&self, table: &Table) -> Result<Table> {
        let resolved: Vec<(usize, &Condition)> = self
            .conditions
            .iter()
            .map(|c| table.require_column(c.column()).map(|idx| (idx, c)))
            .collect::<Result<_>>()?;

        Ok(table.filter_rows(|row| resolved.iter().all(|(idx, c)| c.matches(&row[*idx]))))
    }
}

/// Sorted distinct non-null values of a column, as display text
pub fn distinct_values(table: &Table, column: &str) -> Result<Vec<String>> {
    let values: BTreeSet<String> = table
        .column_values(column)?
        .filter(|v| !v.is_null())
        .map(|v| v.to_string())
        .collect();
    Ok(values.into_iter().collect())
}
