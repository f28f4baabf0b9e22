//! Core tabular types for delistat
//!
//! Both record providers (the CKAN API and local CSV files) produce
//! [`Record`]s, which are folded into a single in-memory [`Table`]. Cells are
//! loosely typed [`Value`]s, mirroring how the datasets come in: numbers
//! frequently arrive as strings, and missing cells are common.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

use crate::error::{DelistatError, Result};

/// Tokens treated as missing when they appear as a whole cell
const NULL_TOKENS: &[&str] = &[
    "na", "n/a", "#n/a", "nan", "-nan", "null", "none", "<na>",
];

/// A single table cell
///
/// # Examples
/// ```
/// use delistat_core::types::Value;
///
/// assert_eq!(Value::infer(" 42 "), Value::Number(42.0));
/// assert_eq!(Value::infer(""), Value::Null);
/// assert_eq!(Value::infer("Robo"), Value::Text("Robo".to_string()));
/// assert_eq!(Value::Number(42.0).to_string(), "42");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// Missing cell
    Null,
    /// Numeric cell
    Number(f64),
    /// Calendar date, produced by date cleaning
    Date(NaiveDate),
    /// Anything else
    Text(String),
}

impl Value {
    /// Infer a value from raw text: blank or NA-like cells become `Null`,
    /// finite numbers become `Number`, the rest stays `Text`.
    pub fn infer(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || NULL_TOKENS.contains(&trimmed.to_lowercase().as_str()) {
            return Value::Null;
        }
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() => Value::Number(n),
            _ => Value::Text(trimmed.to_string()),
        }
    }

    /// Convert a JSON value coming from an API record
    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Number(n) => n.as_f64().map(Value::Number).unwrap_or(Value::Null),
            serde_json::Value::String(s) => Value::infer(s),
            serde_json::Value::Bool(b) => Value::Text(b.to_string()),
            other => Value::Text(other.to_string()),
        }
    }

    /// Numeric view of the cell, if it holds a number
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Whether the cell is missing
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// JSON representation used by the JSON formatter
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Date(d) => serde_json::Value::String(d.format("%Y-%m-%d").to_string()),
            Value::Text(s) => serde_json::Value::String(s.clone()),
        }
    }
}

/// Render a number without a trailing `.0` when it is integral
///
/// ```
/// use delistat_core::types::format_number;
///
/// assert_eq!(format_number(1500.0), "1500");
/// assert_eq!(format_number(2.5), "2.5");
/// ```
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Text(s) => write!(f, "{s}"),
        }
    }
}

/// One source row: ordered `(column, value)` pairs
///
/// A JSON object from the API or a CSV line both become a `Record`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field
    pub fn push(&mut self, column: impl Into<String>, value: Value) {
        self.fields.push((column.into(), value));
    }

    /// Builder-style variant of [`Record::push`]
    pub fn with(mut self, column: impl Into<String>, value: Value) -> Self {
        self.push(column, value);
        self
    }

    /// Look up a field by column name
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// All fields in source order
    pub fn fields(&self) -> &[(String, Value)] {
        &self.fields
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the record has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Build a record from a JSON object, keeping key order
    pub fn from_json_object(object: &serde_json::Map<String, serde_json::Value>) -> Self {
        object
            .iter()
            .map(|(key, value)| (key.clone(), Value::from_json(value)))
            .collect()
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// In-memory table: named columns and equally wide rows
///
/// # Examples
/// ```
/// use delistat_core::types::{Record, Table, Value};
///
/// let table = Table::from_records(vec![
///     Record::new().with("region", Value::infer("Maule")).with("total", Value::infer("10")),
///     Record::new().with("region", Value::infer("Biobío")),
/// ]);
/// assert_eq!(table.columns(), &["region".to_string(), "total".to_string()]);
/// assert_eq!(table.len(), 2);
/// assert!(table.rows()[1][1].is_null());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Create an empty table with the given columns
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Create a table from rows, checking that every row matches the header width
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self> {
        let mut table = Self::new(columns);
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    /// Fold records into a table; columns appear in first-seen order
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = Record>,
    {
        Self::from_records_with_order(&[], records)
    }

    /// Fold records into a table, placing `order` columns first
    ///
    /// Used when the source announces its schema up front (CKAN `fields`).
    /// Keys not listed in `order` are appended as they are discovered, and
    /// cells missing from a record are filled with `Null`.
    pub fn from_records_with_order<I>(order: &[String], records: I) -> Self
    where
        I: IntoIterator<Item = Record>,
    {
        let mut columns: Vec<String> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        for name in order {
            if !index.contains_key(name) {
                index.insert(name.clone(), columns.len());
                columns.push(name.clone());
            }
        }

        let mut rows: Vec<Vec<Value>> = Vec::new();
        for record in records {
            let mut row = vec![Value::Null; columns.len()];
            for (name, value) in record.fields {
                let position = match index.get(&name) {
                    Some(&position) => position,
                    None => {
                        let position = columns.len();
                        index.insert(name.clone(), position);
                        columns.push(name);
                        row.push(Value::Null);
                        position
                    }
                };
                row[position] = value;
            }
            rows.push(row);
        }

        let width = columns.len();
        for row in &mut rows {
            row.resize(width, Value::Null);
        }

        Self { columns, rows }
    }

    /// Append a row; its width must match the header
    pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(DelistatError::InvalidArgument(format!(
                "row has {} cells but the table has {} columns",
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    /// Column names
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// All rows
    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of columns
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Position of a column, if present
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Position of a column, or a `ColumnNotFound` error
    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| DelistatError::column_not_found(name, &self.columns))
    }

    /// Iterate the cells of one column
    pub fn column_values(&self, name: &str) -> Result<impl Iterator<Item = &Value> + '_> {
        let idx = self.require_column(name)?;
        Ok(self.rows.iter().map(move |row| &row[idx]))
    }

    /// Rename the column at `idx`, which must be below `width()`
    pub(crate) fn set_column_name(&mut self, idx: usize, name: String) {
        self.columns[idx] = name;
    }

    /// Apply `f` to every cell of the column at `idx`
    pub fn map_column<F>(&mut self, idx: usize, mut f: F)
    where
        F: FnMut(&Value) -> Value,
    {
        for row in &mut self.rows {
            if let Some(cell) = row.get_mut(idx) {
                *cell = f(cell);
            }
        }
    }

    /// First `n` rows
    pub fn head(&self, n: usize) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }

    /// Keep only the rows for which `keep` returns true
    pub fn filter_rows<F>(&self, mut keep: F) -> Table
    where
        F: FnMut(&[Value]) -> bool,
    {
        Table {
            columns: self.columns.clone(),
            rows: self
                .rows
                .iter()
                .filter(|row| keep(row.as_slice()))
                .cloned()
                .collect(),
        }
    }

    /// A column is numeric when it has at least one number and every
    /// non-null cell is a number
    pub fn is_numeric_column(&self, idx: usize) -> bool {
        let mut seen_number = false;
        for row in &self.rows {
            match &row[idx] {
                Value::Number(_) => seen_number = true,
                Value::Null => {}
                _ => return false,
            }
        }
        seen_number
    }

    /// Names of all numeric columns, in table order
    pub fn numeric_columns(&self) -> Vec<String> {
        (0..self.columns.len())
            .filter(|&idx| self.is_numeric_column(idx))
            .map(|idx| self.columns[idx].clone())
            .collect()
    }
}
