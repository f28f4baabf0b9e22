//! Output formatting module for delistat
//!
//! This module provides formatters for displaying loaded and aggregated data:
//! - Table format for human-readable terminal output
//! - JSON format for machine-readable output and piping into other tools
//!
//! # Examples
//!
//! ```
//! use delistat::aggregation::{GroupTotal, Totals};
//! use delistat::output::get_formatter;
//!
//! let groups = vec![GroupTotal { key: "Maule".into(), total: 1200.0, count: 3 }];
//! let totals = Totals::from_groups(&groups);
//!
//! let formatter = get_formatter(false);
//! assert!(formatter.format_groups("region", "cantidad", &groups, &totals).contains("1,200"));
//!
//! let json_formatter = get_formatter(true);
//! assert!(json_formatter.format_groups("region", "cantidad", &groups, &totals).contains("\"total\": 1200"));
//! ```

use crate::aggregation::{ColumnSummary, GroupTotal, SummaryStats, Totals};
use crate::chart::Chart;
use crate::shape::ShapeReport;
use delistat_core::types::format_number;
use delistat_core::{Table, Value};
use prettytable::{Cell, Row, format, row};
use serde_json::json;
use std::path::Path;

/// Trait for output formatters
///
/// Every command renders its result through one of these methods, so adding
/// an output format means implementing this trait once.
pub trait OutputFormatter {
    /// Format a preview of a table; `total_rows` is the size before truncation
    fn format_table(&self, table: &Table, total_rows: usize) -> String;

    /// Format grouped totals with a totals row
    fn format_groups(
        &self,
        key_label: &str,
        value_label: &str,
        groups: &[GroupTotal],
        totals: &Totals,
    ) -> String;

    /// Format per-column descriptive statistics
    fn format_summary(&self, summary: &[ColumnSummary]) -> String;

    /// Format the result of shape detection
    fn format_shape(&self, report: &ShapeReport) -> String;

    /// Format the list of available CSV files
    fn format_files(&self, files: &[String]) -> String;

    /// Format the distinct values of a column
    fn format_values(&self, column: &str, values: &[String]) -> String;

    /// Format a labelled series as a chart
    fn format_chart(&self, chart: &Chart, title: &str, series: &[(String, f64)]) -> String;

    /// Format the confirmation of a CSV export
    fn format_export(&self, rows: usize, path: &Path) -> String;
}

/// Table formatter for human-readable output
///
/// Numbers are right-aligned with thousands separators; long text cells are
/// cut so wide datasets still fit on a terminal.
pub struct TableFormatter {
    /// Longest text shown in a cell before it is cut with an ellipsis
    pub max_cell_width: usize,
}

impl Default for TableFormatter {
    fn default() -> Self {
        Self { max_cell_width: 40 }
    }
}

impl TableFormatter {
    /// Create a new TableFormatter
    pub fn new(max_cell_width: usize) -> Self {
        Self { max_cell_width }
    }

    /// Format a number with thousands separators
    fn format_count(n: f64) -> String {
        let plain = if n.fract() == 0.0 {
            format_number(n)
        } else {
            format!("{n:.2}")
        };
        let (sign, digits) = match plain.strip_prefix('-') {
            Some(rest) => ("-", rest),
            None => ("", plain.as_str()),
        };
        let (int_part, frac_part) = match digits.split_once('.') {
            Some((i, f)) => (i, Some(f)),
            None => (digits, None),
        };

        let mut grouped = String::new();
        for (count, ch) in int_part.chars().rev().enumerate() {
            if count > 0 && count % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }
        let mut result: String = sign.to_string();
        result.extend(grouped.chars().rev());
        if let Some(frac) = frac_part {
            result.push('.');
            result.push_str(frac);
        }
        result
    }

    fn truncate(&self, text: &str) -> String {
        if text.chars().count() <= self.max_cell_width {
            return text.to_string();
        }
        let mut cut: String = text
            .chars()
            .take(self.max_cell_width.saturating_sub(1))
            .collect();
        cut.push('…');
        cut
    }

    fn cell(&self, value: &Value) -> Cell {
        match value {
            Value::Number(n) => Cell::new(&Self::format_count(*n)).style_spec("r"),
            other => Cell::new(&self.truncate(&other.to_string())),
        }
    }

    fn new_table() -> prettytable::Table {
        let mut table = prettytable::Table::new();
        table.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
        table
    }

    fn title_row<'a>(names: impl IntoIterator<Item = &'a str>) -> Row {
        Row::new(
            names
                .into_iter()
                .map(|name| Cell::new(name).style_spec("b"))
                .collect(),
        )
    }

    fn optional(value: Option<&String>) -> String {
        value.cloned().unwrap_or_else(|| "-".to_string())
    }
}

impl OutputFormatter for TableFormatter {
    fn format_table(&self, data: &Table, total_rows: usize) -> String {
        let mut table = Self::new_table();
        table.set_titles(Self::title_row(data.columns().iter().map(String::as_str)));
        for row in data.rows() {
            table.add_row(Row::new(row.iter().map(|v| self.cell(v)).collect()));
        }

        let mut output = table.to_string();
        output.push_str(&format!(
            "\nShowing {} of {} rows, {} columns\n",
            data.len(),
            total_rows,
            data.width()
        ));
        output
    }

    fn format_groups(
        &self,
        key_label: &str,
        value_label: &str,
        groups: &[GroupTotal],
        totals: &Totals,
    ) -> String {
        let mut table = Self::new_table();
        table.set_titles(row![b -> "#", b -> key_label, b -> value_label, b -> "Rows"]);

        for (rank, group) in groups.iter().enumerate() {
            table.add_row(row![
                r -> rank + 1,
                self.truncate(&group.key),
                r -> Self::format_count(group.total),
                r -> group.count
            ]);
        }
        table.add_row(row![
            "",
            b -> "TOTAL",
            br -> Self::format_count(totals.total),
            br -> totals.rows
        ]);

        table.to_string()
    }

    fn format_summary(&self, summary: &[ColumnSummary]) -> String {
        let mut table = Self::new_table();
        table.set_titles(row![
            b -> "Column",
            b -> "Count",
            b -> "Mean",
            b -> "Std",
            b -> "Min",
            b -> "25%",
            b -> "50%",
            b -> "75%",
            b -> "Max",
            b -> "Unique",
            b -> "Top",
            b -> "Freq"
        ]);

        let num = |n: f64| format!("{n:.2}");
        for column in summary {
            let row = match &column.stats {
                SummaryStats::Numeric {
                    mean,
                    std,
                    min,
                    q25,
                    q50,
                    q75,
                    max,
                } => row![
                    column.column,
                    r -> column.count,
                    r -> num(*mean),
                    r -> std.map(num).unwrap_or_else(|| "-".into()),
                    r -> num(*min),
                    r -> num(*q25),
                    r -> num(*q50),
                    r -> num(*q75),
                    r -> num(*max),
                    "", "", ""
                ],
                SummaryStats::Categorical { unique, top, freq } => row![
                    column.column,
                    r -> column.count,
                    "", "", "", "", "", "", "",
                    r -> unique,
                    self.truncate(&Self::optional(top.as_ref())),
                    r -> freq
                ],
            };
            table.add_row(row);
        }

        table.to_string()
    }

    fn format_shape(&self, report: &ShapeReport) -> String {
        let list = |cols: &[String]| {
            if cols.is_empty() {
                "-".to_string()
            } else {
                cols.join(", ")
            }
        };

        let mut table = Self::new_table();
        table.set_titles(row![b -> "Property", b -> "Value"]);
        table.add_row(row!["Layout", report.layout]);
        table.add_row(row!["Numeric columns", list(&report.numeric_columns)]);
        table.add_row(row!["Categorical columns", list(&report.categorical_columns)]);
        table.add_row(row!["Month columns", list(&report.month_columns)]);
        table.add_row(row!["Region columns", list(&report.region_columns)]);
        table.add_row(row!["Crime column", Self::optional(report.crime_column.as_ref())]);
        table.add_row(row!["Region column", Self::optional(report.region_column.as_ref())]);
        table.add_row(row!["Month column", Self::optional(report.month_column.as_ref())]);
        table.add_row(row!["Year column", Self::optional(report.year_column.as_ref())]);
        table.add_row(row!["Value column", Self::optional(report.value_column.as_ref())]);
        table.to_string()
    }

    fn format_files(&self, files: &[String]) -> String {
        if files.is_empty() {
            return "No CSV files found\n".to_string();
        }
        let mut table = Self::new_table();
        table.set_titles(row![b -> "#", b -> "File"]);
        for (i, file) in files.iter().enumerate() {
            table.add_row(row![r -> i + 1, file]);
        }
        table.to_string()
    }

    fn format_values(&self, column: &str, values: &[String]) -> String {
        let mut table = Self::new_table();
        table.set_titles(row![b -> "#", b -> column]);
        for (i, value) in values.iter().enumerate() {
            table.add_row(row![r -> i + 1, self.truncate(value)]);
        }
        table.to_string()
    }

    fn format_chart(&self, chart: &Chart, title: &str, series: &[(String, f64)]) -> String {
        chart.render(title, series)
    }

    fn format_export(&self, rows: usize, path: &Path) -> String {
        format!("Exported {} rows to {}\n", rows, path.display())
    }
}

/// JSON formatter for machine-readable output
pub struct JsonFormatter;

fn pretty(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

impl OutputFormatter for JsonFormatter {
    fn format_table(&self, table: &Table, total_rows: usize) -> String {
        let rows: Vec<serde_json::Value> = table
            .rows()
            .iter()
            .map(|row| {
                let object: serde_json::Map<String, serde_json::Value> = table
                    .columns()
                    .iter()
                    .cloned()
                    .zip(row.iter().map(Value::to_json))
                    .collect();
                serde_json::Value::Object(object)
            })
            .collect();

        pretty(&json!({
            "columns": table.columns(),
            "rows": rows,
            "shown_rows": table.len(),
            "total_rows": total_rows,
        }))
    }

    fn format_groups(
        &self,
        key_label: &str,
        value_label: &str,
        groups: &[GroupTotal],
        totals: &Totals,
    ) -> String {
        pretty(&json!({
            "key": key_label,
            "value": value_label,
            "groups": groups,
            "totals": totals,
        }))
    }

    fn format_summary(&self, summary: &[ColumnSummary]) -> String {
        pretty(&json!({ "summary": summary }))
    }

    fn format_shape(&self, report: &ShapeReport) -> String {
        pretty(&json!(report))
    }

    fn format_files(&self, files: &[String]) -> String {
        pretty(&json!({ "files": files }))
    }

    fn format_values(&self, column: &str, values: &[String]) -> String {
        pretty(&json!({ "column": column, "values": values }))
    }

    fn format_chart(&self, chart: &Chart, title: &str, series: &[(String, f64)]) -> String {
        let points: Vec<serde_json::Value> = series
            .iter()
            .map(|(label, value)| json!({ "label": label, "value": value }))
            .collect();
        pretty(&json!({
            "title": title,
            "kind": chart.kind(),
            "points": points,
        }))
    }

    fn format_export(&self, rows: usize, path: &Path) -> String {
        pretty(&json!({ "rows": rows, "path": path.display().to_string() }))
    }
}

/// Pick the formatter for the requested output mode
pub fn get_formatter(json: bool) -> Box<dyn OutputFormatter> {
    if json {
        Box::new(JsonFormatter)
    } else {
        Box::new(TableFormatter::default())
    }
}
