//! Text charts for the terminal
//!
//! Charts are drawn with block characters so they work over SSH and in
//! plain logs. Width follows the terminal when there is one.

use crate::aggregation::GroupTotal;
use colored::*;
use delistat_core::{Result, Table, Value, types::format_number};
use serde::Serialize;

const BAR_FULL: &str = "█";
const SPARK_LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
const DEFAULT_WIDTH: usize = 80;
const MAX_LABEL_WIDTH: usize = 24;
const MIN_BAR_WIDTH: usize = 10;

/// Kind of chart to draw
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    /// Horizontal bars, one per label
    Bar,
    /// Sparkline of the values in order
    #[default]
    Line,
    /// Share of the total per label, largest first
    Share,
}

/// A labelled series
pub type Series = Vec<(String, f64)>;

/// Chart renderer
#[derive(Debug, Clone)]
pub struct Chart {
    kind: ChartKind,
    width: usize,
    color: bool,
}

/// Get terminal width using the cross-platform terminal_size crate
fn terminal_width() -> Option<usize> {
    terminal_size::terminal_size().map(|(width, _)| width.0 as usize)
}

fn fit_label(label: &str, width: usize) -> String {
    if label.chars().count() <= width {
        return label.to_string();
    }
    let mut cut: String = label.chars().take(width.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

fn format_value(n: f64) -> String {
    if n.fract() == 0.0 {
        format_number(n)
    } else {
        format!("{n:.2}")
    }
}

impl Chart {
    /// Chart sized to the current terminal
    pub fn new(kind: ChartKind) -> Self {
        Self {
            kind,
            width: terminal_width().unwrap_or(DEFAULT_WIDTH),
            color: true,
        }
    }

    /// Override the total width
    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }

    /// Kind of chart this renderer draws
    pub fn kind(&self) -> ChartKind {
        self.kind
    }

    /// Enable or disable ANSI colours
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    fn paint_bar(&self, bar: String) -> String {
        if self.color {
            bar.cyan().to_string()
        } else {
            bar
        }
    }

    fn paint_title(&self, title: &str) -> String {
        if self.color {
            title.bold().to_string()
        } else {
            title.to_string()
        }
    }

    /// Draw `series` under `title`
    pub fn render(&self, title: &str, series: &[(String, f64)]) -> String {
        let mut output = format!("{}\n", self.paint_title(title));
        if series.is_empty() {
            output.push_str("(no data)\n");
            return output;
        }
        let body = match self.kind {
            ChartKind::Bar => self.render_bars(series),
            ChartKind::Line => self.render_line(series),
            ChartKind::Share => self.render_share(series),
        };
        output.push_str(&body);
        output
    }

    fn label_width(series: &[(String, f64)]) -> usize {
        series
            .iter()
            .map(|(label, _)| label.chars().count())
            .max()
            .unwrap_or(0)
            .min(MAX_LABEL_WIDTH)
    }

    fn render_bars(&self, series: &[(String, f64)]) -> String {
        let label_w = Self::label_width(series);
        let values: Vec<String> = series.iter().map(|(_, v)| format_value(*v)).collect();
        let value_w = values.iter().map(|v| v.len()).max().unwrap_or(0);
        let bar_w = self
            .width
            .saturating_sub(label_w + value_w + 4)
            .max(MIN_BAR_WIDTH);
        let max = series.iter().map(|(_, v)| *v).fold(0.0_f64, f64::max);

        let mut output = String::new();
        for ((label, value), shown) in series.iter().zip(&values) {
            let filled = if max > 0.0 && *value > 0.0 {
                ((value / max) * bar_w as f64).round() as usize
            } else {
                0
            };
            output.push_str(&format!(
                "{:<label_w$} │{} {}\n",
                fit_label(label, label_w),
                self.paint_bar(BAR_FULL.repeat(filled.min(bar_w))),
                shown
            ));
        }
        output
    }

    fn render_line(&self, series: &[(String, f64)]) -> String {
        let avail = self.width.max(MIN_BAR_WIDTH);
        // Average neighbouring points when there are more points than columns
        let chunk = series.len().div_ceil(avail);
        let points: Vec<f64> = series
            .chunks(chunk)
            .map(|c| c.iter().map(|(_, v)| v).sum::<f64>() / c.len() as f64)
            .collect();

        let min = points.iter().copied().fold(f64::INFINITY, f64::min);
        let max = points.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let span = max - min;
        let spark: String = points
            .iter()
            .map(|v| {
                let level = if span > 0.0 {
                    (((v - min) / span) * (SPARK_LEVELS.len() - 1) as f64).round() as usize
                } else {
                    SPARK_LEVELS.len() / 2
                };
                SPARK_LEVELS[level.min(SPARK_LEVELS.len() - 1)]
            })
            .collect();

        let first = &series[0].0;
        let last = &series[series.len() - 1].0;
        format!(
            "{}\nmin {}  max {}  ({} .. {}, {} points)\n",
            self.paint_bar(spark),
            format_value(min),
            format_value(max),
            first,
            last,
            series.len()
        )
    }

    fn render_share(&self, series: &[(String, f64)]) -> String {
        let total: f64 = series.iter().map(|(_, v)| v.max(0.0)).sum();
        let mut sorted: Vec<&(String, f64)> = series.iter().collect();
        sorted.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let label_w = Self::label_width(series);
        let bar_w = self.width.saturating_sub(label_w + 12).max(MIN_BAR_WIDTH);

        let mut output = String::new();
        for (label, value) in sorted {
            let share = if total > 0.0 {
                value.max(0.0) / total
            } else {
                0.0
            };
            let filled = ((share * bar_w as f64).round() as usize).min(bar_w);
            output.push_str(&format!(
                "{:<label_w$} │{}{} {:>5.1}%\n",
                fit_label(label, label_w),
                self.paint_bar(BAR_FULL.repeat(filled)),
                " ".repeat(bar_w - filled),
                share * 100.0
            ));
        }
        output
    }
}

/// Series from grouped totals
pub fn series_from_groups(groups: &[GroupTotal]) -> Series {
    groups.iter().map(|g| (g.key.clone(), g.total)).collect()
}

/// First numeric column of a table, if any
pub fn auto_column(table: &Table) -> Option<String> {
    table.numeric_columns().into_iter().next()
}

/// Values of one column labelled by 1-based row number; non-numeric cells are skipped
pub fn series_from_column(table: &Table, column: &str) -> Result<Series> {
    Ok(table
        .column_values(column)?
        .enumerate()
        .filter_map(|(i, value)| match value {
            Value::Number(n) => Some(((i + 1).to_string(), *n)),
            _ => None,
        })
        .collect())
}
