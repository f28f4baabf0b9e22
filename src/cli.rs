//! CLI interface for delistat
//!
//! This module defines the command-line interface using clap. Global options
//! select and configure the data source; the subcommand picks what to do
//! with the loaded table.
//!
//! # Example
//!
//! ```bash
//! # List the CSV files in ./data
//! delistat files
//!
//! # Top 5 crimes in a local file, as JSON
//! delistat --file delitos_2023.csv top -n 5 --json
//!
//! # Region ranking straight from datos.gob.cl
//! delistat --source api --max-records 5000 ranking
//! ```

use crate::chart::ChartKind;
use clap::{Args, Parser, Subcommand, ValueEnum};
use delistat_core::normalize::normalize_column_name;
use delistat_source_ckan::data_loader::{
    DEFAULT_BASE_URL, DEFAULT_PAGE_SIZE, DEFAULT_RECORDS_PATH, DEFAULT_RESOURCE_ID,
};
use std::path::PathBuf;

/// Explore Chilean police crime statistics from CSV files or datos.gob.cl
#[derive(Parser, Debug, Clone)]
#[command(name = "delistat")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Where to load data from
    #[arg(long, value_enum, default_value = "csv", global = true)]
    pub source: SourceKind,

    /// Folder holding the CSV files
    #[arg(long, env = "DELISTAT_DATA_DIR", default_value = "data", global = true)]
    pub data_dir: PathBuf,

    /// CSV file to load (defaults to the first file in the folder)
    #[arg(long, short = 'f', global = true)]
    pub file: Option<String>,

    /// API endpoint
    #[arg(long, env = "DELISTAT_API_URL", default_value = DEFAULT_BASE_URL, global = true)]
    pub api_url: String,

    /// CKAN resource id; pass an empty value to omit it
    #[arg(long, env = "DELISTAT_RESOURCE_ID", default_value = DEFAULT_RESOURCE_ID, global = true)]
    pub resource_id: String,

    /// Dotted path to the records in the response; empty picks the first list found
    #[arg(long, default_value = DEFAULT_RECORDS_PATH, global = true)]
    pub records_path: String,

    /// Records requested per API call
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE, global = true)]
    pub page_size: usize,

    /// Stop after this many API records
    #[arg(long, global = true)]
    pub max_records: Option<usize>,

    /// Issue a single GET instead of paginating with limit/offset
    #[arg(long, global = true)]
    pub single_request: bool,

    /// Extra query parameter for the API, as key=value (repeatable)
    #[arg(long = "param", value_parser = parse_param, global = true)]
    pub params: Vec<(String, String)>,

    /// Keep column names as they come instead of normalizing them
    #[arg(long, global = true)]
    pub raw_columns: bool,

    /// Columns to parse as dates (comma-separated)
    #[arg(long, value_delimiter = ',', global = true)]
    pub dates: Vec<String>,

    /// Columns to force to numbers; cells that do not parse become empty
    #[arg(long, value_delimiter = ',', global = true)]
    pub numeric: Vec<String>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Only log errors
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Show informational output (default is warnings and errors only)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Data source selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceKind {
    /// Local CSV folder
    Csv,
    /// CKAN / JSON API
    Api,
}

/// Column overrides shared by the grouping commands
#[derive(Args, Debug, Clone, Default)]
pub struct ColumnArgs {
    /// Column to group by (detected when omitted)
    #[arg(long)]
    pub by: Option<String>,

    /// Column to sum (detected when omitted)
    #[arg(long)]
    pub value: Option<String>,

    /// Draw the totals as a chart instead of a table
    #[arg(long, value_enum)]
    pub chart: Option<ChartKind>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// List the CSV files in the data folder
    Files,

    /// Preview the first rows
    Show {
        /// Number of rows to show
        #[arg(long, short = 'n', default_value_t = 10)]
        rows: usize,
    },

    /// Report the detected layout and key columns
    Shape,

    /// Convert a wide table to long form
    Reshape {
        /// Write the long table to this CSV file
        #[arg(long)]
        export: Option<PathBuf>,

        /// Number of rows to show
        #[arg(long, short = 'n', default_value_t = 10)]
        rows: usize,
    },

    /// Find rows whose column contains a text (case-insensitive)
    Search {
        /// Column to search
        #[arg(long, short = 'c')]
        column: String,

        /// Text to look for
        #[arg(long, short = 't')]
        text: String,

        /// Write the matching rows to this CSV file
        #[arg(long)]
        export: Option<PathBuf>,

        /// Number of rows to show
        #[arg(long, short = 'n', default_value_t = 50)]
        rows: usize,
    },

    /// Crimes with the highest totals
    Top {
        #[command(flatten)]
        columns: ColumnArgs,

        /// How many crimes to show
        #[arg(long = "limit", short = 'n', default_value_t = 10)]
        limit: usize,
    },

    /// Regions ordered by total
    Ranking {
        #[command(flatten)]
        columns: ColumnArgs,
    },

    /// Totals per period in chronological order
    Trend {
        #[command(flatten)]
        columns: ColumnArgs,
    },

    /// Month-by-month totals for one region
    Region {
        /// Region as it appears in the data
        #[arg(long)]
        name: String,

        /// Region column (detected when omitted)
        #[arg(long)]
        column: Option<String>,

        /// Month column (detected when omitted)
        #[arg(long)]
        month: Option<String>,

        /// Column to sum (detected when omitted)
        #[arg(long)]
        value: Option<String>,

        /// Draw the monthly totals as a chart instead of a table
        #[arg(long, value_enum)]
        chart: Option<ChartKind>,
    },

    /// List the regions present in the data
    Regions {
        /// Region column (detected when omitted)
        #[arg(long)]
        column: Option<String>,
    },

    /// Descriptive statistics per column
    Summary,

    /// Chart a numeric column row by row
    Chart {
        /// Column to plot (first numeric column when omitted)
        #[arg(long)]
        column: Option<String>,

        /// Chart style
        #[arg(long, value_enum, default_value = "line")]
        kind: ChartKind,
    },

    /// Write the loaded table to a CSV file
    Export {
        /// Destination file
        #[arg(long, short = 'o')]
        output: PathBuf,

        /// Reshape to long form before writing
        #[arg(long)]
        long: bool,
    },
}

impl Cli {
    /// Log filter directive for the selected verbosity
    pub fn log_directive(&self) -> &'static str {
        if self.quiet {
            "error"
        } else if self.verbose {
            "delistat=info"
        } else {
            "delistat=warn"
        }
    }

    /// Whether to draw the download progress bar
    ///
    /// The bar is drawn on stderr, so that is the stream that must be a
    /// terminal; JSON and quiet runs never show it.
    pub fn show_progress(&self, stderr_is_terminal: bool) -> bool {
        !self.json && !self.quiet && stderr_is_terminal
    }

    /// Column name as it will appear in the loaded table
    pub fn column_name(&self, name: &str) -> String {
        if self.raw_columns {
            name.to_string()
        } else {
            normalize_column_name(name)
        }
    }
}

/// Parse a `key=value` query parameter
///
/// ```
/// use delistat::cli::parse_param;
///
/// assert_eq!(parse_param("q=robo").unwrap(), ("q".to_string(), "robo".to_string()));
/// assert!(parse_param("q").is_err());
/// ```
pub fn parse_param(raw: &str) -> std::result::Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected key=value, got '{raw}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["delistat", "files"]);
        assert_eq!(cli.source, SourceKind::Csv);
        assert_eq!(cli.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(cli.records_path, "result.records");
        assert!(cli.params.is_empty());
        assert!(matches!(cli.command, Command::Files));
        assert_eq!(cli.log_directive(), "delistat=warn");
    }

    #[test]
    fn test_global_options_after_subcommand() {
        let cli = Cli::parse_from([
            "delistat",
            "top",
            "-n",
            "3",
            "--source",
            "api",
            "--param",
            "q=robo",
            "--max-records",
            "500",
            "--json",
        ]);
        assert_eq!(cli.source, SourceKind::Api);
        assert_eq!(cli.params, vec![("q".to_string(), "robo".to_string())]);
        assert_eq!(cli.max_records, Some(500));
        assert!(cli.json);
        match cli.command {
            Command::Top { limit, columns } => {
                assert_eq!(limit, 3);
                assert!(columns.by.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_search_and_chart_args() {
        let cli = Cli::parse_from(["delistat", "search", "-c", "delito", "-t", "robo"]);
        match cli.command {
            Command::Search { column, text, export, rows } => {
                assert_eq!(column, "delito");
                assert_eq!(text, "robo");
                assert!(export.is_none());
                assert_eq!(rows, 50);
            }
            other => panic!("unexpected command {other:?}"),
        }

        let cli = Cli::parse_from(["delistat", "chart", "--kind", "share"]);
        assert!(matches!(
            cli.command,
            Command::Chart {
                kind: ChartKind::Share,
                column: None
            }
        ));
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["delistat", "-q", "-v", "files"]).is_err());
        let cli = Cli::parse_from(["delistat", "-q", "files"]);
        assert_eq!(cli.log_directive(), "error");
    }

    #[test]
    fn test_bad_param_rejected() {
        assert!(Cli::try_parse_from(["delistat", "--param", "nokey", "files"]).is_err());
        assert!(parse_param("=x").is_err());
        assert_eq!(
            parse_param("filters={\"a\":1}").unwrap(),
            ("filters".to_string(), "{\"a\":1}".to_string())
        );
    }

    #[test]
    fn test_cleaning_column_lists() {
        let cli = Cli::parse_from([
            "delistat",
            "show",
            "--dates",
            "fecha,Fecha Hecho",
            "--numeric",
            "total",
        ]);
        assert_eq!(cli.dates, vec!["fecha", "Fecha Hecho"]);
        assert_eq!(cli.numeric, vec!["total"]);
    }

    #[test]
    fn test_column_name_normalization() {
        let cli = Cli::parse_from(["delistat", "summary"]);
        assert_eq!(cli.column_name("Región"), "region");
        let cli = Cli::parse_from(["delistat", "--raw-columns", "summary"]);
        assert_eq!(cli.column_name("Región"), "Región");
    }

    #[test]
    fn test_grouping_chart_flag() {
        let cli = Cli::parse_from(["delistat", "ranking", "--chart", "share"]);
        match cli.command {
            Command::Ranking { columns } => assert_eq!(columns.chart, Some(ChartKind::Share)),
            other => panic!("unexpected command {other:?}"),
        }

        let cli = Cli::parse_from(["delistat", "region", "--name", "Maule", "--chart", "line"]);
        assert!(matches!(
            cli.command,
            Command::Region {
                chart: Some(ChartKind::Line),
                ..
            }
        ));

        let cli = Cli::parse_from(["delistat", "top"]);
        assert!(matches!(cli.command, Command::Top { ref columns, .. } if columns.chart.is_none()));
        assert!(Cli::try_parse_from(["delistat", "trend", "--chart", "pie"]).is_err());
    }

    #[test]
    fn test_progress_follows_stderr() {
        let cli = Cli::parse_from(["delistat", "--source", "api", "ranking"]);
        assert!(cli.show_progress(true));
        assert!(!cli.show_progress(false));

        let cli = Cli::parse_from(["delistat", "--source", "api", "ranking", "--json"]);
        assert!(!cli.show_progress(true));
        let cli = Cli::parse_from(["delistat", "-q", "--source", "api", "ranking"]);
        assert!(!cli.show_progress(true));
    }
}
