//! Command execution
//!
//! Loads the table from the selected source, applies the common cleaning
//! step and runs the requested command, returning the rendered output so
//! `main` only has to print it.

use crate::aggregation::{
    GroupTotal, Totals, evolution, monthly_for_region, ranking, summarize, top_n,
};
use crate::chart::{Chart, ChartKind, auto_column, series_from_column, series_from_groups};
use crate::cleaning::{basic_clean, coerce_numeric, parse_dates};
use crate::cli::{Cli, ColumnArgs, Command, SourceKind};
use crate::export::export_csv;
use crate::filters::{RowFilter, distinct_values};
use crate::output::{OutputFormatter, get_formatter};
use crate::shape::{ShapeReport, detect_shape, to_long};
use delistat_core::{DelistatError, RecordSource, Result, Table};
use delistat_source_ckan::CkanConfig;
use delistat_source_csv::{CsvConfig, list_csv_files};
use std::path::Path;
use tracing::{debug, info};

/// Build the record source selected on the command line
pub fn build_source(cli: &Cli, show_progress: bool) -> Result<Box<dyn RecordSource>> {
    match cli.source {
        SourceKind::Csv => {
            let mut config = CsvConfig::new(&cli.data_dir);
            if let Some(file) = &cli.file {
                config = config.with_file(file.clone());
            }
            Ok(Box::new(delistat_source_csv::DataLoader::new(config)?))
        }
        SourceKind::Api => {
            let non_empty = |s: &str| (!s.trim().is_empty()).then(|| s.to_string());
            let mut config = CkanConfig::default()
                .with_base_url(cli.api_url.clone())
                .with_resource_id(non_empty(&cli.resource_id))
                .with_records_path(non_empty(&cli.records_path))
                .with_page_size(cli.page_size)
                .with_max_records(cli.max_records)
                .with_pagination(!cli.single_request);
            for (key, value) in &cli.params {
                config = config.with_param(key.clone(), value.clone());
            }
            let loader = delistat_source_ckan::DataLoader::new(config)?.with_progress(show_progress);
            Ok(Box::new(loader))
        }
    }
}

/// Load the table and normalize its column names unless disabled
pub async fn load_table(cli: &Cli, source: &dyn RecordSource) -> Result<Table> {
    info!("Loading data from {}", source.label());
    let mut table = source.load_table().await?;
    if table.width() == 0 {
        return Err(DelistatError::NoData(source.label()));
    }
    let dates: Vec<String> = cli.dates.iter().map(|c| cli.column_name(c)).collect();
    let numeric: Vec<String> = cli.numeric.iter().map(|c| cli.column_name(c)).collect();
    if cli.raw_columns {
        parse_dates(&mut table, &dates);
        coerce_numeric(&mut table, &numeric);
    } else {
        basic_clean(&mut table, &dates, &numeric);
    }
    debug!("Loaded {} rows, columns: {:?}", table.len(), table.columns());
    Ok(table)
}

/// Explicit column (normalized like the table) or the detected one
fn pick_column(
    cli: &Cli,
    explicit: Option<&String>,
    detected: Option<&String>,
    flag: &str,
    what: &str,
) -> Result<String> {
    match (explicit, detected) {
        (Some(name), _) => Ok(cli.column_name(name)),
        (None, Some(name)) => Ok(name.clone()),
        (None, None) => Err(DelistatError::InvalidArgument(format!(
            "Could not detect the {what} column; pass it with {flag}"
        ))),
    }
}

/// Long form of the table plus the shape of that long form
fn long_view(table: &Table) -> Result<(Table, ShapeReport)> {
    let long = to_long(table, &detect_shape(table))?;
    let report = detect_shape(&long);
    Ok((long, report))
}

fn export_to(table: &Table, path: Option<&Path>) -> Result<()> {
    if let Some(path) = path {
        export_csv(table, path)?;
    }
    Ok(())
}

/// Grouped totals as a table, or as a chart when one was requested
fn render_groups(
    formatter: &dyn OutputFormatter,
    key_label: &str,
    value_label: &str,
    groups: &[GroupTotal],
    chart: Option<ChartKind>,
) -> String {
    match chart {
        Some(kind) => formatter.format_chart(
            &Chart::new(kind),
            key_label,
            &series_from_groups(groups),
        ),
        None => {
            let totals = Totals::from_groups(groups);
            formatter.format_groups(key_label, value_label, groups, &totals)
        }
    }
}

fn group_command(
    cli: &Cli,
    formatter: &dyn OutputFormatter,
    long: &Table,
    key_column: String,
    columns: &ColumnArgs,
    report: &ShapeReport,
    run: impl FnOnce(&Table, &str, &str) -> Result<Vec<GroupTotal>>,
) -> Result<String> {
    let value = pick_column(
        cli,
        columns.value.as_ref(),
        report.value_column.as_ref(),
        "--value",
        "value",
    )?;
    let groups = run(long, &key_column, &value)?;
    Ok(render_groups(formatter, &key_column, &value, &groups, columns.chart))
}

/// Run the command on an already loaded table
pub fn execute(cli: &Cli, table: &Table) -> Result<String> {
    let formatter = get_formatter(cli.json);

    match &cli.command {
        Command::Files => list_files(cli),
        Command::Show { rows } => Ok(formatter.format_table(&table.head(*rows), table.len())),
        Command::Shape => Ok(formatter.format_shape(&detect_shape(table))),
        Command::Reshape { export, rows } => {
            let (long, _) = long_view(table)?;
            export_to(&long, export.as_deref())?;
            Ok(formatter.format_table(&long.head(*rows), long.len()))
        }
        Command::Search {
            column,
            text,
            export,
            rows,
        } => {
            let found = RowFilter::new()
                .with_contains(cli.column_name(column), text)
                .apply(table)?;
            info!("Found {} rows matching '{}'", found.len(), text);
            export_to(&found, export.as_deref())?;
            Ok(formatter.format_table(&found.head(*rows), found.len()))
        }
        Command::Top { columns, limit } => {
            let (long, report) = long_view(table)?;
            let key = pick_column(
                cli,
                columns.by.as_ref(),
                report.crime_column.as_ref(),
                "--by",
                "crime",
            )?;
            group_command(cli, formatter.as_ref(), &long, key, columns, &report, |t, k, v| {
                top_n(t, k, v, *limit)
            })
        }
        Command::Ranking { columns } => {
            let (long, report) = long_view(table)?;
            let key = pick_column(
                cli,
                columns.by.as_ref(),
                report.region_column.as_ref(),
                "--by",
                "region",
            )?;
            group_command(cli, formatter.as_ref(), &long, key, columns, &report, ranking)
        }
        Command::Trend { columns } => {
            let (long, report) = long_view(table)?;
            let detected = report.month_column.as_ref().or(report.year_column.as_ref());
            let key = pick_column(cli, columns.by.as_ref(), detected, "--by", "period")?;
            group_command(cli, formatter.as_ref(), &long, key, columns, &report, evolution)
        }
        Command::Region {
            name,
            column,
            month,
            value,
            chart,
        } => {
            let (long, report) = long_view(table)?;
            let region_col = pick_column(
                cli,
                column.as_ref(),
                report.region_column.as_ref(),
                "--column",
                "region",
            )?;
            let month_col = pick_column(
                cli,
                month.as_ref(),
                report.month_column.as_ref(),
                "--month",
                "month",
            )?;
            let value_col = pick_column(
                cli,
                value.as_ref(),
                report.value_column.as_ref(),
                "--value",
                "value",
            )?;
            let regions = distinct_values(&long, &region_col)?;
            if !regions.iter().any(|r| r == name) {
                return Err(DelistatError::InvalidArgument(format!(
                    "Unknown region '{}'; available: {}",
                    name,
                    regions.join(", ")
                )));
            }
            let groups = monthly_for_region(&long, &region_col, name, &month_col, &value_col)?;
            Ok(render_groups(
                formatter.as_ref(),
                &month_col,
                &value_col,
                &groups,
                *chart,
            ))
        }
        Command::Regions { column } => {
            let (long, report) = long_view(table)?;
            let region_col = pick_column(
                cli,
                column.as_ref(),
                report.region_column.as_ref(),
                "--column",
                "region",
            )?;
            let regions = distinct_values(&long, &region_col)?;
            Ok(formatter.format_values(&region_col, &regions))
        }
        Command::Summary => Ok(formatter.format_summary(&summarize(table))),
        Command::Chart { column, kind } => {
            let column = match column {
                Some(name) => cli.column_name(name),
                None => auto_column(table).ok_or_else(|| {
                    DelistatError::InvalidArgument(
                        "No numeric columns to chart in this dataset".to_string(),
                    )
                })?,
            };
            let series = series_from_column(table, &column)?;
            Ok(formatter.format_chart(&Chart::new(*kind), &column, &series))
        }
        Command::Export { output, long } => {
            let table = if *long {
                long_view(table)?.0
            } else {
                table.clone()
            };
            export_csv(&table, output)?;
            Ok(formatter.format_export(table.len(), output))
        }
    }
}

fn list_files(cli: &Cli) -> Result<String> {
    let files = list_csv_files(&cli.data_dir)?;
    Ok(get_formatter(cli.json).format_files(&files))
}

/// Load from the selected source and run the command
pub async fn run(cli: &Cli, show_progress: bool) -> Result<String> {
    if matches!(cli.command, Command::Files) {
        return list_files(cli);
    }
    let source = build_source(cli, show_progress)?;
    let table = load_table(cli, source.as_ref()).await?;
    execute(cli, &table)
}
