//! Common test utilities and helpers for delistat tests
//!
//! Fixture CSVs mirror the three layouts found in the published police
//! statistics, plus a builder for small in-memory tables.

#![allow(dead_code)]

pub mod http;

use delistat::cli::Cli;
use delistat_core::{Table, Value};
use std::fs;
use tempfile::TempDir;

/// One row per crime, one column per month
pub const WIDE_BY_MONTH_CSV: &str = "\
Delito,Enero,Febrero,Marzo
Robo con violencia,120,95,130
Hurto,300,280,310
Lesiones,40,,35
";

/// One row per crime, one column per region
pub const WIDE_BY_REGION_CSV: &str = "\
Tipo Delito,Región de Valparaíso,Región del Maule,Región de Ñuble
Robo con violencia,500,120,60
Hurto,900,250,80
";

/// Already long: one row per region, month and crime
pub const LONG_CSV: &str = "\
Año,Mes,Región,Delito,Frecuencia
2023,1,Maule,Robo,10
2023,2,Maule,Robo,12
2023,1,Maule,Hurto,30
2023,1,Ñuble,Robo,4
2023,3,Ñuble,Hurto,n/a
2023,2,Biobío,Robo,22
";

/// Create a data folder holding the given `(file name, contents)` pairs
pub fn data_dir(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (name, contents) in files {
        fs::write(dir.path().join(name), contents).unwrap();
    }
    dir
}

/// Data folder with all three fixture layouts
pub fn fixture_dir() -> TempDir {
    data_dir(&[
        ("2023_largo.csv", LONG_CSV),
        ("mensual.csv", WIDE_BY_MONTH_CSV),
        ("regional.csv", WIDE_BY_REGION_CSV),
    ])
}

/// Parse a command line pointed at `dir`
pub fn cli_for(dir: &TempDir, args: &[&str]) -> Cli {
    use clap::Parser;

    let data_dir = dir.path().to_string_lossy().to_string();
    let mut argv = vec!["delistat", "--data-dir", data_dir.as_str()];
    argv.extend_from_slice(args);
    Cli::parse_from(argv)
}

/// Builder for small test tables
pub struct TableBuilder {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl TableBuilder {
    /// Start a table with the given header
    pub fn new(columns: &[&str]) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// Add a row; each cell goes through `Value::infer`
    pub fn row(mut self, cells: &[&str]) -> Self {
        self.rows.push(cells.iter().map(|c| Value::infer(c)).collect());
        self
    }

    pub fn build(self) -> Table {
        Table::from_rows(self.columns, self.rows).unwrap()
    }
}
