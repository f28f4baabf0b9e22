//! Data loader for folders of CSV files
//!
//! Police statistics are published as one CSV per year or per crime family.
//! This module lists those files, reads them into [`Table`]s and exposes a
//! selected file as a [`RecordSource`].
//!
//! # Examples
//!
//! ```no_run
//! use delistat_core::RecordSource;
//! use delistat_source_csv::{CsvConfig, DataLoader};
//!
//! # async fn example() -> delistat_core::Result<()> {
//! let loader = DataLoader::new(CsvConfig::new("data").with_file("delitos_2023.csv"))?;
//! let table = loader.load_table().await?;
//! println!("{} rows", table.len());
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use delistat_core::error::{DelistatError, Result};
use delistat_core::provider::{RecordSource, RecordStream};
use delistat_core::types::{Record, Table, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

const UTF8_BOM: char = '\u{feff}';

/// Where to read CSV files from
#[derive(Debug, Clone)]
pub struct CsvConfig {
    /// Folder holding the CSV files
    pub data_dir: PathBuf,
    /// File to load; `None` picks the first file in name order
    pub file: Option<String>,
}

impl CsvConfig {
    /// Read from `data_dir`
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            file: None,
        }
    }

    /// Select a file by name
    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }
}

/// Names of the `.csv` files directly inside `dir`, sorted
///
/// # Errors
///
/// Returns `DelistatError::Config` if `dir` is not an existing directory.
pub fn list_csv_files(dir: &Path) -> Result<Vec<String>> {
    if !dir.is_dir() {
        return Err(DelistatError::Config(format!(
            "Data directory not found: {}",
            dir.display()
        )));
    }

    let mut files: Vec<String> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
        })
        .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
        .collect();
    files.sort();

    debug!("Found {} CSV files in {}", files.len(), dir.display());
    Ok(files)
}

/// Read one CSV file into a table
///
/// Rows shorter than the header are padded with nulls and longer rows are
/// cut to the header width. Every cell goes through [`Value::infer`].
pub fn load_csv(path: &Path) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(true)
        .from_path(path)
        .map_err(|e| parse_error(path, e))?;

    let columns: Vec<String> = reader
        .headers()
        .map_err(|e| parse_error(path, e))?
        .iter()
        .enumerate()
        .map(|(i, name)| {
            if i == 0 {
                name.trim_start_matches(UTF8_BOM).to_string()
            } else {
                name.to_string()
            }
        })
        .collect();

    let width = columns.len();
    let mut table = Table::new(columns);
    for result in reader.records() {
        let record = result.map_err(|e| parse_error(path, e))?;
        let mut row: Vec<Value> = record.iter().take(width).map(Value::infer).collect();
        row.resize(width, Value::Null);
        table.push_row(row)?;
    }

    debug!(
        "Loaded {} rows x {} columns from {}",
        table.len(),
        table.width(),
        path.display()
    );
    Ok(table)
}

fn parse_error(path: &Path, error: csv::Error) -> DelistatError {
    DelistatError::Parse {
        file: path.to_path_buf(),
        error: error.to_string(),
    }
}

/// Load every CSV file in `dir`, keyed by file name
///
/// Files that cannot be read are logged and skipped.
pub fn load_all(dir: &Path) -> Result<BTreeMap<String, Table>> {
    let mut tables = BTreeMap::new();
    for name in list_csv_files(dir)? {
        match load_csv(&dir.join(&name)) {
            Ok(table) => {
                tables.insert(name, table);
            }
            Err(e) => warn!("Skipping {}: {}", name, e),
        }
    }
    Ok(tables)
}

/// Record source over one CSV file of a data folder
pub struct DataLoader {
    config: CsvConfig,
    path: PathBuf,
}

impl DataLoader {
    /// Resolve the file to load
    ///
    /// # Errors
    ///
    /// Returns `Config` when the folder is missing or holds no CSV files,
    /// and `InvalidArgument` when the requested file is not in the folder.
    pub fn new(config: CsvConfig) -> Result<Self> {
        let files = list_csv_files(&config.data_dir)?;
        let name = match &config.file {
            Some(file) => files
                .iter()
                .find(|name| *name == file)
                .cloned()
                .ok_or_else(|| {
                    DelistatError::InvalidArgument(format!(
                        "'{}' is not a CSV file in {} (available: {})",
                        file,
                        config.data_dir.display(),
                        files.join(", ")
                    ))
                })?,
            None => files.first().cloned().ok_or_else(|| {
                DelistatError::Config(format!(
                    "No CSV files in {}",
                    config.data_dir.display()
                ))
            })?,
        };

        let path = config.data_dir.join(&name);
        info!("Using CSV file {}", path.display());
        Ok(Self { config, path })
    }

    /// The active configuration
    pub fn config(&self) -> &CsvConfig {
        &self.config
    }

    /// Full path of the selected file
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_table(&self) -> Result<Table> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || load_csv(&path))
            .await
            .map_err(|e| DelistatError::Io(std::io::Error::other(e)))?
    }
}

#[async_trait]
impl RecordSource for DataLoader {
    fn label(&self) -> String {
        self.path.display().to_string()
    }

    fn load_records(&self) -> RecordStream<'_> {
        Box::pin(async_stream::try_stream! {
            let table = self.read_table().await?;
            let columns = table.columns().to_vec();
            for row in table.rows() {
                let record: Record = columns.iter().cloned().zip(row.iter().cloned()).collect();
                yield record;
            }
        })
    }

    async fn load_table(&self) -> Result<Table> {
        self.read_table().await
    }
}
