//! delistat - Fetch, reshape and summarize Chilean police crime statistics
//!
//! This library provides functionality to:
//! - Load records from local CSV folders or the datos.gob.cl CKAN API
//! - Normalize column names and clean numeric and date columns
//! - Detect wide layouts (a column per month or region) and melt them to long form
//! - Filter, rank and aggregate crime counts
//! - Render results as tables, JSON, terminal charts or CSV
//!
//! # Examples
//!
//! ```no_run
//! use delistat::{aggregation::top_n, shape::{detect_shape, to_long}};
//! use delistat_core::{RecordSource, normalize::normalize_column_names};
//! use delistat_source_csv::{CsvConfig, DataLoader};
//!
//! #[tokio::main]
//! async fn main() -> delistat::Result<()> {
//!     let loader = DataLoader::new(CsvConfig::new("data"))?;
//!     let mut table = loader.load_table().await?;
//!     normalize_column_names(&mut table);
//!
//!     let long = to_long(&table, &detect_shape(&table))?;
//!     for group in top_n(&long, "delito", "cantidad", 5)? {
//!         println!("{}: {}", group.key, group.total);
//!     }
//!     Ok(())
//! }
//! ```

pub mod aggregation;
pub mod app;
pub mod chart;
pub mod cleaning;
pub mod cli;
pub mod export;
pub mod filters;
pub mod output;
pub mod shape;

// Re-export commonly used types
pub use delistat_core::{DelistatError, Record, RecordSource, Result, Table, Value};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
