//! Local CSV provider for delistat
//!
//! This crate implements the record source trait for a folder of CSV
//! exports, handling file discovery, ragged rows and byte-order marks.

pub mod data_loader;

pub use data_loader::{CsvConfig, DataLoader, list_csv_files, load_all, load_csv};
