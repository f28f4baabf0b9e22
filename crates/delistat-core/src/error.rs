//! Error types for delistat
//!
//! This module defines the error types used throughout the delistat crates.
//! All errors are derived from `thiserror` for convenient error handling
//! and automatic `From` implementations.
//!
//! # Example
//!
//! ```
//! use delistat_core::error::{DelistatError, Result};
//!
//! fn example_function() -> Result<()> {
//!     // This will automatically convert io::Error to DelistatError
//!     let _file = std::fs::read_to_string("nonexistent.csv")?;
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for delistat operations
///
/// Covers everything from reading local CSV folders to talking to the
/// CKAN datastore API and looking up columns in loaded tables.
#[derive(Error, Debug)]
pub enum DelistatError {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV reading or writing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Network error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Parse error with file context
    #[error("Parse error in {file}: {error}")]
    Parse {
        /// The file that caused the error
        file: PathBuf,
        /// The error message
        error: String,
    },

    /// The API answered but the payload did not look like a record list
    #[error("Unexpected API response: {0}")]
    UnexpectedResponse(String),

    /// A column referenced by name does not exist in the table
    #[error("Column not found: '{column}' (available: {available})")]
    ColumnNotFound {
        /// Requested column
        column: String,
        /// Comma-separated list of existing columns
        available: String,
    },

    /// The selected source produced no columns at all
    #[error("No data loaded from {0}")]
    NoData(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl DelistatError {
    /// Build a `ColumnNotFound` error listing the columns that do exist
    pub fn column_not_found(column: &str, available: &[String]) -> Self {
        DelistatError::ColumnNotFound {
            column: column.to_string(),
            available: available.join(", "),
        }
    }
}

/// Convenience type alias for Results in delistat
///
/// # Example
///
/// ```
/// use delistat_core::Result;
///
/// fn process_data() -> Result<String> {
///     Ok("Processed successfully".to_string())
/// }
/// ```
pub type Result<T> = std::result::Result<T, DelistatError>;
