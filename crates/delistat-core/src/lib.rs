//! Core types, traits, and utilities for delistat
//!
//! This crate provides the tabular model, error handling, the record source
//! trait and column-name normalization used by all other delistat crates.

pub mod error;
pub mod normalize;
pub mod provider;
pub mod types;

// Re-export commonly used types
pub use error::{DelistatError, Result};
pub use provider::{RecordSource, RecordStream};
pub use types::{Record, Table, Value};
