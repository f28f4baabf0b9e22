//! CKAN provider for delistat
//!
//! This crate implements the record source trait for CKAN `datastore_search`
//! endpoints such as datos.gob.cl, handling `limit`/`offset` pagination.

pub mod data_loader;

pub use data_loader::{CkanConfig, DataLoader, Page};
