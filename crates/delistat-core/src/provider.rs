//! Record source trait
//!
//! This module defines the `RecordSource` trait that the provider crates
//! implement. It gives the binary one interface over the paginated API and
//! the local CSV folder: stream records, or collect them into a `Table`.

use crate::error::Result;
use crate::types::{Record, Table};
use async_trait::async_trait;
use futures::stream::{Stream, StreamExt};
use std::pin::Pin;

/// Boxed stream of records returned by a source
pub type RecordStream<'a> = Pin<Box<dyn Stream<Item = Result<Record>> + Send + 'a>>;

/// Trait for record providers.
///
/// Each provider crate (CKAN API, CSV folder) implements this trait so the
/// binary can load data through generic code.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Human readable description of where the records come from
    fn label(&self) -> String;

    /// Stream every record from the source.
    fn load_records(&self) -> RecordStream<'_>;

    /// Collect all records into a table.
    ///
    /// The first error in the stream aborts loading.
    async fn load_table(&self) -> Result<Table> {
        let mut stream = self.load_records();
        let mut records = Vec::new();
        while let Some(record) = stream.next().await {
            records.push(record?);
        }
        Ok(Table::from_records(records))
    }
}
