//! CSV export of tables
//!
//! Cells are written with their display text, so integral numbers have no
//! trailing `.0` and missing cells are empty.

use delistat_core::{DelistatError, Result, Table};
use std::io::Write;
use std::path::Path;
use tracing::info;

/// Write `table` as CSV, header first
pub fn write_csv<W: Write>(table: &Table, writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(table.columns())?;
    for row in table.rows() {
        csv_writer.write_record(row.iter().map(|v| v.to_string()))?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Render `table` as a CSV string
pub fn to_csv_string(table: &Table) -> Result<String> {
    let mut buffer = Vec::new();
    write_csv(table, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| DelistatError::InvalidArgument(e.to_string()))
}

/// Write `table` to a CSV file, replacing it if it exists
pub fn export_csv(table: &Table, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)?;
    write_csv(table, std::io::BufWriter::new(file))?;
    info!("Exported {} rows to {}", table.len(), path.display());
    Ok(())
}
