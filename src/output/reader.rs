//! CSV reading

use crate::error::{Error, Result};
use crate::schema::RawTable;
use std::path::Path;

/// Read a CSV file with a header row into a string table.
///
/// Every cell stays text; types are decided later by schema inference.
pub fn read_csv(path: impl AsRef<Path>) -> Result<RawTable> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(Error::FileNotFound {
            path: path.display().to_string(),
        });
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)?;

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(i, h)| {
            let h = if i == 0 { h.trim_start_matches('\u{feff}') } else { h };
            h.trim().to_string()
        })
        .collect();
    if headers.iter().all(String::is_empty) {
        return Err(Error::validation(format!("{} has no header row", path.display())));
    }

    let mut table = RawTable::new(headers);
    for record in reader.records() {
        table.push_row(record?.iter().map(ToString::to_string).collect())?;
    }

    tracing::debug!("Read {} rows from {}", table.len(), path.display());
    Ok(table)
}
