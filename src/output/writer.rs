//! CSV writing

use crate::error::{Error, Result};
use crate::extract::NamedTable;
use crate::schema::{sanitize_columns, RawTable};
use std::fs::File;
use std::path::{Path, PathBuf};

use super::path::output_file_name;

/// Streaming CSV writer
pub struct CsvWriter {
    writer: csv::Writer<File>,
    width: usize,
    rows_written: usize,
}

impl CsvWriter {
    /// Create `path` and write the header row, sanitizing names
    pub fn new(path: impl AsRef<Path>, headers: &[String]) -> Result<Self> {
        let file = File::create(path.as_ref()).map_err(|e| Error::Output {
            message: format!("Failed to create {}: {e}", path.as_ref().display()),
        })?;

        let mut writer = csv::Writer::from_writer(file);
        writer.write_record(sanitize_columns(headers)?)?;

        Ok(Self {
            writer,
            width: headers.len(),
            rows_written: 0,
        })
    }

    pub fn write_row(&mut self, row: &[String]) -> Result<()> {
        if row.len() != self.width {
            return Err(Error::Output {
                message: format!("row has {} cells, header has {}", row.len(), self.width),
            });
        }
        self.writer.write_record(row)?;
        self.rows_written += 1;
        Ok(())
    }

    #[must_use]
    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    /// Flush and close the file
    pub fn close(mut self) -> Result<usize> {
        self.writer.flush()?;
        Ok(self.rows_written)
    }
}

/// Write a whole table to `path`
pub fn write_csv(path: impl AsRef<Path>, table: &RawTable) -> Result<usize> {
    let mut writer = CsvWriter::new(path, table.headers())?;
    for row in table.rows() {
        writer.write_row(row)?;
    }
    writer.close()
}

/// A file produced by [`write_tables`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFile {
    pub suffix: &'static str,
    pub path: PathBuf,
    pub rows: usize,
}

/// Write every non-empty table under `directory` as
/// `<base><suffix>[_<timestamp>].csv`. Empty tables are skipped.
pub fn write_tables(
    directory: &Path,
    base: &str,
    tables: &[NamedTable],
    timestamp: Option<&str>,
) -> Result<Vec<WrittenFile>> {
    std::fs::create_dir_all(directory)?;

    let mut written = Vec::with_capacity(tables.len());
    for named in tables {
        if named.table.is_empty() {
            tracing::warn!("No rows for {base}{}, skipping file", named.suffix);
            continue;
        }
        let path = directory.join(output_file_name(base, named.suffix, timestamp));
        let rows = write_csv(&path, &named.table)?;
        tracing::info!("Wrote {} rows to {}", rows, path.display());
        written.push(WrittenFile {
            suffix: named.suffix,
            path,
            rows,
        });
    }
    Ok(written)
}
