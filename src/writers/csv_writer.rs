use crate::error::{ProcessingError, Result};
use crate::models::{AttendanceRow, CandidateResults, CountyAggregate};
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::info;

/// Writes tables through a temporary file in the target directory that is
/// renamed over the destination, so readers never see a partial file.
pub struct CsvWriter;

impl CsvWriter {
    pub fn new() -> Self {
        Self
    }

    pub fn write_attendance(&self, aggregates: &[CountyAggregate], path: &Path) -> Result<()> {
        let rows: Vec<AttendanceRow> = aggregates.iter().map(AttendanceRow::from).collect();
        self.write_rows(&rows, path)
    }

    pub fn write_results(&self, results: &[CandidateResults], path: &Path) -> Result<()> {
        self.write_rows(results, path)
    }

    /// Serialize rows with a header derived from the row type
    pub fn write_rows<T: Serialize>(&self, rows: &[T], path: &Path) -> Result<()> {
        let mut temp = self.temp_file_for(path)?;
        {
            let mut writer = csv::Writer::from_writer(temp.as_file_mut());
            for row in rows {
                writer.serialize(row)?;
            }
            writer.flush()?;
        }
        self.commit(temp, path)?;

        info!(path = %path.display(), rows = rows.len(), "Wrote table");
        Ok(())
    }

    /// Pretty-printed JSON document
    pub fn write_json<T: Serialize>(&self, value: &T, path: &Path) -> Result<()> {
        let mut temp = self.temp_file_for(path)?;
        serde_json::to_writer_pretty(temp.as_file_mut(), value)?;
        temp.as_file_mut().write_all(b"\n")?;
        self.commit(temp, path)?;

        info!(path = %path.display(), "Wrote JSON document");
        Ok(())
    }

    fn temp_file_for(&self, path: &Path) -> Result<NamedTempFile> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;
        Ok(NamedTempFile::new_in(dir)?)
    }

    fn commit(&self, temp: NamedTempFile, path: &Path) -> Result<()> {
        temp.as_file().sync_all()?;
        temp.persist(path)
            .map_err(|e| ProcessingError::Io(e.error))?;
        Ok(())
    }
}

impl Default for CsvWriter {
    fn default() -> Self {
        Self::new()
    }
}
