use crate::error::{ProcessingError, Result};
use crate::models::{AttendanceRow, CandidateResults, CountyAggregate};
use crate::readers::PresenceSchema;
use csv::ReaderBuilder;
use serde::de::DeserializeOwned;
use std::path::Path;
use tracing::debug;
use validator::Validate;

const ATTENDANCE_COLUMNS: [&str; 3] = ["county", "total_voters", "votes_cast"];
const RESULTS_COLUMNS: [&str; 6] = [
    "county",
    "candidate_1",
    "candidate_2",
    "candidate_3",
    "candidate_4",
    "candidate_5",
];

/// Persisted attendance table
pub fn read_attendance(path: &Path) -> Result<Vec<CountyAggregate>> {
    read_table::<AttendanceRow>(path, &ATTENDANCE_COLUMNS)?
        .into_iter()
        .map(CountyAggregate::try_from)
        .collect()
}

/// Persisted candidate results table
pub fn read_results(path: &Path) -> Result<Vec<CandidateResults>> {
    let rows = read_table::<CandidateResults>(path, &RESULTS_COLUMNS)?;
    for row in &rows {
        row.validate()?;
    }
    Ok(rows)
}

/// Timestamp of the first row, if the table exists and has one
pub fn first_timestamp(path: &Path) -> Option<String> {
    let mut reader = ReaderBuilder::new().from_path(path).ok()?;
    let position = reader.headers().ok()?.iter().position(|h| h == "timestamp")?;
    let record = reader.records().next()?.ok()?;
    record.get(position).map(str::to_string)
}

fn read_table<T: DeserializeOwned>(path: &Path, required: &[&str]) -> Result<Vec<T>> {
    if !path.is_file() {
        return Err(ProcessingError::NotFound(format!(
            "{} does not exist",
            path.display()
        )));
    }

    let mut reader = ReaderBuilder::new().from_path(path)?;
    let schema = PresenceSchema::new(reader.headers()?.iter().map(str::to_string).collect());
    let required: Vec<String> = required.iter().map(|c| c.to_string()).collect();
    schema.require(&path.display().to_string(), &required)?;

    let rows = reader
        .deserialize()
        .collect::<std::result::Result<Vec<T>, csv::Error>>()?;

    debug!(path = %path.display(), rows = rows.len(), "Read aggregate table");
    Ok(rows)
}
