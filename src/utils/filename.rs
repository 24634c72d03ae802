use crate::utils::constants::{ARCHIVE_STAMP_FORMAT, PROCESSED_PREFIX, TIMESTAMP_FORMAT};
use chrono::{Local, NaiveDateTime};
use std::path::Path;

/// Current local time in the aggregate-table format: `YYYY-MM-DD HH:MM:SS`
pub fn current_timestamp() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Archive name for a processed presence file.
///
/// Every non-alphanumeric character of the source file name becomes `_`:
/// `presence_now.csv` at 2024-12-02 07:00:00 turns into
/// `processed_presence_now_csv_20241202_070000.csv`. Returns `None` for
/// files that are already archive copies.
pub fn processed_copy_filename(source: &Path, at: NaiveDateTime) -> Option<String> {
    let name = source.file_name()?.to_string_lossy();
    if name.starts_with(PROCESSED_PREFIX) {
        return None;
    }

    let sanitized: String = name
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();

    Some(format!(
        "{}{}_{}.csv",
        PROCESSED_PREFIX,
        sanitized,
        at.format(ARCHIVE_STAMP_FORMAT)
    ))
}
