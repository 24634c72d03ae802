use crate::config::ColumnMapping;
use crate::error::{ProcessingError, Result};
use crate::models::{RawStationRecord, FEATURES};
use crate::utils::constants::FEATURE_COUNT;
use crate::utils::fold_cedillas;
use csv::{ReaderBuilder, StringRecord, Trim};
use encoding_rs::WINDOWS_1250;
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Header set of a presence table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PresenceSchema {
    headers: Vec<String>,
}

impl PresenceSchema {
    pub fn new(headers: Vec<String>) -> Self {
        Self { headers }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn has(&self, column: &str) -> bool {
        self.position(column).is_some()
    }

    fn position(&self, column: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == column)
    }

    /// Fails with every absent column listed, not just the first one.
    pub fn require(&self, source_name: &str, columns: &[String]) -> Result<()> {
        let missing: Vec<String> = columns
            .iter()
            .filter(|c| !self.has(c))
            .cloned()
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ProcessingError::schema_violation(source_name, missing))
        }
    }
}

/// A fully loaded per-station presence table
#[derive(Debug, Clone)]
pub struct PresenceTable {
    pub source: PathBuf,
    pub schema: PresenceSchema,
    pub records: Vec<RawStationRecord>,
}

impl PresenceTable {
    /// Builds a table from in-memory records, as if every mapped column
    /// were present.
    pub fn from_records(columns: &ColumnMapping, records: Vec<RawStationRecord>) -> Self {
        let mut headers = vec![
            columns.county.clone(),
            columns.town.clone(),
            columns.station_id.clone(),
            columns.station_name.clone(),
            columns.station_type.clone(),
            columns.registered.clone(),
            columns.votes_cast.clone(),
            columns.cluster_votes_cast.clone(),
        ];
        headers.extend(columns.demographic_columns());

        Self {
            source: PathBuf::from("<memory>"),
            schema: PresenceSchema::new(headers),
            records,
        }
    }

    pub fn source_name(&self) -> String {
        self.source.display().to_string()
    }

    pub fn require(&self, columns: &[String]) -> Result<()> {
        self.schema.require(&self.source_name(), columns)
    }
}

/// Column positions resolved against one file's header row
struct ColumnIndex {
    county: Option<usize>,
    town: Option<usize>,
    station_id: Option<usize>,
    station_name: Option<usize>,
    station_type: Option<usize>,
    registered: Option<usize>,
    votes_cast: Option<usize>,
    cluster_votes: Option<usize>,
    demographics: [Option<usize>; FEATURE_COUNT],
}

impl ColumnIndex {
    fn resolve(schema: &PresenceSchema, columns: &ColumnMapping) -> Self {
        let mut demographics = [None; FEATURE_COUNT];
        for (slot, &(gender, band)) in demographics.iter_mut().zip(FEATURES.iter()) {
            *slot = schema.position(&columns.demographic(gender, band));
        }

        Self {
            county: schema.position(&columns.county),
            town: schema.position(&columns.town),
            station_id: schema.position(&columns.station_id),
            station_name: schema.position(&columns.station_name),
            station_type: schema.position(&columns.station_type),
            registered: schema.position(&columns.registered),
            votes_cast: schema.position(&columns.votes_cast),
            cluster_votes: schema.position(&columns.cluster_votes_cast),
            demographics,
        }
    }
}

pub struct PresenceReader {
    columns: ColumnMapping,
}

impl PresenceReader {
    pub fn new(columns: ColumnMapping) -> Self {
        Self { columns }
    }

    /// Read a per-station presence table fully into memory
    pub fn read(&self, path: &Path) -> Result<PresenceTable> {
        if !path.is_file() {
            return Err(ProcessingError::MissingInput(format!(
                "presence file {} not found",
                path.display()
            )));
        }

        let bytes = std::fs::read(path)?;
        let content = decode(&bytes);
        let table = self.parse(path, &content)?;

        info!(
            source = %path.display(),
            rows = table.records.len(),
            columns = table.schema.headers().len(),
            "Loaded presence table"
        );
        Ok(table)
    }

    fn parse(&self, path: &Path, content: &str) -> Result<PresenceTable> {
        let mut reader = ReaderBuilder::new()
            .comment(Some(b'/'))
            .flexible(true)
            .trim(Trim::All)
            .from_reader(content.as_bytes());

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(str::to_string)
            .collect();
        if headers.iter().all(|h| h.is_empty()) {
            return Err(ProcessingError::MissingInput(format!(
                "presence file {} has no header row",
                path.display()
            )));
        }

        let schema = PresenceSchema::new(headers);
        let index = ColumnIndex::resolve(&schema, &self.columns);
        let mut records = Vec::new();

        for (i, row) in reader.records().enumerate() {
            let row = row?;
            let line = row.position().map(|p| p.line()).unwrap_or(i as u64 + 2);
            records.push(self.parse_row(&row, &index, line)?);
        }

        debug!(source = %path.display(), rows = records.len(), "Parsed presence rows");

        Ok(PresenceTable {
            source: path.to_path_buf(),
            schema,
            records,
        })
    }

    fn parse_row(&self, row: &StringRecord, index: &ColumnIndex, line: u64) -> Result<RawStationRecord> {
        let text = |position: Option<usize>| {
            position
                .and_then(|p| row.get(p))
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let mut record = RawStationRecord {
            county: text(index.county),
            town: text(index.town),
            station_id: text(index.station_id),
            station_name: text(index.station_name),
            station_type: text(index.station_type),
            registered: required_count(row, index.registered, &self.columns.registered, line)?,
            votes_cast: required_count(row, index.votes_cast, &self.columns.votes_cast, line)?,
            cluster_votes: index.cluster_votes.and_then(|p| row.get(p)).and_then(parse_count),
            ..Default::default()
        };

        for (value, position) in record.demographics.iter_mut().zip(index.demographics.iter()) {
            *value = position
                .and_then(|p| row.get(p))
                .and_then(parse_count);
        }

        Ok(record)
    }
}

/// Decode raw bytes: UTF-8 (BOM stripped) when valid, Windows-1250 otherwise.
/// Windows-1250 text gets its cedilla s/t folded to comma-below.
fn decode(bytes: &[u8]) -> Cow<'_, str> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => {
            debug!("Presence file is not UTF-8, decoding as Windows-1250");
            let (text, _, _) = WINDOWS_1250.decode(bytes);
            Cow::Owned(fold_cedillas(&text))
        }
    }
}

/// Non-negative whole count; accepts decimal spellings such as `12.0`.
pub fn parse_count(value: &str) -> Option<u64> {
    let value = value.trim();
    if let Ok(count) = value.parse::<u64>() {
        return Some(count);
    }

    let number = value.parse::<f64>().ok()?;
    if number.is_finite() && number >= 0.0 && number.fract() == 0.0 && number <= u64::MAX as f64 {
        Some(number as u64)
    } else {
        None
    }
}

/// Empty cells are missing; anything else must be a count.
fn required_count(
    row: &StringRecord,
    position: Option<usize>,
    column: &str,
    line: u64,
) -> Result<Option<u64>> {
    let value = match position.and_then(|p| row.get(p)) {
        Some(v) if !v.is_empty() => v,
        _ => return Ok(None),
    };

    parse_count(value).map(Some).ok_or_else(|| {
        ProcessingError::InvalidFormat(format!(
            "line {}: column '{}' has non-numeric value '{}'",
            line, column, value
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AgeBand, Gender};
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str = "Judet,Localitate,Nr sectie de votare,Nume sectie de votare,Mediu,Înscriși pe liste permanente,LT,Barbati 18-24,Barbati 25-34,Barbati 35-44,Barbati 45-64,Barbati 65+,Femei 18-24,Femei 25-34,Femei 35-44,Femei 45-64,Femei 65+";

    fn reader() -> PresenceReader {
        PresenceReader::new(ColumnMapping::default())
    }

    #[test]
    fn test_read_presence_rows() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "{}", HEADER)?;
        writeln!(file, "CLUJ,Cluj-Napoca,1,Scoala 1,U,1000,400,20,20,20,20,20,20,20,20,20,20")?;
        writeln!(file, "/ comment line")?;
        writeln!(file, "ALBA,Blaj,7,Liceu,R,500,,x,12.0,-3,,5,5,5,5,5,5")?;

        let table = reader().read(file.path())?;
        assert_eq!(table.records.len(), 2);

        let first = &table.records[0];
        assert_eq!(first.county.as_deref(), Some("CLUJ"));
        assert_eq!(first.registered, Some(1000));
        assert_eq!(first.votes_cast, Some(400));
        assert!(first.has_station_type("U"));

        let second = &table.records[1];
        assert_eq!(second.votes_cast, None);
        assert_eq!(second.demographic(Gender::Male, AgeBand::From18To24), None);
        assert_eq!(second.demographic(Gender::Male, AgeBand::From25To34), Some(12));
        assert_eq!(second.demographic(Gender::Male, AgeBand::From35To44), None);
        assert_eq!(second.demographic(Gender::Male, AgeBand::From45To64), None);
        assert_eq!(second.demographic(Gender::Female, AgeBand::Over65), Some(5));
        Ok(())
    }

    #[test]
    fn test_cluster_votes_read_leniently() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "Judet,LT,LP")?;
        writeln!(file, "CLUJ,400,350")?;
        writeln!(file, "ALBA,300,n/a")?;

        let table = reader().read(file.path())?;
        assert_eq!(table.records[0].votes_cast, Some(400));
        assert_eq!(table.records[0].cluster_votes, Some(350));
        assert_eq!(table.records[1].cluster_votes, None);
        Ok(())
    }

    #[test]
    fn test_missing_file_is_missing_input() {
        let err = reader().read(Path::new("/nonexistent/presence_now.csv")).unwrap_err();
        assert!(matches!(err, ProcessingError::MissingInput(_)));
    }

    #[test]
    fn test_empty_file_is_missing_input() -> Result<()> {
        let file = NamedTempFile::new()?;
        let err = reader().read(file.path()).unwrap_err();
        assert!(matches!(err, ProcessingError::MissingInput(_)));
        Ok(())
    }

    #[test]
    fn test_non_numeric_votes_fail_the_table() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "{}", HEADER)?;
        writeln!(file, "CLUJ,Cluj-Napoca,1,Scoala 1,U,1000,many,1,1,1,1,1,1,1,1,1,1")?;

        let err = reader().read(file.path()).unwrap_err();
        assert!(matches!(err, ProcessingError::InvalidFormat(_)));
        assert!(err.to_string().contains("LT"));
        Ok(())
    }

    #[test]
    fn test_bom_and_legacy_encoding() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        file.write_all(UTF8_BOM)?;
        writeln!(file, "Judet,LT")?;
        writeln!(file, "IASI,10")?;
        let table = reader().read(file.path())?;
        assert!(table.schema.has("Judet"));

        let mut legacy = NamedTempFile::new()?;
        // "Timiş" in Windows-1250: ş is 0xBA
        legacy.write_all(b"Judet,LT\nTimi\xBA,10\n")?;
        let table = reader().read(legacy.path())?;
        assert_eq!(table.records[0].county.as_deref(), Some("Timiș"));
        Ok(())
    }

    #[test]
    fn test_require_lists_all_missing_columns() {
        let schema = PresenceSchema::new(vec!["Judet".to_string()]);
        let err = schema
            .require("presence.csv", &["Judet".to_string(), "LT".to_string(), "Mediu".to_string()])
            .unwrap_err();

        match err {
            ProcessingError::SchemaViolation { missing, .. } => {
                assert_eq!(missing, vec!["LT".to_string(), "Mediu".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("42"), Some(42));
        assert_eq!(parse_count("42.0"), Some(42));
        assert_eq!(parse_count("4.5"), None);
        assert_eq!(parse_count("-1"), None);
        assert_eq!(parse_count("NaN"), None);
        assert_eq!(parse_count(""), None);
    }
}
