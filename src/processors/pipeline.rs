use crate::config::Settings;
use crate::error::{ProcessingError, Result};
use crate::models::{CandidateResults, CountyAggregate, DataSource, DemographicReport};
use crate::processors::aggregator::Aggregator;
use crate::processors::percentages::PercentageCalculator;
use crate::processors::simulator;
use crate::readers::{first_timestamp, read_attendance, read_results, PresenceReader};
use crate::utils::constants::NOT_AVAILABLE;
use crate::utils::{current_timestamp, processed_copy_filename};
use crate::writers::CsvWriter;
use chrono::Local;
use rand::Rng;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Result of one aggregation run
#[derive(Debug, Clone)]
pub struct AggregationOutcome {
    pub aggregates: Vec<CountyAggregate>,
    pub data_source: DataSource,
    /// Why the presence data was not used, when it was not
    pub fallback_reason: Option<String>,
    pub archived_copy: Option<PathBuf>,
    pub output: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TableUpdate {
    Updated,
    Regenerated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UpdateSummary {
    pub attendance: TableUpdate,
    pub results: TableUpdate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LastUpdates {
    pub attendance_last_update: String,
    pub results_last_update: String,
}

/// Produces and maintains the attendance and results tables under the
/// data directory.
pub struct AttendancePipeline {
    settings: Settings,
    direct_urban_rural: bool,
    writer: CsvWriter,
}

impl AttendancePipeline {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            direct_urban_rural: false,
            writer: CsvWriter::new(),
        }
    }

    pub fn with_direct_urban_rural(mut self, direct: bool) -> Self {
        self.direct_urban_rural = direct;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Read and aggregate a presence file. Never falls back.
    pub fn aggregate_presence(&self, source: &Path, timestamp: &str) -> Result<Vec<CountyAggregate>> {
        let table = PresenceReader::new(self.settings.columns.clone()).read(source)?;
        Aggregator::new(self.settings.columns.clone())
            .with_direct_urban_rural(self.direct_urban_rural)
            .aggregate(&table, timestamp)
    }

    /// Aggregate a presence file into the attendance table.
    ///
    /// Data-shaped failures are answered with synthetic aggregates, labeled
    /// as such; configuration errors still propagate.
    pub fn process_presence<R: Rng>(
        &self,
        source: Option<&Path>,
        rng: &mut R,
    ) -> Result<AggregationOutcome> {
        let source = source
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.settings.presence_path());
        let timestamp = current_timestamp();
        let output = self.settings.attendance_path();

        let (aggregates, fallback_reason) = match self.aggregate_presence(&source, &timestamp) {
            Ok(aggregates) => (aggregates, None),
            Err(e) if e.is_fallback_eligible() => {
                warn!(
                    source = %source.display(),
                    error = %e,
                    "Presence data unusable, falling back to synthetic attendance"
                );
                (simulator::generate_attendance(rng, &timestamp), Some(e.to_string()))
            }
            Err(e) => return Err(e),
        };

        self.writer.write_attendance(&aggregates, &output)?;

        let archived_copy = if fallback_reason.is_none() {
            self.archive_source(&source)
        } else {
            None
        };

        let data_source = if fallback_reason.is_some() {
            DataSource::Synthetic
        } else {
            DataSource::Presence
        };
        info!(
            source = %data_source,
            counties = aggregates.len(),
            output = %output.display(),
            "Attendance table updated"
        );

        Ok(AggregationOutcome {
            aggregates,
            data_source,
            fallback_reason,
            archived_copy,
            output,
        })
    }

    /// Timestamped copy of a processed source; failures only warn.
    fn archive_source(&self, source: &Path) -> Option<PathBuf> {
        let name = processed_copy_filename(source, Local::now().naive_local())?;
        let target = self.settings.data_dir.join(name);

        match std::fs::copy(source, &target) {
            Ok(_) => {
                info!(target = %target.display(), "Archived presence file");
                Some(target)
            }
            Err(e) => {
                warn!(source = %source.display(), error = %e, "Could not archive presence file");
                None
            }
        }
    }

    pub fn generate_attendance<R: Rng>(&self, rng: &mut R) -> Result<Vec<CountyAggregate>> {
        let rows = simulator::generate_attendance(rng, &current_timestamp());
        self.writer.write_attendance(&rows, &self.settings.attendance_path())?;
        Ok(rows)
    }

    pub fn generate_results<R: Rng>(&self, rng: &mut R) -> Result<Vec<CandidateResults>> {
        let rows = simulator::generate_results(rng, &current_timestamp());
        self.writer.write_results(&rows, &self.settings.results_path())?;
        Ok(rows)
    }

    /// Replace both tables with fresh synthetic data
    pub fn generate_fresh<R: Rng>(&self, rng: &mut R) -> Result<()> {
        self.generate_attendance(rng)?;
        self.generate_results(rng)?;
        Ok(())
    }

    /// Nudge the stored tables forward in place. A table that is absent or
    /// unreadable is regenerated instead.
    pub fn update_existing<R: Rng>(&self, rng: &mut R) -> Result<UpdateSummary> {
        Ok(UpdateSummary {
            attendance: self.update_attendance(rng)?,
            results: self.update_results(rng)?,
        })
    }

    pub fn update_attendance<R: Rng>(&self, rng: &mut R) -> Result<TableUpdate> {
        let path = self.settings.attendance_path();
        match read_attendance(&path) {
            Ok(mut rows) => {
                simulator::update_attendance(&mut rows, rng, &current_timestamp());
                self.writer.write_attendance(&rows, &path)?;
                Ok(TableUpdate::Updated)
            }
            Err(e) => {
                warn!(error = %e, "Cannot update attendance table, generating fresh data");
                self.generate_attendance(rng)?;
                Ok(TableUpdate::Regenerated)
            }
        }
    }

    pub fn update_results<R: Rng>(&self, rng: &mut R) -> Result<TableUpdate> {
        let path = self.settings.results_path();
        match read_results(&path) {
            Ok(mut rows) => {
                simulator::update_results(&mut rows, rng, &current_timestamp());
                self.writer.write_results(&rows, &path)?;
                Ok(TableUpdate::Updated)
            }
            Err(e) => {
                warn!(error = %e, "Cannot update results table, generating fresh data");
                self.generate_results(rng)?;
                Ok(TableUpdate::Regenerated)
            }
        }
    }

    pub fn attendance(&self) -> Result<Vec<CountyAggregate>> {
        read_attendance(&self.settings.attendance_path())
    }

    pub fn results(&self) -> Result<Vec<CandidateResults>> {
        read_results(&self.settings.results_path())
    }

    /// Case-insensitive exact match on the county name
    pub fn county_attendance(&self, county: &str) -> Result<CountyAggregate> {
        self.attendance()?
            .into_iter()
            .find(|row| row.county.to_lowercase() == county.to_lowercase())
            .ok_or_else(|| ProcessingError::NotFound(format!("No data found for county: {}", county)))
    }

    pub fn county_results(&self, county: &str) -> Result<CandidateResults> {
        self.results()?
            .into_iter()
            .find(|row| row.county.to_lowercase() == county.to_lowercase())
            .ok_or_else(|| ProcessingError::NotFound(format!("No data found for county: {}", county)))
    }

    pub fn demographic_report(&self) -> Result<DemographicReport> {
        PercentageCalculator::build_report(&self.attendance()?)
    }

    pub fn last_updates(&self) -> LastUpdates {
        let stamp = |path: PathBuf| first_timestamp(&path).unwrap_or_else(|| NOT_AVAILABLE.to_string());
        LastUpdates {
            attendance_last_update: stamp(self.settings.attendance_path()),
            results_last_update: stamp(self.settings.results_path()),
        }
    }
}
