use crate::config::ColumnMapping;
use crate::error::{ProcessingError, Result};
use crate::models::{
    feature_index, AgeBand, AreaBreakdown, CountyAggregate, DataSource, Gender, RawStationRecord,
    UrbanRuralSplit,
};
use crate::processors::county_names::{is_canonical, normalize_county_name};
use crate::readers::PresenceTable;
use crate::utils::constants::{AGE_BAND_COUNT, FEATURE_COUNT, UNKNOWN_COUNTY};
use crate::utils::{percentage, round_to};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info, warn};

/// Rolls per-station rows up into one aggregate per canonical county.
///
/// Any failure aborts the whole table; the caller decides whether to fall
/// back to synthetic data.
pub struct Aggregator {
    columns: ColumnMapping,
    direct_urban_rural: bool,
}

impl Aggregator {
    pub fn new(columns: ColumnMapping) -> Self {
        Self {
            columns,
            direct_urban_rural: false,
        }
    }

    /// Sum urban and rural votes and demographics straight from the
    /// station-type tag instead of leaving them to estimation.
    pub fn with_direct_urban_rural(mut self, direct: bool) -> Self {
        self.direct_urban_rural = direct;
        self
    }

    pub fn aggregate(&self, table: &PresenceTable, timestamp: &str) -> Result<Vec<CountyAggregate>> {
        table.require(&self.columns.aggregation_columns())?;

        let has_stations =
            table.schema.has(&self.columns.station_id) && table.schema.has(&self.columns.station_type);
        let direct = self.direct_urban_rural && table.schema.has(&self.columns.station_type);
        if self.direct_urban_rural && !direct {
            warn!(
                column = %self.columns.station_type,
                "Station type column absent, urban/rural splits will be estimated"
            );
        }

        let mut groups: BTreeMap<String, CountyAccumulator> = BTreeMap::new();
        for record in &table.records {
            let county = normalize_county_name(record.county.as_deref());
            groups
                .entry(county)
                .or_default()
                .add(record, &self.columns)?;
        }

        let mut aggregates = Vec::with_capacity(groups.len());
        for (county, group) in groups {
            if county == UNKNOWN_COUNTY {
                warn!(rows = group.rows, "Skipping rows without a county name");
                continue;
            }
            if !is_canonical(&county) {
                warn!(county = %county, rows = group.rows, "County name not in the canonical list");
            }

            aggregates.push(group.finish(county, timestamp, has_stations, direct)?);
        }

        if aggregates.is_empty() {
            return Err(ProcessingError::DegenerateInput(format!(
                "{} produced no valid county groups",
                table.source_name()
            )));
        }

        info!(
            source = %table.source_name(),
            rows = table.records.len(),
            counties = aggregates.len(),
            "Aggregated presence data"
        );
        Ok(aggregates)
    }
}

/// Sums that stay `None` until at least one numeric value was seen
fn merge_optional(values: impl IntoIterator<Item = Option<u64>>, what: &str) -> Result<Option<u64>> {
    values.into_iter().try_fold(None, |acc, value| match (acc, value) {
        (Some(a), Some(v)) => ProcessingError::add_counts(a, v, what).map(Some),
        (None, v) => Ok(v),
        (a, None) => Ok(a),
    })
}

#[derive(Default)]
struct CountyAccumulator {
    rows: usize,
    total_voters: u64,
    votes_cast: u64,
    demographics: [Option<u64>; FEATURE_COUNT],
    urban_ids: HashSet<String>,
    rural_ids: HashSet<String>,
    split: UrbanRuralSplit,
}

impl CountyAccumulator {
    fn add(&mut self, record: &RawStationRecord, columns: &ColumnMapping) -> Result<()> {
        self.rows += 1;
        self.total_voters = ProcessingError::add_counts(
            self.total_voters,
            record.registered.unwrap_or(0),
            "registered voters",
        )?;
        self.votes_cast =
            ProcessingError::add_counts(self.votes_cast, record.votes_cast.unwrap_or(0), "votes cast")?;

        for (total, value) in self.demographics.iter_mut().zip(record.demographics.iter()) {
            if let Some(v) = value {
                *total = Some(ProcessingError::add_counts(total.unwrap_or(0), *v, "demographic count")?);
            }
        }

        let area = if record.has_station_type(&columns.urban_marker) {
            if let Some(id) = &record.station_id {
                self.urban_ids.insert(id.clone());
            }
            Some(&mut self.split.urban)
        } else if record.has_station_type(&columns.rural_marker) {
            if let Some(id) = &record.station_id {
                self.rural_ids.insert(id.clone());
            }
            Some(&mut self.split.rural)
        } else {
            None
        };

        if let Some(area) = area {
            area.add(&station_breakdown(record)?)?;
        }
        Ok(())
    }

    fn finish(
        self,
        county: String,
        timestamp: &str,
        has_stations: bool,
        direct: bool,
    ) -> Result<CountyAggregate> {
        let gender_total = |gender: Gender| {
            merge_optional(
                AgeBand::ALL.iter().map(|&band| self.demographics[feature_index(gender, band)]),
                "gender total",
            )
        };
        let mut age_groups = [None; AGE_BAND_COUNT];
        for (slot, band) in age_groups.iter_mut().zip(AgeBand::ALL) {
            *slot = merge_optional(
                Gender::ALL.iter().map(|&gender| self.demographics[feature_index(gender, band)]),
                "age band total",
            )?;
        }

        let attendance = percentage(self.votes_cast, self.total_voters).unwrap_or(0.0);
        if attendance > 100.0 {
            debug!(county = %county, attendance, "Votes cast exceed registered voters, capping attendance");
        }

        let (urban_stations, rural_stations) = if has_stations {
            (Some(self.urban_ids.len() as u64), Some(self.rural_ids.len() as u64))
        } else {
            (None, None)
        };

        Ok(CountyAggregate {
            total_voters: self.total_voters,
            votes_cast: self.votes_cast,
            attendance_percentage: round_to(attendance.min(100.0), 2),
            male_voters: gender_total(Gender::Male)?,
            female_voters: gender_total(Gender::Female)?,
            age_groups,
            urban_stations,
            rural_stations,
            urban_rural: direct.then_some(self.split),
            timestamp: timestamp.to_string(),
            data_source: DataSource::Presence,
            county,
        })
    }
}

/// Votes and demographics of a single station
fn station_breakdown(record: &RawStationRecord) -> Result<AreaBreakdown> {
    let count = |gender: Gender, band: AgeBand| record.demographic(gender, band).unwrap_or(0);
    let gender_sum = |gender: Gender| {
        AgeBand::ALL.iter().try_fold(0u64, |total, &band| {
            ProcessingError::add_counts(total, count(gender, band), "station gender total")
        })
    };

    let mut ages = [0u64; AGE_BAND_COUNT];
    for (slot, band) in ages.iter_mut().zip(AgeBand::ALL) {
        *slot = ProcessingError::add_counts(
            count(Gender::Male, band),
            count(Gender::Female, band),
            "station age band",
        )?;
    }

    Ok(AreaBreakdown {
        votes: record.votes_cast.unwrap_or(0),
        male: gender_sum(Gender::Male)?,
        female: gender_sum(Gender::Female)?,
        ages,
    })
}
