use crate::error::{ProcessingError, Result};
use crate::models::AgeBand;
use crate::utils::constants::AGE_BAND_COUNT;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Where an aggregate table came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    #[default]
    Presence,
    Synthetic,
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataSource::Presence => write!(f, "presence"),
            DataSource::Synthetic => write!(f, "synthetic"),
        }
    }
}

/// Votes and demographics of one station type (urban or rural)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaBreakdown {
    pub votes: u64,
    pub male: u64,
    pub female: u64,
    pub ages: [u64; AGE_BAND_COUNT],
}

impl AreaBreakdown {
    pub fn age(&self, band: AgeBand) -> u64 {
        self.ages[band.index()]
    }

    pub fn add(&mut self, other: &AreaBreakdown) -> Result<()> {
        self.votes = ProcessingError::add_counts(self.votes, other.votes, "area votes")?;
        self.male = ProcessingError::add_counts(self.male, other.male, "area male voters")?;
        self.female = ProcessingError::add_counts(self.female, other.female, "area female voters")?;
        for (total, value) in self.ages.iter_mut().zip(other.ages.iter()) {
            *total = ProcessingError::add_counts(*total, *value, "area age band")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrbanRuralSplit {
    pub urban: AreaBreakdown,
    pub rural: AreaBreakdown,
}

impl UrbanRuralSplit {
    pub fn add(&mut self, other: &UrbanRuralSplit) -> Result<()> {
        self.urban.add(&other.urban)?;
        self.rural.add(&other.rural)
    }
}

/// One row per canonical administrative unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct CountyAggregate {
    #[validate(length(min = 1))]
    pub county: String,

    pub total_voters: u64,
    pub votes_cast: u64,

    #[validate(range(min = 0.0, max = 100.0))]
    pub attendance_percentage: f64,

    pub male_voters: Option<u64>,
    pub female_voters: Option<u64>,
    pub age_groups: [Option<u64>; AGE_BAND_COUNT],

    pub urban_stations: Option<u64>,
    pub rural_stations: Option<u64>,

    /// Direct urban/rural sums; `None` means they must be estimated
    pub urban_rural: Option<UrbanRuralSplit>,

    pub timestamp: String,
    pub data_source: DataSource,
}

impl CountyAggregate {
    pub fn age_group(&self, band: AgeBand) -> Option<u64> {
        self.age_groups[band.index()]
    }
}

/// Flat CSV row of the attendance table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRow {
    pub county: String,
    pub total_voters: u64,
    pub votes_cast: u64,
    #[serde(default)]
    pub attendance_percentage: f64,
    #[serde(default)]
    pub male_voters: Option<u64>,
    #[serde(default)]
    pub female_voters: Option<u64>,
    #[serde(default)]
    pub age_18_24: Option<u64>,
    #[serde(default)]
    pub age_25_34: Option<u64>,
    #[serde(default)]
    pub age_35_44: Option<u64>,
    #[serde(default)]
    pub age_45_64: Option<u64>,
    #[serde(default)]
    pub age_65_plus: Option<u64>,
    #[serde(default)]
    pub urban_stations: Option<u64>,
    #[serde(default)]
    pub rural_stations: Option<u64>,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub data_source: DataSource,
    #[serde(default)]
    pub urban_votes: Option<u64>,
    #[serde(default)]
    pub rural_votes: Option<u64>,
    #[serde(default)]
    pub urban_male_voters: Option<u64>,
    #[serde(default)]
    pub urban_female_voters: Option<u64>,
    #[serde(default)]
    pub rural_male_voters: Option<u64>,
    #[serde(default)]
    pub rural_female_voters: Option<u64>,
    #[serde(default)]
    pub urban_age_18_24: Option<u64>,
    #[serde(default)]
    pub urban_age_25_34: Option<u64>,
    #[serde(default)]
    pub urban_age_35_44: Option<u64>,
    #[serde(default)]
    pub urban_age_45_64: Option<u64>,
    #[serde(default)]
    pub urban_age_65_plus: Option<u64>,
    #[serde(default)]
    pub rural_age_18_24: Option<u64>,
    #[serde(default)]
    pub rural_age_25_34: Option<u64>,
    #[serde(default)]
    pub rural_age_35_44: Option<u64>,
    #[serde(default)]
    pub rural_age_45_64: Option<u64>,
    #[serde(default)]
    pub rural_age_65_plus: Option<u64>,
}

impl From<&CountyAggregate> for AttendanceRow {
    fn from(aggregate: &CountyAggregate) -> Self {
        let [age_18_24, age_25_34, age_35_44, age_45_64, age_65_plus] = aggregate.age_groups;
        let mut row = AttendanceRow {
            county: aggregate.county.clone(),
            total_voters: aggregate.total_voters,
            votes_cast: aggregate.votes_cast,
            attendance_percentage: aggregate.attendance_percentage,
            male_voters: aggregate.male_voters,
            female_voters: aggregate.female_voters,
            age_18_24,
            age_25_34,
            age_35_44,
            age_45_64,
            age_65_plus,
            urban_stations: aggregate.urban_stations,
            rural_stations: aggregate.rural_stations,
            timestamp: aggregate.timestamp.clone(),
            data_source: aggregate.data_source,
            ..Default::default()
        };

        if let Some(split) = &aggregate.urban_rural {
            let (u, r) = (&split.urban, &split.rural);
            row.urban_votes = Some(u.votes);
            row.rural_votes = Some(r.votes);
            row.urban_male_voters = Some(u.male);
            row.urban_female_voters = Some(u.female);
            row.rural_male_voters = Some(r.male);
            row.rural_female_voters = Some(r.female);
            [
                row.urban_age_18_24,
                row.urban_age_25_34,
                row.urban_age_35_44,
                row.urban_age_45_64,
                row.urban_age_65_plus,
            ] = u.ages.map(Some);
            [
                row.rural_age_18_24,
                row.rural_age_25_34,
                row.rural_age_35_44,
                row.rural_age_45_64,
                row.rural_age_65_plus,
            ] = r.ages.map(Some);
        }

        row
    }
}

impl AttendanceRow {
    /// Direct urban/rural split, present only when every column is filled
    fn urban_rural(&self) -> Option<UrbanRuralSplit> {
        let urban = AreaBreakdown {
            votes: self.urban_votes?,
            male: self.urban_male_voters?,
            female: self.urban_female_voters?,
            ages: [
                self.urban_age_18_24?,
                self.urban_age_25_34?,
                self.urban_age_35_44?,
                self.urban_age_45_64?,
                self.urban_age_65_plus?,
            ],
        };
        let rural = AreaBreakdown {
            votes: self.rural_votes?,
            male: self.rural_male_voters?,
            female: self.rural_female_voters?,
            ages: [
                self.rural_age_18_24?,
                self.rural_age_25_34?,
                self.rural_age_35_44?,
                self.rural_age_45_64?,
                self.rural_age_65_plus?,
            ],
        };
        Some(UrbanRuralSplit { urban, rural })
    }
}

impl TryFrom<AttendanceRow> for CountyAggregate {
    type Error = ProcessingError;

    fn try_from(row: AttendanceRow) -> Result<Self> {
        let urban_rural = row.urban_rural();
        let aggregate = CountyAggregate {
            county: row.county,
            total_voters: row.total_voters,
            votes_cast: row.votes_cast,
            attendance_percentage: row.attendance_percentage,
            male_voters: row.male_voters,
            female_voters: row.female_voters,
            age_groups: [
                row.age_18_24,
                row.age_25_34,
                row.age_35_44,
                row.age_45_64,
                row.age_65_plus,
            ],
            urban_stations: row.urban_stations,
            rural_stations: row.rural_stations,
            urban_rural,
            timestamp: row.timestamp,
            data_source: row.data_source,
        };
        aggregate.validate()?;
        Ok(aggregate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CountyAggregate {
        CountyAggregate {
            county: "Cluj".to_string(),
            total_voters: 1000,
            votes_cast: 400,
            attendance_percentage: 40.0,
            male_voters: Some(190),
            female_voters: Some(210),
            age_groups: [Some(40), Some(80), Some(90), Some(120), Some(70)],
            urban_stations: Some(3),
            rural_stations: Some(1),
            urban_rural: None,
            timestamp: "2024-12-02 07:00:00".to_string(),
            data_source: DataSource::Presence,
        }
    }

    #[test]
    fn test_row_without_split_stays_unsplit() {
        let aggregate = sample();
        let row = AttendanceRow::from(&aggregate);
        assert_eq!(row.age_45_64, Some(120));
        assert_eq!(row.urban_votes, None);

        let back = CountyAggregate::try_from(row).unwrap();
        assert_eq!(back, aggregate);
    }

    #[test]
    fn test_partial_split_columns_are_ignored() {
        let mut row = AttendanceRow::from(&sample());
        row.urban_votes = Some(300);
        row.rural_votes = Some(100);

        let back = CountyAggregate::try_from(row).unwrap();
        assert!(back.urban_rural.is_none());
    }

    #[test]
    fn test_out_of_range_attendance_rejected() {
        let mut row = AttendanceRow::from(&sample());
        row.attendance_percentage = 140.0;
        assert!(CountyAggregate::try_from(row).is_err());
    }
}
