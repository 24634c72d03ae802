use crate::utils::constants::{AGE_BAND_COUNT, FEATURE_COUNT};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub const ALL: [Gender; 2] = [Gender::Male, Gender::Female];

    pub fn key(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgeBand {
    From18To24,
    From25To34,
    From35To44,
    From45To64,
    Over65,
}

impl AgeBand {
    pub const ALL: [AgeBand; AGE_BAND_COUNT] = [
        AgeBand::From18To24,
        AgeBand::From25To34,
        AgeBand::From35To44,
        AgeBand::From45To64,
        AgeBand::Over65,
    ];

    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Suffix used by the presence table headers (`Barbati 18-24`)
    pub fn source_label(&self) -> &'static str {
        match self {
            AgeBand::From18To24 => "18-24",
            AgeBand::From25To34 => "25-34",
            AgeBand::From35To44 => "35-44",
            AgeBand::From45To64 => "45-64",
            AgeBand::Over65 => "65+",
        }
    }

    /// Key used by the aggregate table and reports (`age_18_24`)
    pub fn key(&self) -> &'static str {
        match self {
            AgeBand::From18To24 => "18_24",
            AgeBand::From25To34 => "25_34",
            AgeBand::From35To44 => "35_44",
            AgeBand::From45To64 => "45_64",
            AgeBand::Over65 => "65_plus",
        }
    }
}

/// The ten gender × age-band features, male bands first.
pub const FEATURES: [(Gender, AgeBand); FEATURE_COUNT] = [
    (Gender::Male, AgeBand::From18To24),
    (Gender::Male, AgeBand::From25To34),
    (Gender::Male, AgeBand::From35To44),
    (Gender::Male, AgeBand::From45To64),
    (Gender::Male, AgeBand::Over65),
    (Gender::Female, AgeBand::From18To24),
    (Gender::Female, AgeBand::From25To34),
    (Gender::Female, AgeBand::From35To44),
    (Gender::Female, AgeBand::From45To64),
    (Gender::Female, AgeBand::Over65),
];

/// Position of a gender × age-band pair in [`FEATURES`]
pub fn feature_index(gender: Gender, band: AgeBand) -> usize {
    let offset = match gender {
        Gender::Male => 0,
        Gender::Female => AGE_BAND_COUNT,
    };
    offset + band.index()
}

/// Output key of a feature, e.g. `male_18_24`
pub fn feature_key(index: usize) -> String {
    let (gender, band) = FEATURES[index];
    format!("{}_{}", gender.key(), band.key())
}

/// One row of the per-polling-station presence table.
///
/// Text fields are kept raw; the county name is normalized downstream.
/// Counts are `None` when the cell was empty or not a usable number.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawStationRecord {
    pub county: Option<String>,
    pub town: Option<String>,
    pub station_id: Option<String>,
    pub station_name: Option<String>,
    pub station_type: Option<String>,
    pub registered: Option<u64>,
    pub votes_cast: Option<u64>,
    /// Votes counted by the clustering features (permanent-list votes)
    pub cluster_votes: Option<u64>,
    pub demographics: [Option<u64>; FEATURE_COUNT],
}

impl RawStationRecord {
    pub fn new(county: &str, registered: u64, votes_cast: u64) -> Self {
        Self {
            county: Some(county.to_string()),
            registered: Some(registered),
            votes_cast: Some(votes_cast),
            cluster_votes: Some(votes_cast),
            ..Default::default()
        }
    }

    pub fn with_station(mut self, station_id: &str, station_type: &str) -> Self {
        self.station_id = Some(station_id.to_string());
        self.station_type = Some(station_type.to_string());
        self
    }

    pub fn with_cluster_votes(mut self, votes: u64) -> Self {
        self.cluster_votes = Some(votes);
        self
    }

    pub fn with_location(mut self, town: &str, station_name: &str) -> Self {
        self.town = Some(town.to_string());
        self.station_name = Some(station_name.to_string());
        self
    }

    pub fn with_demographics(mut self, counts: [u64; FEATURE_COUNT]) -> Self {
        self.demographics = counts.map(Some);
        self
    }

    pub fn demographic(&self, gender: Gender, band: AgeBand) -> Option<u64> {
        self.demographics[feature_index(gender, band)]
    }

    /// Station-type tag compared case-insensitively against a marker
    pub fn has_station_type(&self, marker: &str) -> bool {
        self.station_type
            .as_deref()
            .is_some_and(|t| t.trim().eq_ignore_ascii_case(marker))
    }
}
