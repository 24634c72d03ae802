use crate::models::{feature_key, RawStationRecord};
use crate::processors::county_names::normalize_county_name;
use crate::utils::constants::{FEATURE_COUNT, UNKNOWN_COUNTY};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Granularity of clustering units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ClusterLevel {
    County,
    Town,
    Polling,
}

impl ClusterLevel {
    /// Grouping key of a record at this level, `None` when a key column is
    /// empty for the row.
    pub fn group_key(&self, record: &RawStationRecord) -> Option<GroupKey> {
        let county = normalize_county_name(record.county.as_deref());
        if county == UNKNOWN_COUNTY {
            return None;
        }

        let present = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let key = match self {
            ClusterLevel::County => GroupKey {
                county,
                town: None,
                polling_station: None,
            },
            ClusterLevel::Town => GroupKey {
                county,
                town: Some(present(&record.town)?),
                polling_station: None,
            },
            ClusterLevel::Polling => GroupKey {
                county,
                town: Some(present(&record.town)?),
                polling_station: Some(present(&record.station_name)?),
            },
        };
        Some(key)
    }
}

impl std::fmt::Display for ClusterLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClusterLevel::County => write!(f, "county"),
            ClusterLevel::Town => write!(f, "town"),
            ClusterLevel::Polling => write!(f, "polling"),
        }
    }
}

/// Identifying columns of a clustering unit; absent parts are not emitted
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct GroupKey {
    pub county: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub town: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub polling_station: Option<String>,
}

fn serialize_features<S, T>(
    values: &[T; FEATURE_COUNT],
    suffix: &str,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
    T: Serialize,
{
    let mut map = serializer.serialize_map(Some(FEATURE_COUNT))?;
    for (i, value) in values.iter().enumerate() {
        map.serialize_entry(&format!("{}{}", feature_key(i), suffix), value)?;
    }
    map.end()
}

/// Raw gender × age-band counts of a unit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeatureCounts(pub [u64; FEATURE_COUNT]);

impl Serialize for FeatureCounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serialize_features(&self.0, "", serializer)
    }
}

/// Gender × age-band shares of votes cast, in [0, 100]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FeaturePercentages(pub [f64; FEATURE_COUNT]);

impl Serialize for FeaturePercentages {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serialize_features(&self.0, "", serializer)
    }
}

/// Cluster centroid in original percentage units
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CentroidProfile(pub [f64; FEATURE_COUNT]);

impl Serialize for CentroidProfile {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serialize_features(&self.0, "_pct", serializer)
    }
}

/// One clustered unit
#[derive(Debug, Clone, Serialize)]
pub struct ClusterUnit<K> {
    #[serde(flatten)]
    pub key: K,
    pub total_registered: u64,
    pub total_votes: u64,
    pub cluster: usize,
    pub pca_x: f64,
    pub pca_y: f64,
    pub demographics: FeatureCounts,
    pub demographics_pct: FeaturePercentages,
}

/// Level-agnostic clustering output
#[derive(Debug, Clone, Serialize)]
pub struct ClusteringResult<K> {
    pub requested_clusters: usize,
    pub n_clusters: usize,
    pub explained_variance_ratio: [f64; 2],
    pub cluster_centers: BTreeMap<usize, CentroidProfile>,
    pub clustered_data: Vec<ClusterUnit<K>>,
    pub warnings: Vec<String>,
}

/// Clustering output tagged with the level that produced it
#[derive(Debug, Clone, Serialize)]
pub struct LevelClustering {
    pub cluster_level: ClusterLevel,
    #[serde(flatten)]
    pub result: ClusteringResult<GroupKey>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_names_match_serialized_form() {
        for level in [ClusterLevel::County, ClusterLevel::Town, ClusterLevel::Polling] {
            let json = serde_json::to_value(level).unwrap();
            assert_eq!(json, serde_json::Value::String(level.to_string()));
        }
    }

    #[test]
    fn test_group_keys_per_level() {
        let record = RawStationRecord::new("BUCURESTI", 100, 50)
            .with_location("Sector 1", "Scoala 5");

        let county = ClusterLevel::County.group_key(&record).unwrap();
        assert_eq!(county.county, "Bucharest");
        assert_eq!(county.town, None);

        let polling = ClusterLevel::Polling.group_key(&record).unwrap();
        assert_eq!(polling.town.as_deref(), Some("Sector 1"));
        assert_eq!(polling.polling_station.as_deref(), Some("Scoala 5"));
    }

    #[test]
    fn test_rows_with_missing_key_parts_have_no_group() {
        let no_town = RawStationRecord::new("Cluj", 100, 50);
        assert!(ClusterLevel::County.group_key(&no_town).is_some());
        assert!(ClusterLevel::Town.group_key(&no_town).is_none());

        let no_county = RawStationRecord::default();
        assert!(ClusterLevel::County.group_key(&no_county).is_none());
    }

    #[test]
    fn test_centroid_keys_carry_pct_suffix() {
        let json = serde_json::to_value(CentroidProfile([1.0; FEATURE_COUNT])).unwrap();
        assert!(json.get("male_18_24_pct").is_some());
        assert!(json.get("female_65_plus_pct").is_some());

        let json = serde_json::to_value(FeaturePercentages([1.0; FEATURE_COUNT])).unwrap();
        assert!(json.get("male_18_24").is_some());
    }

    #[test]
    fn test_county_key_omits_town_fields() {
        let key = GroupKey {
            county: "Cluj".to_string(),
            town: None,
            polling_station: None,
        };
        let json = serde_json::to_value(&key).unwrap();
        assert_eq!(json.as_object().unwrap().len(), 1);
    }
}
