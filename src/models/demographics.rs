use crate::error::ProcessingError;
use crate::models::{AgeBand, CountyAggregate, DataSource, UrbanRuralSplit};
use crate::utils::constants::AGE_BAND_COUNT;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

/// Absolute counts at national or county granularity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DemographicTotals {
    pub total_votes: u64,
    pub male_voters: u64,
    pub female_voters: u64,
    pub ages: [u64; AGE_BAND_COUNT],
    pub urban_stations: u64,
    pub rural_stations: u64,
    pub urban_rural: Option<UrbanRuralSplit>,
}

impl DemographicTotals {
    /// Counts of one county; missing values count as zero.
    pub fn from_aggregate(aggregate: &CountyAggregate, split: Option<UrbanRuralSplit>) -> Self {
        Self {
            total_votes: aggregate.votes_cast,
            male_voters: aggregate.male_voters.unwrap_or(0),
            female_voters: aggregate.female_voters.unwrap_or(0),
            ages: aggregate.age_groups.map(|v| v.unwrap_or(0)),
            urban_stations: aggregate.urban_stations.unwrap_or(0),
            rural_stations: aggregate.rural_stations.unwrap_or(0),
            urban_rural: split,
        }
    }

    pub fn age(&self, band: AgeBand) -> u64 {
        self.ages[band.index()]
    }

    /// Sum of unit counts. The urban/rural split survives only when every
    /// unit carries one.
    pub fn sum<'a>(
        units: impl IntoIterator<Item = &'a DemographicTotals>,
    ) -> crate::error::Result<Self> {
        let add = ProcessingError::add_counts;
        let mut total = DemographicTotals::default();
        let mut split = Some(UrbanRuralSplit::default());

        for unit in units {
            total.total_votes = add(total.total_votes, unit.total_votes, "national votes")?;
            total.male_voters = add(total.male_voters, unit.male_voters, "national male voters")?;
            total.female_voters = add(total.female_voters, unit.female_voters, "national female voters")?;
            for (sum, value) in total.ages.iter_mut().zip(unit.ages.iter()) {
                *sum = add(*sum, *value, "national age band")?;
            }
            total.urban_stations = add(total.urban_stations, unit.urban_stations, "urban stations")?;
            total.rural_stations = add(total.rural_stations, unit.rural_stations, "rural stations")?;

            split = match (split, unit.urban_rural) {
                (Some(mut acc), Some(theirs)) => {
                    acc.add(&theirs)?;
                    Some(acc)
                }
                _ => None,
            };
        }

        total.urban_rural = split;
        Ok(total)
    }
}

impl Serialize for DemographicTotals {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("total_votes", &self.total_votes)?;
        map.serialize_entry("male_voters", &self.male_voters)?;
        map.serialize_entry("female_voters", &self.female_voters)?;
        for band in AgeBand::ALL {
            map.serialize_entry(&format!("age_{}", band.key()), &self.age(band))?;
        }
        map.serialize_entry("urban_stations", &self.urban_stations)?;
        map.serialize_entry("rural_stations", &self.rural_stations)?;

        if let Some(split) = &self.urban_rural {
            for (scope, area) in [("urban", &split.urban), ("rural", &split.rural)] {
                map.serialize_entry(&format!("{}_votes", scope), &area.votes)?;
                map.serialize_entry(&format!("{}_male_voters", scope), &area.male)?;
                map.serialize_entry(&format!("{}_female_voters", scope), &area.female)?;
                for band in AgeBand::ALL {
                    map.serialize_entry(&format!("{}_age_{}", scope, band.key()), &area.age(band))?;
                }
            }
        }
        map.end()
    }
}

/// Percentages inside the urban or the rural scope
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScopedPercentages {
    pub male: f64,
    pub female: f64,
    pub ages: [f64; AGE_BAND_COUNT],
}

/// Derived percentage fields. A `None` is serialized as an absent key,
/// never as zero or null.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DemographicPercentages {
    pub male: Option<f64>,
    pub female: Option<f64>,
    pub ages: [Option<f64>; AGE_BAND_COUNT],
    pub urban: Option<f64>,
    pub rural: Option<f64>,
    pub within_urban: Option<ScopedPercentages>,
    pub within_rural: Option<ScopedPercentages>,
}

impl DemographicPercentages {
    pub fn is_empty(&self) -> bool {
        *self == DemographicPercentages::default()
    }
}

impl Serialize for DemographicPercentages {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        if let Some(v) = self.male {
            map.serialize_entry("male_percentage", &v)?;
        }
        if let Some(v) = self.female {
            map.serialize_entry("female_percentage", &v)?;
        }
        for band in AgeBand::ALL {
            if let Some(v) = self.ages[band.index()] {
                map.serialize_entry(&format!("age_{}_percentage", band.key()), &v)?;
            }
        }
        if let Some(v) = self.urban {
            map.serialize_entry("urban_percentage", &v)?;
        }
        if let Some(v) = self.rural {
            map.serialize_entry("rural_percentage", &v)?;
        }
        for (scope, scoped) in [("urban", &self.within_urban), ("rural", &self.within_rural)] {
            if let Some(p) = scoped {
                map.serialize_entry(&format!("{}_male_percentage", scope), &p.male)?;
                map.serialize_entry(&format!("{}_female_percentage", scope), &p.female)?;
                for band in AgeBand::ALL {
                    map.serialize_entry(
                        &format!("{}_age_{}_percentage", scope, band.key()),
                        &p.ages[band.index()],
                    )?;
                }
            }
        }
        map.end()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DemographicBreakdown {
    #[serde(flatten)]
    pub totals: DemographicTotals,
    #[serde(flatten)]
    pub percentages: DemographicPercentages,
}

#[derive(Debug, Clone, Serialize)]
pub struct CountyDemographics {
    pub county: String,
    #[serde(flatten)]
    pub breakdown: DemographicBreakdown,
}

/// National and per-county demographic view of an aggregate table
#[derive(Debug, Clone, Serialize)]
pub struct DemographicReport {
    pub national: DemographicBreakdown,
    pub counties: Vec<CountyDemographics>,
    pub last_update: String,
    pub has_urban_rural_data: bool,
    pub urban_rural_estimated: bool,
    pub data_source: DataSource,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_percentages_are_not_serialized() {
        let percentages = DemographicPercentages {
            male: Some(50.0),
            ..Default::default()
        };
        let json = serde_json::to_value(percentages).unwrap();
        let object = json.as_object().unwrap();

        assert_eq!(object.len(), 1);
        assert_eq!(object["male_percentage"], 50.0);
        assert!(!object.contains_key("female_percentage"));
        assert!(DemographicPercentages::default().is_empty());
    }

    #[test]
    fn test_sum_drops_split_when_one_unit_lacks_it() -> crate::error::Result<()> {
        let with_split = DemographicTotals {
            total_votes: 10,
            urban_rural: Some(UrbanRuralSplit::default()),
            ..Default::default()
        };
        let without_split = DemographicTotals {
            total_votes: 5,
            ..Default::default()
        };

        let both = DemographicTotals::sum([&with_split, &with_split])?;
        assert!(both.urban_rural.is_some());
        assert_eq!(both.total_votes, 20);

        let mixed = DemographicTotals::sum([&with_split, &without_split])?;
        assert!(mixed.urban_rural.is_none());
        assert_eq!(mixed.total_votes, 15);
        Ok(())
    }

    #[test]
    fn test_sum_overflow_is_computation_failure() {
        let huge = DemographicTotals {
            total_votes: u64::MAX,
            ..Default::default()
        };
        let one = DemographicTotals {
            total_votes: 1,
            ..Default::default()
        };

        let err = DemographicTotals::sum([&huge, &one]).unwrap_err();
        assert!(matches!(err, ProcessingError::ComputationFailure(_)));
    }
}
