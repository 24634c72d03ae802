use crate::models::{AgeBand, AreaBreakdown, CountyAggregate, UrbanRuralSplit};
use crate::utils::round_count;
use tracing::debug;

/// Proportional urban/rural estimates for aggregates without direct splits.
pub struct DemographicEstimator;

impl DemographicEstimator {
    /// Votes follow the station-count ratio; every demographic count follows
    /// the resulting vote share. Each figure is rounded independently, so
    /// the two halves may miss the total by a rounding unit.
    pub fn estimate(aggregate: &CountyAggregate) -> UrbanRuralSplit {
        let urban_stations = aggregate.urban_stations.unwrap_or(0);
        let rural_stations = aggregate.rural_stations.unwrap_or(0);
        let stations = urban_stations + rural_stations;
        let votes = aggregate.votes_cast;

        let share_of_votes = |count: u64| {
            if stations == 0 {
                0
            } else {
                round_count(votes as f64 * count as f64 / stations as f64)
            }
        };
        let urban_votes = share_of_votes(urban_stations);
        let rural_votes = share_of_votes(rural_stations);

        UrbanRuralSplit {
            urban: Self::area(aggregate, urban_votes),
            rural: Self::area(aggregate, rural_votes),
        }
    }

    fn area(aggregate: &CountyAggregate, area_votes: u64) -> AreaBreakdown {
        let scale = |total: Option<u64>| {
            if aggregate.votes_cast == 0 {
                0
            } else {
                round_count(total.unwrap_or(0) as f64 * area_votes as f64 / aggregate.votes_cast as f64)
            }
        };

        AreaBreakdown {
            votes: area_votes,
            male: scale(aggregate.male_voters),
            female: scale(aggregate.female_voters),
            ages: AgeBand::ALL.map(|band| scale(aggregate.age_group(band))),
        }
    }

    /// Splits for a whole table. Direct splits are used only when every row
    /// carries one; otherwise the entire table is estimated. The flag tells
    /// whether estimation happened.
    pub fn resolve(aggregates: &[CountyAggregate]) -> (Vec<UrbanRuralSplit>, bool) {
        let direct: Option<Vec<UrbanRuralSplit>> =
            aggregates.iter().map(|a| a.urban_rural).collect();

        match direct {
            Some(splits) if !splits.is_empty() => (splits, false),
            _ => {
                debug!(counties = aggregates.len(), "Estimating urban/rural splits from station counts");
                (aggregates.iter().map(Self::estimate).collect(), true)
            }
        }
    }
}
