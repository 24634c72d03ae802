use crate::error::{ProcessingError, Result};
use crate::models::{
    AreaBreakdown, CountyAggregate, CountyDemographics, DemographicBreakdown,
    DemographicPercentages, DemographicReport, DemographicTotals, ScopedPercentages,
};
use crate::processors::estimator::DemographicEstimator;
use crate::utils::{percentage, round_to};

fn share(part: u64, whole: u64) -> Option<f64> {
    percentage(part, whole).map(|p| round_to(p, 1))
}

/// Derives the percentage fields of a demographic breakdown.
pub struct PercentageCalculator;

impl PercentageCalculator {
    pub fn compute(totals: &DemographicTotals) -> DemographicPercentages {
        let votes = totals.total_votes;
        let mut result = DemographicPercentages::default();
        if votes == 0 {
            return result;
        }

        result.male = share(totals.male_voters, votes);
        result.female = share(totals.female_voters, votes);
        result.ages = totals.ages.map(|count| share(count, votes));

        if let Some(split) = &totals.urban_rural {
            result.urban = share(split.urban.votes, votes);
            result.rural = share(split.rural.votes, votes);
            result.within_urban = Self::scoped(&split.urban);
            result.within_rural = Self::scoped(&split.rural);
        }
        result
    }

    /// Percentages inside one area, keyed on that area's own votes
    fn scoped(area: &AreaBreakdown) -> Option<ScopedPercentages> {
        let votes = area.votes;
        Some(ScopedPercentages {
            male: share(area.male, votes)?,
            female: share(area.female, votes)?,
            ages: area.ages.map(|count| share(count, votes).unwrap_or(0.0)),
        })
    }

    fn breakdown(totals: DemographicTotals) -> DemographicBreakdown {
        DemographicBreakdown {
            percentages: Self::compute(&totals),
            totals,
        }
    }

    /// National and per-county breakdowns. National percentages come from
    /// summed counts, never from averaged county percentages.
    pub fn build_report(aggregates: &[CountyAggregate]) -> Result<DemographicReport> {
        let first = aggregates
            .first()
            .ok_or_else(|| ProcessingError::NotFound("attendance table is empty".to_string()))?;

        let (splits, estimated) = DemographicEstimator::resolve(aggregates);
        let county_totals: Vec<DemographicTotals> = aggregates
            .iter()
            .zip(splits)
            .map(|(aggregate, split)| DemographicTotals::from_aggregate(aggregate, Some(split)))
            .collect();

        let national = Self::breakdown(DemographicTotals::sum(&county_totals)?);
        let counties = aggregates
            .iter()
            .zip(county_totals)
            .map(|(aggregate, totals)| CountyDemographics {
                county: aggregate.county.clone(),
                breakdown: Self::breakdown(totals),
            })
            .collect();

        Ok(DemographicReport {
            national,
            counties,
            last_update: first.timestamp.clone(),
            has_urban_rural_data: true,
            urban_rural_estimated: estimated,
            data_source: first.data_source,
        })
    }
}
