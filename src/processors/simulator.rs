//! Synthetic attendance and results tables over the canonical counties.
//!
//! Used when no usable presence data exists, and by the periodic update
//! that nudges existing tables forward.

use crate::models::{CandidateResults, CountyAggregate, DataSource};
use crate::processors::county_names::COUNTIES;
use crate::utils::constants::*;
use crate::utils::{percentage, round_to};
use rand::Rng;

/// Share ranges of the first four age bands; the last band takes the rest
const AGE_SHARES: [(f64, f64); 4] = [(0.05, 0.15), (0.15, 0.25), (0.15, 0.25), (0.25, 0.35)];

fn attendance(votes_cast: u64, total_voters: u64) -> f64 {
    round_to(percentage(votes_cast, total_voters).unwrap_or(0.0), 2)
}

/// Structurally valid random aggregates, one per canonical county
pub fn generate_attendance<R: Rng>(rng: &mut R, timestamp: &str) -> Vec<CountyAggregate> {
    COUNTIES
        .iter()
        .map(|&county| {
            let total_voters = rng.gen_range(SIM_TOTAL_VOTERS.0..=SIM_TOTAL_VOTERS.1);
            let attendance_pct = rng.gen_range(SIM_ATTENDANCE_PCT.0..SIM_ATTENDANCE_PCT.1);
            let votes_cast = (total_voters as f64 * attendance_pct / 100.0) as u64;

            let male_ratio = rng.gen_range(SIM_MALE_RATIO.0..SIM_MALE_RATIO.1);
            let male_voters = (votes_cast as f64 * male_ratio) as u64;

            let mut ages = [0u64; AGE_BAND_COUNT];
            for (slot, &(low, high)) in ages.iter_mut().zip(AGE_SHARES.iter()) {
                *slot = (votes_cast as f64 * rng.gen_range(low..high)) as u64;
            }
            let assigned: u64 = ages[..AGE_BAND_COUNT - 1].iter().sum();
            ages[AGE_BAND_COUNT - 1] = votes_cast.saturating_sub(assigned);

            CountyAggregate {
                county: county.to_string(),
                total_voters,
                votes_cast,
                attendance_percentage: attendance(votes_cast, total_voters),
                male_voters: Some(male_voters),
                female_voters: Some(votes_cast - male_voters),
                age_groups: ages.map(Some),
                urban_stations: Some(rng.gen_range(SIM_URBAN_STATIONS.0..=SIM_URBAN_STATIONS.1)),
                rural_stations: Some(rng.gen_range(SIM_RURAL_STATIONS.0..=SIM_RURAL_STATIONS.1)),
                urban_rural: None,
                timestamp: timestamp.to_string(),
                data_source: DataSource::Synthetic,
            }
        })
        .collect()
}

/// Random candidate shares per county, normalized to 100
pub fn generate_results<R: Rng>(rng: &mut R, timestamp: &str) -> Vec<CandidateResults> {
    COUNTIES
        .iter()
        .map(|&county| {
            let weights: [f64; CANDIDATE_COUNT] = std::array::from_fn(|_| {
                rng.gen_range(SIM_CANDIDATE_WEIGHT.0..SIM_CANDIDATE_WEIGHT.1)
            });
            CandidateResults::new(county, normalize_shares(weights), timestamp)
        })
        .collect()
}

/// Advance turnout by 0.5 to 2 percent of the registered voters, never
/// past the register.
pub fn update_attendance<R: Rng>(rows: &mut [CountyAggregate], rng: &mut R, timestamp: &str) {
    for row in rows.iter_mut() {
        let growth = rng.gen_range(UPDATE_GROWTH.0..UPDATE_GROWTH.1);
        let added = (row.total_voters as f64 * growth) as u64;

        row.votes_cast = row.votes_cast.saturating_add(added).min(row.total_voters);
        row.attendance_percentage = attendance(row.votes_cast, row.total_voters);
        row.timestamp = timestamp.to_string();
    }
}

/// Jitter every candidate share and renormalize each row to 100
pub fn update_results<R: Rng>(rows: &mut [CandidateResults], rng: &mut R, timestamp: &str) {
    for row in rows.iter_mut() {
        let mut shares = row.shares();
        for share in shares.iter_mut() {
            let jittered = *share + rng.gen_range(-UPDATE_JITTER..UPDATE_JITTER);
            *share = if jittered.is_finite() { jittered.max(0.0) } else { 0.0 };
        }
        row.set_shares(normalize_shares(shares));
        row.timestamp = timestamp.to_string();
    }
}

/// Scale to a 100 total, rounded to two decimals; an all-zero row becomes
/// an even split.
fn normalize_shares(values: [f64; CANDIDATE_COUNT]) -> [f64; CANDIDATE_COUNT] {
    let total: f64 = values.iter().sum();
    if total > 0.0 {
        values.map(|v| round_to(v / total * 100.0, 2))
    } else {
        [100.0 / CANDIDATE_COUNT as f64; CANDIDATE_COUNT]
    }
}
