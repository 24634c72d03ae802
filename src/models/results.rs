use crate::utils::constants::CANDIDATE_COUNT;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Candidate vote shares of one county, in percent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct CandidateResults {
    #[validate(length(min = 1))]
    pub county: String,
    #[validate(range(min = 0.0, max = 100.0))]
    pub candidate_1: f64,
    #[validate(range(min = 0.0, max = 100.0))]
    pub candidate_2: f64,
    #[validate(range(min = 0.0, max = 100.0))]
    pub candidate_3: f64,
    #[validate(range(min = 0.0, max = 100.0))]
    pub candidate_4: f64,
    #[validate(range(min = 0.0, max = 100.0))]
    pub candidate_5: f64,
    #[serde(default)]
    pub timestamp: String,
}

impl CandidateResults {
    pub fn new(county: &str, shares: [f64; CANDIDATE_COUNT], timestamp: &str) -> Self {
        let [candidate_1, candidate_2, candidate_3, candidate_4, candidate_5] = shares;
        Self {
            county: county.to_string(),
            candidate_1,
            candidate_2,
            candidate_3,
            candidate_4,
            candidate_5,
            timestamp: timestamp.to_string(),
        }
    }

    pub fn shares(&self) -> [f64; CANDIDATE_COUNT] {
        [
            self.candidate_1,
            self.candidate_2,
            self.candidate_3,
            self.candidate_4,
            self.candidate_5,
        ]
    }

    pub fn set_shares(&mut self, shares: [f64; CANDIDATE_COUNT]) {
        [
            self.candidate_1,
            self.candidate_2,
            self.candidate_3,
            self.candidate_4,
            self.candidate_5,
        ] = shares;
    }

    pub fn share_total(&self) -> f64 {
        self.shares().iter().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shares_round_trip_through_setters() {
        let mut results = CandidateResults::new("Alba", [20.0; 5], "2024-12-02 07:00:00");
        results.set_shares([10.0, 20.0, 30.0, 25.0, 15.0]);
        assert_eq!(results.candidate_3, 30.0);
        assert_eq!(results.share_total(), 100.0);
        assert!(results.validate().is_ok());
    }
}
