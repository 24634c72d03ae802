pub mod cluster;
pub mod county;
pub mod demographics;
pub mod results;
pub mod station;

pub use cluster::{
    CentroidProfile, ClusterLevel, ClusterUnit, ClusteringResult, FeatureCounts,
    FeaturePercentages, GroupKey, LevelClustering,
};
pub use county::{AreaBreakdown, AttendanceRow, CountyAggregate, DataSource, UrbanRuralSplit};
pub use demographics::{
    CountyDemographics, DemographicBreakdown, DemographicPercentages, DemographicReport,
    DemographicTotals, ScopedPercentages,
};
pub use results::CandidateResults;
pub use station::{feature_index, feature_key, AgeBand, Gender, RawStationRecord, FEATURES};
