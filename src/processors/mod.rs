pub mod aggregator;
pub mod county_names;
pub mod estimator;
pub mod percentages;
pub mod pipeline;
pub mod simulator;

pub use aggregator::Aggregator;
pub use county_names::{is_canonical, normalize_county_name, COUNTIES};
pub use estimator::DemographicEstimator;
pub use percentages::PercentageCalculator;
pub use pipeline::{AggregationOutcome, AttendancePipeline, LastUpdates, TableUpdate, UpdateSummary};
