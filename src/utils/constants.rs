/// Sentinel for rows whose administrative unit is missing
pub const UNKNOWN_COUNTY: &str = "Unknown";

/// Default file names under the data directory
pub const PRESENCE_FILE: &str = "presence_now.csv";
pub const CLUSTER_PRESENCE_FILE: &str = "Cluster/presence_now.csv";
pub const ATTENDANCE_FILE: &str = "attendance.csv";
pub const RESULTS_FILE: &str = "results.csv";
pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_CONFIG_FILE: &str = "presence-processor.toml";

/// Prefix of archived presence files; those are never archived twice
pub const PROCESSED_PREFIX: &str = "processed_";

/// Timestamp formats
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const ARCHIVE_STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
pub const NOT_AVAILABLE: &str = "Not available";

/// Station-type markers
pub const URBAN_MARKER: &str = "U";
pub const RURAL_MARKER: &str = "R";

/// Demographic layout
pub const AGE_BAND_COUNT: usize = 5;
pub const FEATURE_COUNT: usize = 10;

/// Clustering defaults
pub const DEFAULT_CLUSTERS: usize = 5;
pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_N_INIT: usize = 10;
pub const DEFAULT_MAX_ITER: usize = 300;
pub const DEFAULT_TOLERANCE: f64 = 1e-4;
pub const PCA_COMPONENTS: usize = 2;

/// Candidates in the results table
pub const CANDIDATE_COUNT: usize = 5;

/// Simulation bounds
pub const SIM_TOTAL_VOTERS: (u64, u64) = (300_000, 2_000_000);
pub const SIM_ATTENDANCE_PCT: (f64, f64) = (25.0, 60.0);
pub const SIM_MALE_RATIO: (f64, f64) = (0.45, 0.55);
pub const SIM_URBAN_STATIONS: (u64, u64) = (20, 100);
pub const SIM_RURAL_STATIONS: (u64, u64) = (10, 50);
pub const SIM_CANDIDATE_WEIGHT: (f64, f64) = (5.0, 35.0);
pub const UPDATE_GROWTH: (f64, f64) = (0.005, 0.02);
pub const UPDATE_JITTER: f64 = 0.5;
