use crate::error::{ProcessingError, Result};
use crate::models::{AgeBand, Gender};
use crate::utils::constants::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use validator::Validate;

/// Runtime settings: serde defaults, then an optional TOML file, then
/// `PRESENCE__`-prefixed environment variables.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub presence_file: String,
    pub cluster_file: String,
    pub attendance_file: String,
    pub results_file: String,

    pub columns: ColumnMapping,

    #[validate(nested)]
    pub clustering: ClusteringSettings,
}

/// Header names of the per-station presence table
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
    pub county: String,
    pub town: String,
    pub station_id: String,
    pub station_name: String,
    pub station_type: String,
    pub registered: String,
    pub votes_cast: String,
    /// Votes-cast denominator of the clustering features
    pub cluster_votes_cast: String,
    pub male_prefix: String,
    pub female_prefix: String,
    pub urban_marker: String,
    pub rural_marker: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ClusteringSettings {
    #[validate(range(min = 1))]
    pub default_clusters: usize,

    pub seed: u64,

    #[validate(range(min = 1))]
    pub n_init: usize,

    #[validate(range(min = 1))]
    pub max_iter: usize,

    #[validate(range(min = 0.0))]
    pub tolerance: f64,

    /// Worker threads for the k-means restarts; 0 uses every CPU
    pub max_workers: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            presence_file: PRESENCE_FILE.to_string(),
            cluster_file: CLUSTER_PRESENCE_FILE.to_string(),
            attendance_file: ATTENDANCE_FILE.to_string(),
            results_file: RESULTS_FILE.to_string(),
            columns: ColumnMapping::default(),
            clustering: ClusteringSettings::default(),
        }
    }
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            county: "Judet".to_string(),
            town: "Localitate".to_string(),
            station_id: "Nr sectie de votare".to_string(),
            station_name: "Nume sectie de votare".to_string(),
            station_type: "Mediu".to_string(),
            registered: "Înscriși pe liste permanente".to_string(),
            votes_cast: "LT".to_string(),
            cluster_votes_cast: "LP".to_string(),
            male_prefix: "Barbati".to_string(),
            female_prefix: "Femei".to_string(),
            urban_marker: URBAN_MARKER.to_string(),
            rural_marker: RURAL_MARKER.to_string(),
        }
    }
}

impl Default for ClusteringSettings {
    fn default() -> Self {
        Self {
            default_clusters: DEFAULT_CLUSTERS,
            seed: DEFAULT_SEED,
            n_init: DEFAULT_N_INIT,
            max_iter: DEFAULT_MAX_ITER,
            tolerance: DEFAULT_TOLERANCE,
            max_workers: 0,
        }
    }
}

impl Settings {
    /// Load settings, layering the optional file and the environment over
    /// the defaults. A missing file is not an error.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let file = config_file
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        let settings: Settings = config::Config::builder()
            .add_source(config::File::from(file).required(false))
            .add_source(
                config::Environment::with_prefix("PRESENCE")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| ProcessingError::Config(e.to_string()))?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn with_data_dir(mut self, data_dir: PathBuf) -> Self {
        self.data_dir = data_dir;
        self
    }

    pub fn presence_path(&self) -> PathBuf {
        self.data_dir.join(&self.presence_file)
    }

    pub fn cluster_path(&self) -> PathBuf {
        self.data_dir.join(&self.cluster_file)
    }

    pub fn attendance_path(&self) -> PathBuf {
        self.data_dir.join(&self.attendance_file)
    }

    pub fn results_path(&self) -> PathBuf {
        self.data_dir.join(&self.results_file)
    }
}

impl ClusteringSettings {
    /// Threads for the k-means restarts
    pub fn worker_count(&self) -> usize {
        if self.max_workers == 0 {
            num_cpus::get()
        } else {
            self.max_workers
        }
    }
}

impl ColumnMapping {
    /// Source header of one gender × age-band count, e.g. `Barbati 18-24`
    pub fn demographic(&self, gender: Gender, band: AgeBand) -> String {
        let prefix = match gender {
            Gender::Male => &self.male_prefix,
            Gender::Female => &self.female_prefix,
        };
        format!("{} {}", prefix, band.source_label())
    }

    /// All ten demographic headers in feature order (male bands, then female)
    pub fn demographic_columns(&self) -> Vec<String> {
        crate::models::FEATURES
            .iter()
            .map(|&(gender, band)| self.demographic(gender, band))
            .collect()
    }

    /// Columns the county aggregation cannot run without
    pub fn aggregation_columns(&self) -> Vec<String> {
        let mut columns = vec![
            self.county.clone(),
            self.registered.clone(),
            self.votes_cast.clone(),
        ];
        columns.extend(self.demographic_columns());
        columns
    }
}
