use crate::analyzers::kmeans::KMeans;
use crate::analyzers::pca::Pca;
use crate::analyzers::scaler::StandardScaler;
use crate::config::{ClusteringSettings, ColumnMapping};
use crate::error::{ProcessingError, Result};
use crate::models::{
    CentroidProfile, ClusterLevel, ClusterUnit, ClusteringResult, FeatureCounts,
    FeaturePercentages, LevelClustering, RawStationRecord,
};
use crate::readers::PresenceTable;
use crate::utils::constants::{FEATURE_COUNT, PCA_COMPONENTS};
use ndarray::Array2;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Summed counts of one clustering unit
#[derive(Debug, Clone, Copy, Default)]
struct UnitTotals {
    registered: u64,
    votes: u64,
    counts: [u64; FEATURE_COUNT],
}

impl UnitTotals {
    fn add(&mut self, record: &RawStationRecord) -> Result<()> {
        let overflow = || ProcessingError::ComputationFailure("unit totals overflowed".to_string());

        self.registered = self
            .registered
            .checked_add(record.registered.unwrap_or(0))
            .ok_or_else(overflow)?;
        self.votes = self
            .votes
            .checked_add(record.cluster_votes.unwrap_or(0))
            .ok_or_else(overflow)?;
        for (total, value) in self.counts.iter_mut().zip(record.demographics.iter()) {
            *total = total.checked_add(value.unwrap_or(0)).ok_or_else(overflow)?;
        }
        Ok(())
    }

    /// Share of votes per feature, clamped to [0, 100]
    fn percentages(&self) -> [f64; FEATURE_COUNT] {
        self.counts.map(|count| {
            let pct = count as f64 / self.votes as f64 * 100.0;
            if pct.is_finite() {
                pct.clamp(0.0, 100.0)
            } else {
                0.0
            }
        })
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Groups stations into units, clusters them by demographic composition and
/// projects them onto two principal components.
pub struct ClusteringEngine {
    columns: ColumnMapping,
    settings: ClusteringSettings,
}

impl ClusteringEngine {
    pub fn new(columns: ColumnMapping, settings: ClusteringSettings) -> Self {
        Self { columns, settings }
    }

    /// Columns a level cannot be clustered without
    pub fn required_columns(&self, level: ClusterLevel) -> Vec<String> {
        let mut columns = vec![self.columns.county.clone()];
        if matches!(level, ClusterLevel::Town | ClusterLevel::Polling) {
            columns.push(self.columns.town.clone());
        }
        if level == ClusterLevel::Polling {
            columns.push(self.columns.station_name.clone());
        }
        columns.push(self.columns.registered.clone());
        columns.push(self.columns.cluster_votes_cast.clone());
        columns.extend(self.columns.demographic_columns());
        columns
    }

    pub fn cluster(
        &self,
        table: &PresenceTable,
        level: ClusterLevel,
        n_clusters: usize,
    ) -> Result<LevelClustering> {
        table.require(&self.required_columns(level))?;

        let result = self.cluster_by(&table.records, |record| level.group_key(record), n_clusters)?;
        info!(
            level = %level,
            units = result.clustered_data.len(),
            k = result.n_clusters,
            "Clustering complete"
        );

        Ok(LevelClustering {
            cluster_level: level,
            result,
        })
    }

    /// Level-agnostic core: `key_fn` picks the unit of each record, or
    /// `None` to leave the record out.
    pub fn cluster_by<K, F>(
        &self,
        records: &[RawStationRecord],
        key_fn: F,
        n_clusters: usize,
    ) -> Result<ClusteringResult<K>>
    where
        K: Ord + Clone,
        F: Fn(&RawStationRecord) -> Option<K>,
    {
        if n_clusters == 0 {
            return Err(ProcessingError::InvalidParameter(
                "number of clusters must be at least 1".to_string(),
            ));
        }

        let mut groups: BTreeMap<K, UnitTotals> = BTreeMap::new();
        let mut unkeyed = 0usize;
        for record in records {
            match key_fn(record) {
                Some(key) => groups.entry(key).or_default().add(record)?,
                None => unkeyed += 1,
            }
        }
        if unkeyed > 0 {
            debug!(rows = unkeyed, "Rows without a complete grouping key were skipped");
        }

        let units: Vec<(K, UnitTotals)> = groups.into_iter().filter(|(_, t)| t.votes > 0).collect();
        let n = units.len();
        if n < 2 {
            return Err(ProcessingError::DegenerateInput(format!(
                "clustering needs at least 2 units with votes cast, found {}",
                n
            )));
        }

        let mut warnings = Vec::new();
        let k = if n <= n_clusters {
            let reduced = (n - 1).max(2);
            let message = format!(
                "Requested {} clusters but only {} units are available; using {} clusters",
                n_clusters, n, reduced
            );
            warn!(requested = n_clusters, units = n, k = reduced, "Reducing cluster count");
            warnings.push(message);
            reduced
        } else {
            n_clusters
        };

        let percentages: Vec<[f64; FEATURE_COUNT]> = units.iter().map(|(_, t)| t.percentages()).collect();
        let features = Array2::from_shape_fn((n, FEATURE_COUNT), |(i, j)| percentages[i][j]);

        let (scaler, scaled) = StandardScaler::fit_transform(features.view())?;
        let fitted = KMeans::new(k)
            .max_iter(self.settings.max_iter)
            .tolerance(self.settings.tolerance)
            .n_init(self.settings.n_init)
            .random_state(self.settings.seed)
            .n_jobs(self.settings.worker_count())
            .fit(scaled.view())?;

        let centers = scaler.inverse_transform(fitted.centroids.view());
        let cluster_centers: BTreeMap<usize, CentroidProfile> = centers
            .outer_iter()
            .enumerate()
            .map(|(label, row)| {
                let profile = std::array::from_fn(|j| finite_or_zero(row[j]));
                (label, CentroidProfile(profile))
            })
            .collect();

        let pca = Pca::fit(scaled.view(), PCA_COMPONENTS)?;
        let projected = pca.transform(scaled.view());
        let explained_variance_ratio = [
            finite_or_zero(pca.explained_variance_ratio[0]),
            finite_or_zero(pca.explained_variance_ratio[1]),
        ];

        let clustered_data = units
            .into_iter()
            .zip(percentages)
            .enumerate()
            .map(|(i, ((key, totals), pct))| ClusterUnit {
                key,
                total_registered: totals.registered,
                total_votes: totals.votes,
                cluster: fitted.labels[i],
                pca_x: finite_or_zero(projected[[i, 0]]),
                pca_y: finite_or_zero(projected[[i, 1]]),
                demographics: FeatureCounts(totals.counts),
                demographics_pct: FeaturePercentages(pct),
            })
            .collect();

        Ok(ClusteringResult {
            requested_clusters: n_clusters,
            n_clusters: k,
            explained_variance_ratio,
            cluster_centers,
            clustered_data,
            warnings,
        })
    }
}
