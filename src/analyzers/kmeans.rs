//! Lloyd's k-means with k-means++ seeding and multiple restarts

use crate::error::{ProcessingError, Result};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::prelude::*;
use rand::rngs::StdRng;
use rayon::prelude::*;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct KMeans {
    /// Number of clusters
    pub n_clusters: usize,
    /// Maximum Lloyd iterations per run
    pub max_iter: usize,
    /// Convergence tolerance, relative to the mean feature variance
    pub tol: f64,
    /// Number of seeded restarts
    pub n_init: usize,
    /// Base seed; run `i` uses `random_state + i`
    pub random_state: u64,
    /// Worker threads for the restarts, all cores when `None`
    pub n_jobs: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct KMeansResult {
    pub labels: Array1<usize>,
    pub centroids: Array2<f64>,
    pub inertia: f64,
    pub n_iter: usize,
    pub converged: bool,
}

impl Default for KMeans {
    fn default() -> Self {
        Self {
            n_clusters: 8,
            max_iter: 300,
            tol: 1e-4,
            n_init: 10,
            random_state: 0,
            n_jobs: None,
        }
    }
}

impl KMeans {
    pub fn new(n_clusters: usize) -> Self {
        Self {
            n_clusters,
            ..Default::default()
        }
    }

    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn tolerance(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    pub fn n_init(mut self, n_init: usize) -> Self {
        self.n_init = n_init;
        self
    }

    pub fn random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Zero keeps the default of one thread per core.
    pub fn n_jobs(mut self, n_jobs: usize) -> Self {
        self.n_jobs = (n_jobs > 0).then_some(n_jobs);
        self
    }

    /// Fit every restart and keep the lowest inertia; the earliest run wins
    /// ties.
    pub fn fit(&self, data: ArrayView2<f64>) -> Result<KMeansResult> {
        self.validate(data)?;

        let tol = self.absolute_tolerance(data);
        let runs = self.n_init.max(1);

        let mut builder = rayon::ThreadPoolBuilder::new();
        if let Some(n_jobs) = self.n_jobs {
            builder = builder.num_threads(n_jobs);
        }
        let pool = builder
            .build()
            .map_err(|e| ProcessingError::ComputationFailure(format!("thread pool: {}", e)))?;

        let results: Vec<KMeansResult> = pool.install(|| {
            (0..runs)
                .into_par_iter()
                .map(|run| self.fit_single(data, self.random_state.wrapping_add(run as u64), tol))
                .collect()
        });

        let mut best: Option<KMeansResult> = None;
        for result in results {
            if !result.inertia.is_finite() {
                continue;
            }
            match &best {
                Some(current) if result.inertia >= current.inertia => {}
                _ => best = Some(result),
            }
        }

        let best = best.ok_or_else(|| {
            ProcessingError::ComputationFailure("k-means produced no finite solution".to_string())
        })?;
        debug!(
            k = self.n_clusters,
            inertia = best.inertia,
            iterations = best.n_iter,
            converged = best.converged,
            "k-means fitted"
        );
        Ok(best)
    }

    fn validate(&self, data: ArrayView2<f64>) -> Result<()> {
        if self.n_clusters == 0 {
            return Err(ProcessingError::InvalidParameter(
                "number of clusters must be > 0".to_string(),
            ));
        }
        if data.nrows() < self.n_clusters {
            return Err(ProcessingError::InvalidParameter(format!(
                "{} clusters requested for {} points",
                self.n_clusters,
                data.nrows()
            )));
        }
        if data.iter().any(|v| !v.is_finite()) {
            return Err(ProcessingError::ComputationFailure(
                "feature matrix contains non-finite values".to_string(),
            ));
        }
        Ok(())
    }

    fn absolute_tolerance(&self, data: ArrayView2<f64>) -> f64 {
        let variances = data.var_axis(Axis(0), 0.0);
        variances.mean().unwrap_or(0.0) * self.tol
    }

    fn fit_single(&self, data: ArrayView2<f64>, seed: u64, tol: f64) -> KMeansResult {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut centroids = plus_plus_init(data, self.n_clusters, &mut rng);
        let mut converged = false;
        let mut n_iter = 0;

        for _ in 0..self.max_iter {
            n_iter += 1;
            let (labels, distances) = assign(data, centroids.view());
            let updated = update_centroids(data, &labels, &distances, self.n_clusters);

            let shift: f64 = centroids
                .outer_iter()
                .zip(updated.outer_iter())
                .map(|(old, new)| squared_distance(old, new))
                .sum();
            centroids = updated;

            if shift <= tol {
                converged = true;
                break;
            }
        }

        let (labels, distances) = assign(data, centroids.view());
        KMeansResult {
            labels,
            centroids,
            inertia: distances.sum(),
            n_iter,
            converged,
        }
    }
}

pub fn squared_distance(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// k-means++: each further seed is drawn with probability proportional to
/// its squared distance from the nearest seed so far.
fn plus_plus_init<R: Rng>(data: ArrayView2<f64>, k: usize, rng: &mut R) -> Array2<f64> {
    let n = data.nrows();
    let mut centroids = Array2::zeros((k, data.ncols()));
    let first = rng.gen_range(0..n);
    centroids.row_mut(0).assign(&data.row(first));

    let mut nearest: Vec<f64> = data
        .outer_iter()
        .map(|point| squared_distance(point, data.row(first)))
        .collect();

    for c in 1..k {
        let total: f64 = nearest.iter().sum();
        let chosen = if total > 0.0 {
            let mut target = rng.gen::<f64>() * total;
            let mut pick = n - 1;
            for (i, &d) in nearest.iter().enumerate() {
                if target < d {
                    pick = i;
                    break;
                }
                target -= d;
            }
            pick
        } else {
            rng.gen_range(0..n)
        };

        centroids.row_mut(c).assign(&data.row(chosen));
        for (i, point) in data.outer_iter().enumerate() {
            let d = squared_distance(point, data.row(chosen));
            if d < nearest[i] {
                nearest[i] = d;
            }
        }
    }
    centroids
}

/// Nearest centroid per point (lowest index on ties) and its squared distance
fn assign(data: ArrayView2<f64>, centroids: ArrayView2<f64>) -> (Array1<usize>, Array1<f64>) {
    let n = data.nrows();
    let mut labels = Array1::zeros(n);
    let mut distances = Array1::zeros(n);

    for (i, point) in data.outer_iter().enumerate() {
        let mut best = (0, f64::INFINITY);
        for (c, centroid) in centroids.outer_iter().enumerate() {
            let d = squared_distance(point, centroid);
            if d < best.1 {
                best = (c, d);
            }
        }
        labels[i] = best.0;
        distances[i] = best.1;
    }
    (labels, distances)
}

/// Cluster means. An empty cluster takes over the point that currently sits
/// farthest from its own centroid.
fn update_centroids(
    data: ArrayView2<f64>,
    labels: &Array1<usize>,
    distances: &Array1<f64>,
    k: usize,
) -> Array2<f64> {
    let mut sums = Array2::<f64>::zeros((k, data.ncols()));
    let mut counts = vec![0usize; k];
    for (point, &label) in data.outer_iter().zip(labels.iter()) {
        let mut row = sums.row_mut(label);
        row += &point;
        counts[label] += 1;
    }

    let mut distances = distances.to_vec();
    for (c, &count) in counts.iter().enumerate() {
        if count > 0 {
            let mut row = sums.row_mut(c);
            row /= count as f64;
        } else {
            let mut farthest = 0;
            for (i, &d) in distances.iter().enumerate() {
                if d > distances[farthest] {
                    farthest = i;
                }
            }
            sums.row_mut(c).assign(&data.row(farthest));
            distances[farthest] = 0.0;
        }
    }
    sums
}
