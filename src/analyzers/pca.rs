use crate::error::{ProcessingError, Result};
use nalgebra::{DMatrix, SymmetricEigen};
use ndarray::{Array1, Array2, ArrayView2, Axis};

/// Principal components fitted by eigen-decomposition of the covariance
#[derive(Debug, Clone)]
pub struct Pca {
    /// One component per row, strongest first
    pub components: Array2<f64>,
    pub explained_variance: Array1<f64>,
    pub explained_variance_ratio: Array1<f64>,
    mean: Array1<f64>,
}

impl Pca {
    pub fn fit(data: ArrayView2<f64>, n_components: usize) -> Result<Self> {
        let (n, p) = data.dim();
        if n < 2 {
            return Err(ProcessingError::DegenerateInput(format!(
                "PCA needs at least 2 samples, got {}",
                n
            )));
        }
        if n_components == 0 || n_components > p {
            return Err(ProcessingError::InvalidParameter(format!(
                "{} components requested for {} features",
                n_components, p
            )));
        }

        let mean = data
            .mean_axis(Axis(0))
            .ok_or_else(|| ProcessingError::ComputationFailure("PCA mean".to_string()))?;
        let centered = &data - &mean;
        let covariance = centered.t().dot(&centered) / (n as f64 - 1.0);

        let eigen = SymmetricEigen::new(DMatrix::from_fn(p, p, |i, j| covariance[[i, j]]));
        let (values, vectors) = (eigen.eigenvalues, eigen.eigenvectors);
        let mut order: Vec<usize> = (0..p).collect();
        order.sort_by(|&a, &b| values[b].total_cmp(&values[a]));

        let total: f64 = values.iter().map(|v| v.max(0.0)).sum();
        let mut components = Array2::zeros((n_components, p));
        let mut explained_variance = Array1::zeros(n_components);
        let mut explained_variance_ratio = Array1::zeros(n_components);

        for (row, &idx) in order.iter().take(n_components).enumerate() {
            let mut component: Array1<f64> = vectors.column(idx).iter().copied().collect();

            // Deterministic orientation: strongest loading is positive
            let mut strongest = 0;
            for (i, v) in component.iter().enumerate() {
                if v.abs() > component[strongest].abs() {
                    strongest = i;
                }
            }
            if component[strongest] < 0.0 {
                component.mapv_inplace(|v| -v);
            }

            let variance = values[idx].max(0.0);
            components.row_mut(row).assign(&component);
            explained_variance[row] = variance;
            explained_variance_ratio[row] = if total > 0.0 { variance / total } else { 0.0 };
        }

        Ok(Self {
            components,
            explained_variance,
            explained_variance_ratio,
            mean,
        })
    }

    /// Coordinates of each sample on the fitted components
    pub fn transform(&self, data: ArrayView2<f64>) -> Array2<f64> {
        (&data - &self.mean).dot(&self.components.t())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_axis_aligned_variance() -> Result<()> {
        let data = array![[2.0, 0.0], [-2.0, 0.0], [0.0, 1.0], [0.0, -1.0]];
        let pca = Pca::fit(data.view(), 2)?;

        assert!((pca.explained_variance_ratio[0] - 0.8).abs() < 1e-9);
        assert!((pca.explained_variance_ratio[1] - 0.2).abs() < 1e-9);
        assert!((pca.components[[0, 0]] - 1.0).abs() < 1e-9);
        assert!(pca.components[[0, 1]].abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn test_correlated_features_collapse_to_one_component() -> Result<()> {
        let data = array![[1.0, 2.0, 0.5], [2.0, 4.0, 0.5], [3.0, 6.0, 0.5], [4.0, 8.0, 0.5]];
        let pca = Pca::fit(data.view(), 2)?;

        assert!((pca.explained_variance_ratio[0] - 1.0).abs() < 1e-9);
        assert!(pca.explained_variance_ratio[1].abs() < 1e-9);

        let projected = pca.transform(data.view());
        assert_eq!(projected.dim(), (4, 2));
        // positive orientation: larger inputs project further right
        assert!(projected[[3, 0]] > projected[[0, 0]]);
        Ok(())
    }

    #[test]
    fn test_constant_data_has_zero_ratio() -> Result<()> {
        let data = Array2::<f64>::zeros((3, 4));
        let pca = Pca::fit(data.view(), 2)?;
        assert!(pca.explained_variance_ratio.iter().all(|&r| r == 0.0));
        assert!(pca.transform(data.view()).iter().all(|&v| v == 0.0));
        Ok(())
    }

    #[test]
    fn test_components_are_orthonormal() -> Result<()> {
        let data = array![
            [1.0, 0.2, 3.0],
            [0.5, 1.5, 2.0],
            [2.0, 0.1, 0.5],
            [1.2, 2.2, 1.0],
            [0.3, 0.9, 2.5],
        ];
        let pca = Pca::fit(data.view(), 2)?;
        let gram = pca.components.dot(&pca.components.t());

        assert!((gram[[0, 0]] - 1.0).abs() < 1e-9);
        assert!((gram[[1, 1]] - 1.0).abs() < 1e-9);
        assert!(gram[[0, 1]].abs() < 1e-9);
        assert!(pca.explained_variance[0] >= pca.explained_variance[1]);
        Ok(())
    }

    #[test]
    fn test_single_sample_rejected() {
        let data = array![[1.0, 2.0]];
        assert!(Pca::fit(data.view(), 2).is_err());
    }
}
