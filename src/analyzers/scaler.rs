use crate::error::{ProcessingError, Result};
use ndarray::{Array1, Array2, ArrayView2, Axis};

/// Per-feature standardization fitted on one batch.
///
/// Uses the population variance; constant features keep a scale of 1 so
/// they map to zero instead of dividing by zero.
#[derive(Debug, Clone)]
pub struct StandardScaler {
    pub mean: Array1<f64>,
    pub scale: Array1<f64>,
}

impl StandardScaler {
    pub fn fit(data: ArrayView2<f64>) -> Result<Self> {
        if data.nrows() == 0 {
            return Err(ProcessingError::DegenerateInput(
                "cannot standardize an empty feature matrix".to_string(),
            ));
        }

        let mean = data
            .mean_axis(Axis(0))
            .ok_or_else(|| ProcessingError::ComputationFailure("feature mean".to_string()))?;
        let scale = data
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s.is_finite() && s > f64::EPSILON { s } else { 1.0 });

        Ok(Self { mean, scale })
    }

    pub fn transform(&self, data: ArrayView2<f64>) -> Array2<f64> {
        (&data - &self.mean) / &self.scale
    }

    pub fn inverse_transform(&self, data: ArrayView2<f64>) -> Array2<f64> {
        &data * &self.scale + &self.mean
    }

    pub fn fit_transform(data: ArrayView2<f64>) -> Result<(Self, Array2<f64>)> {
        let scaler = Self::fit(data)?;
        let scaled = scaler.transform(data);
        Ok((scaler, scaled))
    }
}
