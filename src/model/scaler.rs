//! Standard Scaler
//!
//! Zero-mean / unit-variance normalisation, fit once on the training matrix.
//! Uses the population standard deviation; constant columns keep scale 1.0.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use super::inference::InferenceError;
use super::trainer::TrainingError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Array1<f64>,
    pub scale: Array1<f64>,
}

impl StandardScaler {
    /// Fit per-column mean and standard deviation
    pub fn fit(x: ArrayView2<'_, f64>) -> Result<Self, TrainingError> {
        let mean = x.mean_axis(Axis(0)).ok_or(TrainingError::EmptyDataset)?;
        let scale = x
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s == 0.0 || !s.is_finite() { 1.0 } else { s });

        Ok(Self { mean, scale })
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    /// Transform a whole matrix
    pub fn transform(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>, InferenceError> {
        if x.ncols() != self.n_features() {
            return Err(InferenceError::FeatureCount {
                expected: self.n_features(),
                actual: x.ncols(),
            });
        }
        Ok((&x - &self.mean) / &self.scale)
    }

    /// Transform a single sample
    pub fn transform_row(&self, row: ArrayView1<'_, f64>) -> Result<Array1<f64>, InferenceError> {
        if row.len() != self.n_features() {
            return Err(InferenceError::FeatureCount {
                expected: self.n_features(),
                actual: row.len(),
            });
        }
        Ok((&row - &self.mean) / &self.scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_fit_transform_zero_mean_unit_variance() {
        let x = array![[1.0, 10.0], [2.0, 20.0], [3.0, 30.0], [4.0, 40.0]];
        let scaler = StandardScaler::fit(x.view()).unwrap();
        let t = scaler.transform(x.view()).unwrap();

        for col in t.axis_iter(Axis(1)) {
            let mean = col.mean().unwrap();
            let std = col.std(0.0);
            assert!(mean.abs() < 1e-12);
            assert!((std - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_constant_column_keeps_unit_scale() {
        let x = array![[5.0, 1.0], [5.0, 2.0], [5.0, 3.0]];
        let scaler = StandardScaler::fit(x.view()).unwrap();
        assert_eq!(scaler.scale[0], 1.0);

        let row = scaler.transform_row(array![5.0, 2.0].view()).unwrap();
        assert_eq!(row[0], 0.0);
        assert!(row[1].abs() < 1e-12);
    }

    #[test]
    fn test_row_width_mismatch() {
        let x = array![[1.0, 2.0], [3.0, 4.0]];
        let scaler = StandardScaler::fit(x.view()).unwrap();
        let err = scaler.transform_row(array![1.0, 2.0, 3.0].view()).unwrap_err();
        assert!(matches!(err, InferenceError::FeatureCount { expected: 2, actual: 3 }));
    }

    #[test]
    fn test_row_matches_matrix_transform() {
        let x = array![[5.1, 3.5], [7.0, 3.2], [6.3, 3.3]];
        let scaler = StandardScaler::fit(x.view()).unwrap();
        let matrix = scaler.transform(x.view()).unwrap();
        let row = scaler.transform_row(x.row(1)).unwrap();
        assert_eq!(matrix.row(1), row);
    }
}
