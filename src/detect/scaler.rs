//! Per-feature standardization fitted over the training population.

use serde::{Deserialize, Serialize};

use crate::detect::ScoreError;

/// Mean/standard-deviation scaler. Fit once during training, immutable
/// afterwards, persisted beside the detector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    pub means: Vec<f64>,
    pub stds: Vec<f64>,
}

impl StandardScaler {
    /// Fit means and population standard deviations over the sample rows.
    pub fn fit(samples: &[Vec<f64>]) -> Self {
        let n_features = samples.first().map_or(0, Vec::len);
        let count = samples.len().max(1) as f64;

        let mut means = vec![0.0; n_features];
        for row in samples {
            for (i, value) in row.iter().enumerate() {
                means[i] += value;
            }
        }
        for mean in &mut means {
            *mean /= count;
        }

        let mut stds = vec![0.0; n_features];
        for row in samples {
            for (i, value) in row.iter().enumerate() {
                let diff = value - means[i];
                stds[i] += diff * diff;
            }
        }
        for std in &mut stds {
            *std = (*std / count).sqrt();
            // Constant features scale with divisor 1.0 instead of dividing by zero
            if *std < f64::EPSILON {
                *std = 1.0;
            }
        }

        Self { means, stds }
    }

    /// Standardize one feature vector.
    pub fn transform(&self, features: &[f64]) -> Result<Vec<f64>, ScoreError> {
        if features.len() != self.means.len() {
            return Err(ScoreError::FeatureLengthMismatch {
                expected: self.means.len(),
                have: features.len(),
            });
        }
        for (index, value) in features.iter().enumerate() {
            if !value.is_finite() {
                return Err(ScoreError::NonFiniteFeature { index });
            }
        }

        Ok(features
            .iter()
            .enumerate()
            .map(|(i, value)| (value - self.means[i]) / self.stds[i])
            .collect())
    }
}
