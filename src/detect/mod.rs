//! Anomaly scoring engine -- features, vocabulary, detector, orchestration.

pub mod features;
pub mod forest;
pub mod scaler;
pub mod service;
pub mod train;
pub mod vocab;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("feature vector length mismatch: expected {expected}, have {have}")]
    FeatureLengthMismatch { expected: usize, have: usize },

    #[error("non-finite value for feature {index}")]
    NonFiniteFeature { index: usize },

    #[error("detector has no trees; model was never trained")]
    UntrainedDetector,
}
