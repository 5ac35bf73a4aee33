//! Per-record scoring orchestration and the health self-test.

use serde::{Deserialize, Serialize};

use crate::detect::features;
use crate::detect::forest::IsolationForest;
use crate::detect::scaler::StandardScaler;
use crate::detect::vocab::VocabularyTracker;
use crate::detect::ScoreError;

/// Version tag attached to every prediction and health response.
pub const MODEL_VERSION: &str = "1.0.0";

/// One incoming log record. Constructed per request, discarded after
/// scoring; only the vocabulary retains its words.
#[derive(Debug, Clone, Deserialize)]
pub struct LogRecord {
    pub service: String,
    pub message: String,
}

/// Scoring result returned to the caller.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    pub service: String,
    pub message: String,
    pub is_anomaly: bool,
    /// Decision score: higher = more normal, negative = anomalous region
    pub score: f64,
    pub model_version: String,
}

/// The scoring engine: an immutable trained detector and scaler plus the
/// mutable vocabulary. One instance is shared across all requests.
pub struct ScoringService {
    detector: IsolationForest,
    scaler: StandardScaler,
    vocabulary: VocabularyTracker,
}

impl ScoringService {
    pub fn new(
        detector: IsolationForest,
        scaler: StandardScaler,
        vocabulary: VocabularyTracker,
    ) -> Self {
        Self {
            detector,
            scaler,
            vocabulary,
        }
    }

    /// Score one record.
    ///
    /// The message is observed before feature extraction, so its own words
    /// count toward its rarity.
    pub fn predict(&self, record: &LogRecord) -> Result<Prediction, ScoreError> {
        self.vocabulary.observe(&record.message);

        let features = features::extract(&record.message, &record.service, &self.vocabulary);
        let scaled = self.scaler.transform(&features.to_vector())?;
        let (is_anomaly, score) = self.detector.score(&scaled)?;

        Ok(Prediction {
            service: record.service.clone(),
            message: record.message.clone(),
            is_anomaly,
            score,
            model_version: MODEL_VERSION.to_string(),
        })
    }

    /// Health self-test: run a fixed synthetic vector through the
    /// scale+score path. Side-effect free -- the vocabulary is not touched.
    pub fn health_check(&self) -> Result<f64, ScoreError> {
        const PROBE: [f64; features::FEATURE_COUNT] = [100.0, 500.0, 0.0, 0.05, 5.0, 0.0];
        let scaled = self.scaler.transform(&PROBE)?;
        let (_, score) = self.detector.score(&scaled)?;
        Ok(score)
    }

    pub fn vocabulary(&self) -> &VocabularyTracker {
        &self.vocabulary
    }
}
