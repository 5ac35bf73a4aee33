//! Model artifact storage -- the load-or-train lifecycle.
//!
//! Three JSON blobs live under the models directory: `detector.json`,
//! `scaler.json`, and `vocabulary.json`. Detector and scaler load together
//! or not at all; a missing or corrupt one triggers a retrain. The
//! vocabulary is optional and defaults to empty.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::detect::forest::IsolationForest;
use crate::detect::scaler::StandardScaler;
use crate::detect::service::ScoringService;
use crate::detect::train;
use crate::detect::vocab::VocabularyTracker;

pub const DETECTOR_FILE: &str = "detector.json";
pub const SCALER_FILE: &str = "scaler.json";
pub const VOCABULARY_FILE: &str = "vocabulary.json";

/// Outcome of attempting to load the persisted detector and scaler.
/// Only `Missing` and `Corrupt` route into the retraining fallback.
#[derive(Debug)]
pub enum LoadOutcome {
    Loaded {
        detector: Box<IsolationForest>,
        scaler: StandardScaler,
    },
    Missing,
    Corrupt(String),
}

/// Try to read the detector and scaler artifacts from the models directory.
pub fn load_artifacts(dir: &Path) -> LoadOutcome {
    let detector_path = dir.join(DETECTOR_FILE);
    let scaler_path = dir.join(SCALER_FILE);

    if !detector_path.exists() || !scaler_path.exists() {
        return LoadOutcome::Missing;
    }

    let detector: IsolationForest = match read_json(&detector_path) {
        Ok(detector) => detector,
        Err(reason) => return LoadOutcome::Corrupt(reason),
    };
    let scaler: StandardScaler = match read_json(&scaler_path) {
        Ok(scaler) => scaler,
        Err(reason) => return LoadOutcome::Corrupt(reason),
    };

    LoadOutcome::Loaded {
        detector: Box::new(detector),
        scaler,
    }
}

/// Read the persisted vocabulary, or start empty. Absence or a parse
/// failure is non-fatal.
pub fn load_vocabulary(dir: &Path) -> VocabularyTracker {
    let path = dir.join(VOCABULARY_FILE);
    if !path.exists() {
        return VocabularyTracker::new();
    }
    match read_json::<HashMap<String, u64>>(&path) {
        Ok(counts) => {
            info!(words = counts.len(), "Loaded persisted vocabulary");
            VocabularyTracker::from_counts(counts)
        }
        Err(reason) => {
            warn!(%reason, "Failed to load vocabulary, starting empty");
            VocabularyTracker::new()
        }
    }
}

/// Persist all three artifacts.
pub fn save_artifacts(
    dir: &Path,
    detector: &IsolationForest,
    scaler: &StandardScaler,
    vocabulary: &HashMap<String, u64>,
) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create models directory {}", dir.display()))?;

    write_json(&dir.join(DETECTOR_FILE), detector)?;
    write_json(&dir.join(SCALER_FILE), scaler)?;
    write_json(&dir.join(VOCABULARY_FILE), vocabulary)?;

    info!(dir = %dir.display(), "Persisted detector, scaler, and vocabulary");
    Ok(())
}

/// Load persisted artifacts or bootstrap-train, then assemble the scoring
/// service. The returned service is ready to share across requests.
///
/// A failed persist after retraining is logged but not fatal -- the
/// freshly trained in-memory model still serves.
pub fn load_or_train(dir: &Path, seed: u64) -> Result<ScoringService> {
    match load_artifacts(dir) {
        LoadOutcome::Loaded { detector, scaler } => {
            info!(dir = %dir.display(), "Loaded persisted detector and scaler");
            let vocabulary = load_vocabulary(dir);
            Ok(ScoringService::new(*detector, scaler, vocabulary))
        }
        LoadOutcome::Missing => {
            warn!(dir = %dir.display(), "No persisted model found, training");
            retrain(dir, seed)
        }
        LoadOutcome::Corrupt(reason) => {
            warn!(%reason, "Persisted model unreadable, retraining");
            retrain(dir, seed)
        }
    }
}

fn retrain(dir: &Path, seed: u64) -> Result<ScoringService> {
    let (detector, scaler) = train::train(seed).context("Bootstrap training failed")?;
    let vocabulary = load_vocabulary(dir);

    if let Err(e) = save_artifacts(dir, &detector, &scaler, &vocabulary.snapshot()) {
        error!("Failed to persist trained artifacts: {e:#}");
    }

    Ok(ScoringService::new(detector, scaler, vocabulary))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, String> {
    let content =
        fs::read_to_string(path).map_err(|e| format!("{}: {e}", path.display()))?;
    serde_json::from_str(&content).map_err(|e| format!("{}: {e}", path.display()))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string(value)
        .with_context(|| format!("Failed to serialize {}", path.display()))?;
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}
