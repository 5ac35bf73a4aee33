//! Bootstrap training against synthetic log-traffic distributions.
//!
//! Used when no persisted detector exists. The two populations mirror what
//! healthy and unhealthy log traffic look like in the six-feature space, so
//! the freshly trained forest is useful before any real traffic arrives.

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use crate::detect::forest::IsolationForest;
use crate::detect::scaler::StandardScaler;
use crate::detect::ScoreError;

/// Anomaly fraction of the synthetic mix (80 of 400 samples).
pub const CONTAMINATION: f64 = 0.2;

/// Seed for the bootstrap path, fixed for reproducible artifacts.
pub const DEFAULT_SEED: u64 = 42;

const NORMAL_SAMPLES: usize = 320;
const ANOMALY_SAMPLES: usize = 80;

/// Train a detector and its companion scaler from scratch.
/// Deterministic for a fixed seed.
pub fn train(seed: u64) -> Result<(IsolationForest, StandardScaler), ScoreError> {
    info!(seed, "Training bootstrap detector on synthetic traffic");

    let samples = synthetic_population(seed);
    let scaler = StandardScaler::fit(&samples);
    let scaled: Vec<Vec<f64>> = samples
        .iter()
        .map(|row| scaler.transform(row))
        .collect::<Result<_, _>>()?;
    let forest = IsolationForest::fit(&scaled, CONTAMINATION, seed);

    info!(
        samples = samples.len(),
        contamination = CONTAMINATION,
        "Bootstrap training complete"
    );
    Ok((forest, scaler))
}

/// 320 normal + 80 anomalous feature rows, in that order.
///
/// Feature order matches extraction: [length, service_bucket, severity,
/// digit_ratio, word_count, rare_word_score].
pub fn synthetic_population(seed: u64) -> Vec<Vec<f64>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut samples = Vec::with_capacity(NORMAL_SAMPLES + ANOMALY_SAMPLES);

    // Normal traffic: short clean messages, low severity, familiar words
    let severity = WeightedIndex::new([0.7, 0.2, 0.1]).expect("static weights are valid");
    for _ in 0..NORMAL_SAMPLES {
        samples.push(vec![
            rng.gen_range(20..200) as f64,
            rng.gen_range(0..1000) as f64,
            [0.0, 2.0, 4.0][severity.sample(&mut rng)],
            rng.gen_range(0.0..0.15),
            rng.gen_range(3..15) as f64,
            rng.gen_range(0.0..3.0),
        ]);
    }

    // Anomalous traffic: long messages, high severity, unusual vocabulary
    let severity = WeightedIndex::new([0.3, 0.5, 0.2]).expect("static weights are valid");
    for _ in 0..ANOMALY_SAMPLES {
        samples.push(vec![
            rng.gen_range(50..500) as f64,
            rng.gen_range(0..1000) as f64,
            [6.0, 8.0, 10.0][severity.sample(&mut rng)],
            rng.gen_range(0.0..0.3),
            rng.gen_range(5..30) as f64,
            rng.gen_range(5.0..10.0),
        ]);
    }

    samples
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::features::FEATURE_COUNT;

    #[test]
    fn test_population_shape_and_ranges() {
        let samples = synthetic_population(DEFAULT_SEED);
        assert_eq!(samples.len(), NORMAL_SAMPLES + ANOMALY_SAMPLES);

        for row in &samples[..NORMAL_SAMPLES] {
            assert_eq!(row.len(), FEATURE_COUNT);
            assert!((20.0..200.0).contains(&row[0]));
            assert!((0.0..1000.0).contains(&row[1]));
            assert!([0.0, 2.0, 4.0].contains(&row[2]));
            assert!((0.0..0.15).contains(&row[3]));
            assert!((3.0..15.0).contains(&row[4]));
            assert!((0.0..3.0).contains(&row[5]));
        }
        for row in &samples[NORMAL_SAMPLES..] {
            assert!((50.0..500.0).contains(&row[0]));
            assert!([6.0, 8.0, 10.0].contains(&row[2]));
            assert!((0.0..0.3).contains(&row[3]));
            assert!((5.0..30.0).contains(&row[4]));
            assert!((5.0..10.0).contains(&row[5]));
        }
    }

    #[test]
    fn test_training_is_deterministic() {
        let (forest_a, scaler_a) = train(DEFAULT_SEED).unwrap();
        let (forest_b, scaler_b) = train(DEFAULT_SEED).unwrap();

        let raw = vec![120.0, 314.0, 2.0, 0.04, 9.0, 1.5];
        let score_a = forest_a.score(&scaler_a.transform(&raw).unwrap()).unwrap();
        let score_b = forest_b.score(&scaler_b.transform(&raw).unwrap()).unwrap();
        assert_eq!(score_a, score_b);
    }

    #[test]
    fn test_trained_model_separates_populations() {
        let (forest, scaler) = train(DEFAULT_SEED).unwrap();

        // Deep in the normal distribution
        let normal = scaler
            .transform(&[100.0, 500.0, 0.0, 0.05, 8.0, 1.0])
            .unwrap();
        let (normal_flag, normal_decision) = forest.score(&normal).unwrap();
        assert!(!normal_flag, "central normal point misclassified");

        // Deep in the anomalous distribution
        let anomalous = scaler
            .transform(&[400.0, 500.0, 10.0, 0.25, 25.0, 9.0])
            .unwrap();
        let (anomaly_flag, anomaly_decision) = forest.score(&anomalous).unwrap();
        assert!(anomaly_flag, "deep anomaly misclassified");

        assert!(normal_decision > anomaly_decision);
    }
}
