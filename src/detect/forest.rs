//! Isolation-forest ensemble detector.
//!
//! Anomalies are isolated in fewer random splits than normal points, so the
//! average path length to a leaf is shorter for them. The normalized score
//! is `s = 2^(-E[h] / c(psi))` with `c(n)` the expected path length of an
//! unsuccessful BST search; `s` approaches 1 for anomalies and stays well
//! below the calibrated threshold for normal traffic.

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::detect::ScoreError;

const TREE_COUNT: usize = 100;
const MAX_SUBSAMPLE: usize = 256;

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Trained isolation forest. Immutable after `fit`; persisted as
/// `detector.json` and shared read-only across scoring calls.
#[derive(Debug, Serialize, Deserialize)]
pub struct IsolationForest {
    trees: Vec<Node>,
    n_features: usize,
    subsample_size: usize,
    /// Anomaly fraction the decision threshold was calibrated for
    pub contamination: f64,
    /// Anomaly-score threshold: training scores above it are the
    /// `contamination` tail
    threshold: f64,
    pub trained_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
enum Node {
    Split {
        feature: usize,
        value: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
    Leaf {
        size: usize,
    },
}

impl IsolationForest {
    /// Fit the ensemble on sample rows and calibrate the decision threshold
    /// so that roughly `contamination` of the training population scores as
    /// anomalous. Deterministic for a fixed seed.
    pub fn fit(samples: &[Vec<f64>], contamination: f64, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);

        if samples.is_empty() {
            return Self {
                trees: Vec::new(),
                n_features: 0,
                subsample_size: 0,
                contamination,
                threshold: 0.5,
                trained_at: Utc::now(),
            };
        }

        let n_features = samples[0].len();
        let subsample_size = samples.len().min(MAX_SUBSAMPLE);
        let height_limit = (subsample_size as f64).log2().ceil().max(1.0) as usize;

        let mut trees = Vec::with_capacity(TREE_COUNT);
        for _ in 0..TREE_COUNT {
            let indices =
                rand::seq::index::sample(&mut rng, samples.len(), subsample_size).into_vec();
            trees.push(grow_tree(samples, &indices, 0, height_limit, &mut rng));
        }

        let mut forest = Self {
            trees,
            n_features,
            subsample_size,
            contamination,
            threshold: 0.5,
            trained_at: Utc::now(),
        };
        forest.threshold = forest.calibrate_threshold(samples);
        forest
    }

    /// Threshold at the (1 - contamination) quantile of training scores.
    fn calibrate_threshold(&self, samples: &[Vec<f64>]) -> f64 {
        let mut scores: Vec<f64> = samples
            .iter()
            .map(|row| self.anomaly_score_unchecked(row))
            .collect();
        scores.sort_by(|a, b| a.total_cmp(b));

        let n = scores.len();
        let cut = (((1.0 - self.contamination) * n as f64).ceil() as usize)
            .saturating_sub(1)
            .min(n - 1);
        scores[cut]
    }

    /// Score one (already standardized) feature vector.
    ///
    /// Returns the binary classification and a continuous decision score of
    /// `threshold - s`: positive means normal, negative means anomaly,
    /// higher means more normal.
    pub fn score(&self, features: &[f64]) -> Result<(bool, f64), ScoreError> {
        if self.trees.is_empty() {
            return Err(ScoreError::UntrainedDetector);
        }
        if features.len() != self.n_features {
            return Err(ScoreError::FeatureLengthMismatch {
                expected: self.n_features,
                have: features.len(),
            });
        }

        let anomaly_score = self.anomaly_score_unchecked(features);
        let decision = self.threshold - anomaly_score;
        Ok((decision < 0.0, decision))
    }

    fn anomaly_score_unchecked(&self, features: &[f64]) -> f64 {
        let total: f64 = self
            .trees
            .iter()
            .map(|tree| path_length(tree, features, 0))
            .sum();
        let mean_path = total / self.trees.len() as f64;
        let norm = expected_path(self.subsample_size);
        if norm <= 0.0 {
            return 0.5;
        }
        2f64.powf(-mean_path / norm)
    }
}

fn grow_tree(
    samples: &[Vec<f64>],
    indices: &[usize],
    depth: usize,
    limit: usize,
    rng: &mut StdRng,
) -> Node {
    if depth >= limit || indices.len() <= 1 {
        return Node::Leaf {
            size: indices.len(),
        };
    }

    // Only features that still have spread in this partition are splittable
    let n_features = samples[indices[0]].len();
    let mut splittable = Vec::new();
    for feature in 0..n_features {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for &i in indices {
            let v = samples[i][feature];
            min = min.min(v);
            max = max.max(v);
        }
        if max > min {
            splittable.push((feature, min, max));
        }
    }
    if splittable.is_empty() {
        return Node::Leaf {
            size: indices.len(),
        };
    }

    let (feature, min, max) = splittable[rng.gen_range(0..splittable.len())];
    let value = rng.gen_range(min..max);

    let (left, right): (Vec<usize>, Vec<usize>) = indices
        .iter()
        .copied()
        .partition(|&i| samples[i][feature] < value);

    Node::Split {
        feature,
        value,
        left: Box::new(grow_tree(samples, &left, depth + 1, limit, rng)),
        right: Box::new(grow_tree(samples, &right, depth + 1, limit, rng)),
    }
}

fn path_length(node: &Node, features: &[f64], depth: usize) -> f64 {
    match node {
        Node::Leaf { size } => depth as f64 + expected_path(*size),
        Node::Split {
            feature,
            value,
            left,
            right,
        } => {
            if features[*feature] < *value {
                path_length(left, features, depth + 1)
            } else {
                path_length(right, features, depth + 1)
            }
        }
    }
}

/// c(n): expected path length of an unsuccessful BST search over n points.
fn expected_path(n: usize) -> f64 {
    if n <= 1 {
        return 0.0;
    }
    let n = n as f64;
    2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic jittered cluster around the origin plus far outliers.
    fn cluster_with_outliers() -> Vec<Vec<f64>> {
        let mut rng = StdRng::seed_from_u64(7);
        let mut samples: Vec<Vec<f64>> = (0..95)
            .map(|_| vec![rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0)])
            .collect();
        for _ in 0..5 {
            samples.push(vec![rng.gen_range(8.0..12.0), rng.gen_range(8.0..12.0)]);
        }
        samples
    }

    #[test]
    fn test_outliers_score_lower_than_cluster() {
        let samples = cluster_with_outliers();
        let forest = IsolationForest::fit(&samples, 0.05, 42);

        let (_, inlier_decision) = forest.score(&[0.1, -0.2]).unwrap();
        let (outlier_flag, outlier_decision) = forest.score(&[10.0, 10.0]).unwrap();

        assert!(inlier_decision > outlier_decision);
        assert!(outlier_flag, "far outlier should classify as anomaly");
    }

    #[test]
    fn test_fit_is_deterministic_for_fixed_seed() {
        let samples = cluster_with_outliers();
        let a = IsolationForest::fit(&samples, 0.05, 42);
        let b = IsolationForest::fit(&samples, 0.05, 42);

        let probe = [0.3, 0.7];
        assert_eq!(a.score(&probe).unwrap(), b.score(&probe).unwrap());
    }

    #[test]
    fn test_serde_round_trip_preserves_scores() {
        let samples = cluster_with_outliers();
        let forest = IsolationForest::fit(&samples, 0.05, 42);

        let json = serde_json::to_string(&forest).unwrap();
        let reloaded: IsolationForest = serde_json::from_str(&json).unwrap();

        for probe in [[0.0, 0.0], [10.0, 10.0], [-0.5, 0.9]] {
            assert_eq!(forest.score(&probe).unwrap(), reloaded.score(&probe).unwrap());
        }
    }

    #[test]
    fn test_threshold_matches_contamination() {
        let samples = cluster_with_outliers();
        let forest = IsolationForest::fit(&samples, 0.2, 42);

        let flagged = samples
            .iter()
            .filter(|row| forest.score(row).unwrap().0)
            .count();
        // 100 samples at contamination 0.2: the flagged tail sits near 20
        assert!(
            (10..=30).contains(&flagged),
            "expected ~20 flagged, have {flagged}"
        );
    }

    #[test]
    fn test_untrained_forest_rejects_scoring() {
        let forest = IsolationForest::fit(&[], 0.2, 42);
        assert!(matches!(
            forest.score(&[0.0, 0.0]),
            Err(ScoreError::UntrainedDetector)
        ));
    }

    #[test]
    fn test_wrong_dimension_rejected() {
        let forest = IsolationForest::fit(&cluster_with_outliers(), 0.1, 42);
        assert!(matches!(
            forest.score(&[1.0]),
            Err(ScoreError::FeatureLengthMismatch { expected: 2, have: 1 })
        ));
    }
}
