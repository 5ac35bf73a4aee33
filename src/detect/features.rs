//! Feature extraction from raw log records.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::Serialize;

use crate::detect::vocab::VocabularyTracker;

/// Number of features the detector is trained on.
pub const FEATURE_COUNT: usize = 6;

/// Keyword tiers for error severity, checked highest first. Matching is a
/// case-insensitive substring test, so multi-word phrases like "core dump"
/// work.
const SEVERITY_TIERS: &[(f64, &[&str])] = &[
    (
        10.0,
        &[
            "critical",
            "fatal",
            "panic",
            "crashed",
            "abort",
            "aborted",
            "killed",
            "segfault",
            "core dump",
        ],
    ),
    (
        8.0,
        &[
            "error",
            "exception",
            "failed",
            "failure",
            "rejected",
            "denied",
            "invalid",
            "forbidden",
            "unauthorized",
        ],
    ),
    (
        6.0,
        &[
            "timeout",
            "unavailable",
            "refused",
            "connection",
            "unreachable",
            "deadlock",
            "conflict",
            "corrupt",
        ],
    ),
    (
        4.0,
        &[
            "warning", "warn", "retry", "retrying", "degraded", "throttle", "throttled",
        ],
    ),
    (2.0, &["deprecated", "slow", "delay", "latency"]),
];

/// Feature vector for a single log record.
///
/// The detector is trained on these six signals:
/// - Length patterns (anomalous messages tend to run long)
/// - Which service emitted the record (hashed into a bucket)
/// - Error keyword severity (0-10 tiers)
/// - Digit density (stack traces, hex dumps, IDs)
/// - Token count
/// - How unusual the words are against the running vocabulary
#[derive(Debug, Default, Clone, Serialize)]
pub struct LogFeatures {
    /// Character count of the message
    pub length: f64,

    /// Stable hash of the service name, reduced mod 1000
    pub service_bucket: f64,

    /// Keyword severity tier: one of 0, 2, 4, 6, 8, 10
    pub error_severity: f64,

    /// Digit characters / message length
    /// Range: [0.0, 1.0]
    pub digit_ratio: f64,

    /// Whitespace-delimited token count
    pub word_count: f64,

    /// Rare-word score from the vocabulary tracker
    /// Range: [0.0, 10.0]
    pub rare_word_score: f64,
}

impl LogFeatures {
    pub fn to_vector(&self) -> Vec<f64> {
        vec![
            self.length,
            self.service_bucket,
            self.error_severity,
            self.digit_ratio,
            self.word_count,
            self.rare_word_score,
        ]
    }
}

/// Extract features for a log record. Reads the vocabulary's current state
/// for the rare-word score but never mutates it.
pub fn extract(message: &str, service: &str, vocabulary: &VocabularyTracker) -> LogFeatures {
    let length = message.chars().count();
    let digits = message.chars().filter(char::is_ascii_digit).count();

    LogFeatures {
        length: length as f64,
        service_bucket: service_bucket(service) as f64,
        error_severity: error_severity(message),
        digit_ratio: digits as f64 / length.max(1) as f64,
        word_count: message.split_whitespace().count() as f64,
        rare_word_score: vocabulary.rarity_score(message),
    }
}

/// Reduce a service name to a stable bucket in [0, 1000).
pub fn service_bucket(service: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    service.hash(&mut hasher);
    hasher.finish() % 1000
}

/// Keyword severity of a message: 0 (clean) to 10 (critical).
/// The highest matching tier wins.
pub fn error_severity(message: &str) -> f64 {
    let lower = message.to_lowercase();
    for (severity, keywords) in SEVERITY_TIERS {
        if keywords.iter().any(|k| lower.contains(k)) {
            return *severity;
        }
    }
    0.0
}
