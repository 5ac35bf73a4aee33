//! Running word-frequency vocabulary for rare-word scoring.

use std::collections::HashMap;
use std::sync::RwLock;

/// Word-frequency state observed from live log traffic.
///
/// Counts only grow. All mutation goes through [`observe`](Self::observe),
/// which takes the write lock, so concurrent requests never lose an
/// increment. Readers see a consistent snapshot -- before or after a
/// concurrent observe, never a torn count.
#[derive(Debug, Default)]
pub struct VocabularyTracker {
    counts: RwLock<HashMap<String, u64>>,
}

impl VocabularyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a tracker from persisted counts.
    pub fn from_counts(counts: HashMap<String, u64>) -> Self {
        Self {
            counts: RwLock::new(counts),
        }
    }

    /// Record every word of a message. Lowercased, whitespace-split; new
    /// words start at 1. Call exactly once per incoming record, before
    /// scoring it.
    pub fn observe(&self, message: &str) {
        let mut counts = self.counts.write().expect("vocabulary lock poisoned");
        for word in message.to_lowercase().split_whitespace() {
            *counts.entry(word.to_string()).or_insert(0) += 1;
        }
    }

    /// Rare-word score of a message in [0, 10].
    ///
    /// 0 on an empty vocabulary or an empty message. Otherwise the mean
    /// per-word rarity: unseen words score 10, observed words score
    /// `max(0, 10 - (count / avg) * 100)` where `avg` is mean occurrences
    /// per distinct word. Self-calibrating -- the corpus average moves as
    /// traffic accumulates.
    pub fn rarity_score(&self, message: &str) -> f64 {
        let counts = self.counts.read().expect("vocabulary lock poisoned");
        if counts.is_empty() {
            return 0.0;
        }

        let lower = message.to_lowercase();
        let words: Vec<&str> = lower.split_whitespace().collect();
        if words.is_empty() {
            return 0.0;
        }

        let total: u64 = counts.values().sum();
        let avg = total as f64 / counts.len() as f64;

        let sum: f64 = words
            .iter()
            .map(|word| match counts.get(*word) {
                None => 10.0,
                Some(&count) => (10.0 - (count as f64 / avg) * 100.0).max(0.0),
            })
            .sum();

        (sum / words.len() as f64).clamp(0.0, 10.0)
    }

    /// Number of distinct words observed.
    pub fn distinct_words(&self) -> usize {
        self.counts.read().expect("vocabulary lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.distinct_words() == 0
    }

    /// Copy of the current counts, for persistence.
    pub fn snapshot(&self) -> HashMap<String, u64> {
        self.counts
            .read()
            .expect("vocabulary lock poisoned")
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observe_counts_words() {
        let vocab = VocabularyTracker::new();
        vocab.observe("Error error ERROR");
        let counts = vocab.snapshot();
        assert_eq!(counts.get("error"), Some(&3));
        assert_eq!(vocab.distinct_words(), 1);
    }

    #[test]
    fn test_observe_order_is_commutative() {
        let forward = VocabularyTracker::new();
        forward.observe("a b");
        forward.observe("b c");

        let reverse = VocabularyTracker::new();
        reverse.observe("b c");
        reverse.observe("a b");

        let expected: HashMap<String, u64> = [("a", 1), ("b", 2), ("c", 1)]
            .into_iter()
            .map(|(w, n)| (w.to_string(), n))
            .collect();
        assert_eq!(forward.snapshot(), expected);
        assert_eq!(reverse.snapshot(), expected);
    }

    #[test]
    fn test_rarity_empty_vocabulary_is_zero() {
        let vocab = VocabularyTracker::new();
        assert_eq!(vocab.rarity_score("anything at all"), 0.0);
    }

    #[test]
    fn test_rarity_empty_message_is_zero() {
        let vocab = VocabularyTracker::new();
        vocab.observe("some words");
        assert_eq!(vocab.rarity_score(""), 0.0);
        assert_eq!(vocab.rarity_score("   "), 0.0);
    }

    #[test]
    fn test_unseen_words_score_ten() {
        let vocab = VocabularyTracker::new();
        vocab.observe("the the the the common words");
        assert_eq!(vocab.rarity_score("zxqwv"), 10.0);
    }

    #[test]
    fn test_dominant_words_score_low() {
        let vocab = VocabularyTracker::new();
        // "the" dominates the corpus: count 50 against avg ~ 5.9
        for _ in 0..50 {
            vocab.observe("the");
        }
        for word in ["alpha", "beta", "gamma", "delta", "epsilon", "zeta", "eta", "theta"] {
            vocab.observe(word);
        }
        assert_eq!(vocab.rarity_score("the"), 0.0);
    }

    #[test]
    fn test_rarity_stays_in_range() {
        let vocab = VocabularyTracker::new();
        vocab.observe("request processed successfully");
        vocab.observe("request rejected with status 403");
        for message in [
            "request processed successfully",
            "completely novel tokens everywhere",
            "request",
            "1 2 3 4 5",
        ] {
            let score = vocab.rarity_score(message);
            assert!((0.0..=10.0).contains(&score), "out of range: {score}");
        }
    }

    #[test]
    fn test_concurrent_observe_loses_nothing() {
        use std::sync::Arc;

        let vocab = Arc::new(VocabularyTracker::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let vocab = Arc::clone(&vocab);
            handles.push(std::thread::spawn(move || {
                for _ in 0..100 {
                    vocab.observe("shared word");
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let counts = vocab.snapshot();
        assert_eq!(counts.get("shared"), Some(&800));
        assert_eq!(counts.get("word"), Some(&800));
    }
}
