//! BLEU Score
//!
//! Corpus-level BLEU: clipped n-gram precisions up to `max_order`, combined
//! by geometric mean and scaled by a brevity penalty. Statistics are summed
//! over every `update_state` call until `reset_state`.
//!
//! @version 0.1.0
//! @author `AutomataNexus` Development Team

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{MetricError, MetricResult};
use crate::metric::Metric;
use crate::tokenizer::{Tokenizer, TokenizerKind};

// =============================================================================
// BleuConfig
// =============================================================================

/// Configuration for [`Bleu`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BleuConfig {
    /// Longest n-gram considered.
    pub max_order: usize,
    /// Add-one smoothing of the precisions.
    pub smooth: bool,
    /// Tokenizer applied to references and predictions.
    pub tokenizer: TokenizerKind,
}

impl Default for BleuConfig {
    fn default() -> Self {
        Self {
            max_order: 4,
            smooth: false,
            tokenizer: TokenizerKind::Bleu13a,
        }
    }
}

impl BleuConfig {
    /// Sets the longest n-gram order.
    pub fn with_max_order(mut self, max_order: usize) -> Self {
        self.max_order = max_order;
        self
    }

    /// Enables or disables smoothing.
    pub fn with_smooth(mut self, smooth: bool) -> Self {
        self.smooth = smooth;
        self
    }

    /// Sets the built-in tokenizer.
    pub fn with_tokenizer(mut self, tokenizer: TokenizerKind) -> Self {
        self.tokenizer = tokenizer;
        self
    }
}

// =============================================================================
// Bleu
// =============================================================================

/// Corpus BLEU metric.
pub struct Bleu {
    config: BleuConfig,
    tokenizer: Box<dyn Tokenizer>,
    matches: Vec<usize>,
    possible: Vec<usize>,
    translation_length: usize,
    reference_length: usize,
}

impl Bleu {
    /// Creates the metric with the configured built-in tokenizer.
    pub fn new(config: BleuConfig) -> MetricResult<Self> {
        let tokenizer = config.tokenizer.build()?;
        Self::with_tokenizer(config, tokenizer)
    }

    /// Creates the metric with a custom tokenizer; `config.tokenizer` is
    /// ignored.
    pub fn with_tokenizer(config: BleuConfig, tokenizer: Box<dyn Tokenizer>) -> MetricResult<Self> {
        if config.max_order == 0 {
            return Err(MetricError::InvalidConfig(
                "max_order must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            config,
            tokenizer,
            matches: vec![0; config.max_order],
            possible: vec![0; config.max_order],
            translation_length: 0,
            reference_length: 0,
        })
    }

    /// The metric configuration.
    pub fn config(&self) -> &BleuConfig {
        &self.config
    }

    /// Accumulates a batch: `y_true[i]` holds the references of `y_pred[i]`.
    pub fn update_state<R, S, P>(&mut self, y_true: &[R], y_pred: &[P]) -> MetricResult<()>
    where
        R: AsRef<[S]>,
        S: AsRef<str>,
        P: AsRef<str>,
    {
        if y_true.len() != y_pred.len() {
            return Err(MetricError::InvalidInput(format!(
                "{} reference sets for {} predictions",
                y_true.len(),
                y_pred.len()
            )));
        }
        for (references, prediction) in y_true.iter().zip(y_pred) {
            self.update_one(references.as_ref(), prediction.as_ref())?;
        }
        Ok(())
    }

    /// Accumulates one prediction against its references.
    pub fn update_one<S: AsRef<str>>(&mut self, references: &[S], prediction: &str) -> MetricResult<()> {
        let max_order = self.config.max_order;
        let references: Vec<Vec<String>> = references
            .iter()
            .map(|reference| self.tokenizer.tokenize(reference.as_ref()))
            .collect();
        let translation = self.tokenizer.tokenize(prediction);

        let shortest = references
            .iter()
            .map(Vec::len)
            .min()
            .ok_or_else(|| MetricError::InvalidInput("prediction without references".to_string()))?;

        let mut merged: HashMap<&[String], usize> = HashMap::new();
        for reference in &references {
            for (ngram, count) in ngram_counts(reference, max_order) {
                let entry = merged.entry(ngram).or_insert(0);
                *entry = (*entry).max(count);
            }
        }
        for (ngram, count) in ngram_counts(&translation, max_order) {
            if let Some(&reference_count) = merged.get(ngram) {
                self.matches[ngram.len() - 1] += count.min(reference_count);
            }
        }
        for order in 1..=max_order {
            if translation.len() >= order {
                self.possible[order - 1] += translation.len() - order + 1;
            }
        }

        self.reference_length += shortest;
        self.translation_length += translation.len();
        trace!(
            translation_length = self.translation_length,
            reference_length = self.reference_length,
            "bleu updated"
        );
        Ok(())
    }

    /// Accumulates the batch and returns the updated score.
    pub fn call<R, S, P>(&mut self, y_true: &[R], y_pred: &[P]) -> MetricResult<f64>
    where
        R: AsRef<[S]>,
        S: AsRef<str>,
        P: AsRef<str>,
    {
        self.update_state(y_true, y_pred)?;
        Ok(self.result())
    }

    /// Modified n-gram precisions, one per order.
    pub fn precisions(&self) -> Vec<f64> {
        self.matches
            .iter()
            .zip(&self.possible)
            .map(|(&matches, &possible)| {
                if self.config.smooth {
                    (matches as f64 + 1.0) / (possible as f64 + 1.0)
                } else if possible > 0 {
                    matches as f64 / possible as f64
                } else {
                    0.0
                }
            })
            .collect()
    }

    /// Brevity penalty for the accumulated lengths.
    pub fn brevity_penalty(&self) -> f64 {
        if self.translation_length == 0 {
            return 0.0;
        }
        let ratio = self.translation_length as f64 / self.reference_length as f64;
        if ratio > 1.0 {
            1.0
        } else {
            (1.0 - 1.0 / ratio).exp()
        }
    }
}

impl Metric for Bleu {
    fn name(&self) -> &str {
        "bleu"
    }

    fn result(&self) -> f64 {
        if self.reference_length == 0 || self.translation_length == 0 {
            return 0.0;
        }
        let precisions = self.precisions();
        if precisions.iter().any(|&p| p <= 0.0) {
            return 0.0;
        }
        let order = self.config.max_order as f64;
        let log_mean: f64 = precisions.iter().map(|p| p.ln() / order).sum();
        log_mean.exp() * self.brevity_penalty()
    }

    fn reset_state(&mut self) {
        self.matches.iter_mut().for_each(|m| *m = 0);
        self.possible.iter_mut().for_each(|p| *p = 0);
        self.translation_length = 0;
        self.reference_length = 0;
    }
}

impl fmt::Debug for Bleu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bleu")
            .field("config", &self.config)
            .field("matches", &self.matches)
            .field("possible", &self.possible)
            .field("translation_length", &self.translation_length)
            .field("reference_length", &self.reference_length)
            .finish()
    }
}

/// Counts of every n-gram of order `1..=max_order`.
fn ngram_counts(tokens: &[String], max_order: usize) -> HashMap<&[String], usize> {
    let mut counts = HashMap::new();
    for order in 1..=max_order {
        for ngram in tokens.windows(order) {
            *counts.entry(ngram).or_insert(0) += 1;
        }
    }
    counts
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn words(text: &str) -> Vec<String> {
        text.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn test_initial_result_is_zero() {
        let bleu = Bleu::new(BleuConfig::default()).unwrap();
        assert_eq!(bleu.result(), 0.0);
        assert_eq!(bleu.name(), "bleu");
    }

    #[test]
    fn test_ngram_counts() {
        let tokens = words("a b a b");
        let counts = ngram_counts(&tokens, 2);
        assert_eq!(counts[&tokens[0..1]], 2);
        assert_eq!(counts[&tokens[0..2]], 2);
        assert_eq!(counts[&tokens[1..3]], 1);
        assert_eq!(counts.len(), 4);
    }

    #[test]
    fn test_identical_sentences_score_one() {
        let mut bleu = Bleu::new(BleuConfig::default()).unwrap();
        let score = bleu
            .call(&[["the cat sat on the mat"]], &["the cat sat on the mat"])
            .unwrap();
        assert_abs_diff_eq!(score, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_matches_are_clipped() {
        let mut bleu = Bleu::new(BleuConfig::default().with_max_order(1)).unwrap();
        bleu.update_one(&["the cat"], "the the the").unwrap();
        assert_eq!(bleu.matches, vec![1]);
        assert_eq!(bleu.possible, vec![3]);
    }

    #[test]
    fn test_brevity_penalty() {
        let mut bleu = Bleu::new(BleuConfig::default().with_max_order(1)).unwrap();
        bleu.update_one(&["a b c d"], "a b").unwrap();
        assert_abs_diff_eq!(bleu.brevity_penalty(), (-1.0f64).exp(), epsilon = 1e-12);
        assert_abs_diff_eq!(bleu.result(), (-1.0f64).exp(), epsilon = 1e-12);
    }

    #[test]
    fn test_shortest_reference_sets_length() {
        let mut bleu = Bleu::new(BleuConfig::default().with_max_order(1)).unwrap();
        bleu.update_one(&["a b c d e", "a b"], "a b c").unwrap();
        assert_eq!(bleu.reference_length, 2);
        assert_eq!(bleu.brevity_penalty(), 1.0);
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(Bleu::new(BleuConfig::default().with_max_order(0)).is_err());
        let mut bleu = Bleu::new(BleuConfig::default()).unwrap();
        assert!(bleu.update_state(&[["a"], ["b"]], &["a"]).is_err());
        let no_references: [&str; 0] = [];
        assert!(bleu.update_one(&no_references, "a").is_err());
    }

    #[test]
    fn test_config_serde() {
        let config = BleuConfig::default()
            .with_max_order(8)
            .with_smooth(true)
            .with_tokenizer(TokenizerKind::Byte);
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(serde_json::from_str::<BleuConfig>(&json).unwrap(), config);

        let partial: BleuConfig = serde_json::from_str(r#"{"smooth": true}"#).unwrap();
        assert_eq!(partial.max_order, 4);
        assert_eq!(partial.tokenizer, TokenizerKind::Bleu13a);
    }
}
