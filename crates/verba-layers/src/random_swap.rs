//! Random Swap Augmentation
//!
//! Augments token sequences by swapping randomly chosen tokens with each
//! other, as in EDA-style text augmentation. Inputs are pre-split, so the
//! granularity (words, characters, ids) is up to the caller.
//!
//! @version 0.1.0
//! @author `AutomataNexus` Development Team

use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::{Binomial, Distribution};
use tracing::trace;

use crate::error::{LayerError, LayerResult};
use crate::layer::{check_rate, seeded_rng, PreprocessingLayer};

// =============================================================================
// SkipRule
// =============================================================================

/// Tokens that never take part in a swap.
pub enum SkipRule<T> {
    /// Every token is a candidate.
    Nothing,
    /// Tokens contained in the set are skipped.
    List(HashSet<T>),
    /// Tokens for which the predicate returns `true` are skipped.
    Predicate(Box<dyn Fn(&T) -> bool + Send + Sync>),
}

impl<T: Eq + Hash> SkipRule<T> {
    /// Skips every token in `tokens`.
    pub fn list<I: IntoIterator<Item = T>>(tokens: I) -> Self {
        SkipRule::List(tokens.into_iter().collect())
    }

    /// Skips tokens matching `predicate`.
    pub fn predicate<F>(predicate: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        SkipRule::Predicate(Box::new(predicate))
    }

    fn skips(&self, token: &T) -> bool {
        match self {
            SkipRule::Nothing => false,
            SkipRule::List(tokens) => tokens.contains(token),
            SkipRule::Predicate(predicate) => predicate(token),
        }
    }
}

impl<T> Default for SkipRule<T> {
    fn default() -> Self {
        SkipRule::Nothing
    }
}

impl<T: fmt::Debug> fmt::Debug for SkipRule<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipRule::Nothing => f.write_str("Nothing"),
            SkipRule::List(tokens) => f.debug_tuple("List").field(tokens).finish(),
            SkipRule::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

// =============================================================================
// RandomSwap
// =============================================================================

/// Randomly swaps tokens within each sequence.
pub struct RandomSwap<T> {
    rate: f64,
    max_swaps: Option<usize>,
    skip: SkipRule<T>,
    rng: Mutex<StdRng>,
}

impl<T: Clone + Eq + Hash> RandomSwap<T> {
    /// Creates the layer. Each candidate token takes part in a swap with
    /// probability `rate`.
    pub fn new(rate: f64) -> LayerResult<Self> {
        check_rate("rate", rate)?;
        Ok(Self {
            rate,
            max_swaps: None,
            skip: SkipRule::Nothing,
            rng: seeded_rng(None),
        })
    }

    /// Caps the number of swaps per sequence.
    pub fn with_max_swaps(mut self, max_swaps: usize) -> Self {
        self.max_swaps = Some(max_swaps);
        self
    }

    /// Sets the tokens that never move.
    pub fn with_skip(mut self, skip: SkipRule<T>) -> Self {
        self.skip = skip;
        self
    }

    /// Reseeds the generator.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = seeded_rng(Some(seed));
        self
    }

    /// Swap probability per candidate token.
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Augments a single sequence.
    pub fn swap_sequence(&self, sequence: &[T]) -> LayerResult<Vec<T>> {
        let candidates: Vec<usize> = sequence
            .iter()
            .enumerate()
            .filter(|(_, token)| !self.skip.skips(token))
            .map(|(position, _)| position)
            .collect();

        let mut output = sequence.to_vec();
        if candidates.is_empty() {
            return Ok(output);
        }

        let binomial = Binomial::new(candidates.len() as u64, self.rate)
            .map_err(|e| LayerError::InvalidConfig(e.to_string()))?;

        let mut rng = self.rng.lock();
        let mut swaps = binomial.sample(&mut *rng) as usize;
        if let Some(max_swaps) = self.max_swaps {
            swaps = swaps.min(max_swaps);
        }
        swaps = swaps.min(candidates.len());

        for _ in 0..swaps {
            let first = candidates[rng.gen_range(0..candidates.len())];
            let second = candidates[rng.gen_range(0..candidates.len())];
            output.swap(first, second);
        }
        trace!(candidates = candidates.len(), swaps, "swapped tokens");
        Ok(output)
    }
}

impl<T: Clone + Eq + Hash + Send + Sync> PreprocessingLayer for RandomSwap<T> {
    type Input = [Vec<T>];
    type Output = Vec<Vec<T>>;

    fn call(&self, inputs: &[Vec<T>]) -> LayerResult<Vec<Vec<T>>> {
        inputs
            .iter()
            .map(|sequence| self.swap_sequence(sequence))
            .collect()
    }
}

impl<T: fmt::Debug> fmt::Debug for RandomSwap<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RandomSwap")
            .field("rate", &self.rate)
            .field("max_swaps", &self.max_swaps)
            .field("skip", &self.skip)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
