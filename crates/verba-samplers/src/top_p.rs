//! Top-P (Nucleus) Sampling
//!
//! Samples each token from the smallest set of most likely tokens whose
//! cumulative probability reaches `p`, optionally restricted to the `k` most
//! likely tokens first.
//!
//! @version 0.1.0
//! @author `AutomataNexus` Development Team

use ndarray::{Array1, Array2, Array3, ArrayView1, Axis};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::decode::{check_batch, SelectionPolicy, StepContext};
use crate::error::{SamplerError, SamplerResult};
use crate::next::NextTokenFn;
use crate::ops::{ranked_indices, sample_categorical, softmax};

// =============================================================================
// TopPConfig
// =============================================================================

/// Configuration for top-p sampling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopPConfig {
    /// Cumulative probability threshold, in `(0, 1]`.
    pub p: f32,
    /// Optional pre-restriction to the `k` most likely tokens.
    pub k: Option<usize>,
    /// Divides the logits before the softmax.
    pub temperature: f32,
    /// Seed of the sampler-owned random generator; entropy when absent.
    pub seed: Option<u64>,
}

impl Default for TopPConfig {
    fn default() -> Self {
        Self {
            p: 0.1,
            k: None,
            temperature: 1.0,
            seed: None,
        }
    }
}

impl TopPConfig {
    /// Creates a config with threshold `p`.
    pub fn new(p: f32) -> Self {
        Self {
            p,
            ..Default::default()
        }
    }

    /// Restricts sampling to the `k` most likely tokens.
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = Some(k);
        self
    }

    /// Sets the temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Sets the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Checks the parameter ranges.
    pub fn validate(&self) -> SamplerResult<()> {
        if !(self.p > 0.0 && self.p <= 1.0) {
            return Err(SamplerError::InvalidConfig(format!(
                "p must be in (0, 1], got {}",
                self.p
            )));
        }
        if self.k == Some(0) {
            return Err(SamplerError::InvalidConfig(
                "k must be at least 1".to_string(),
            ));
        }
        if !(self.temperature.is_finite() && self.temperature > 0.0) {
            return Err(SamplerError::InvalidConfig(format!(
                "temperature must be a positive finite number, got {}",
                self.temperature
            )));
        }
        Ok(())
    }
}

// =============================================================================
// TopPSampler
// =============================================================================

/// Nucleus sampler with an owned, optionally seeded random generator.
#[derive(Debug, Clone)]
pub struct TopPSampler {
    config: TopPConfig,
    rng: StdRng,
}

impl TopPSampler {
    /// Validates `config` and creates the sampler.
    pub fn new(config: TopPConfig) -> SamplerResult<Self> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self { config, rng })
    }

    /// The validated configuration.
    pub fn config(&self) -> &TopPConfig {
        &self.config
    }

    /// Draws one token per row of `logits`.
    pub fn select_rows(&mut self, logits: &Array2<f32>) -> SamplerResult<Array1<u32>> {
        let vocab_size = logits.ncols();
        if vocab_size == 0 {
            return Err(SamplerError::InvalidInput(
                "logits have an empty vocabulary".to_string(),
            ));
        }
        let limit = match self.config.k {
            Some(k) if k > vocab_size => {
                return Err(SamplerError::InvalidInput(format!(
                    "k = {} exceeds the vocabulary size {}",
                    k, vocab_size
                )))
            }
            Some(k) => k,
            None => vocab_size,
        };

        Ok(logits
            .axis_iter(Axis(0))
            .map(|row| self.draw(row, limit) as u32)
            .collect())
    }

    fn draw(&mut self, logits: ArrayView1<'_, f32>, limit: usize) -> usize {
        let probs = softmax(logits, self.config.temperature);
        let ranked = ranked_indices(probs.view(), limit);

        let mut weights = Vec::with_capacity(ranked.len());
        let mut cumulative = 0.0f32;
        for &id in &ranked {
            if !weights.is_empty() && cumulative >= self.config.p {
                break;
            }
            weights.push(probs[id]);
            cumulative += probs[id];
        }

        let choice = sample_categorical(&weights, &mut self.rng);
        ranked[choice]
    }
}

impl<C> SelectionPolicy<C> for TopPSampler {
    type State = ();

    fn begin<N: NextTokenFn<C>>(
        &mut self,
        _next: &mut N,
        _prompt: &Array2<u32>,
        cache: C,
        _index: usize,
        _hidden_states: Option<Array3<f32>>,
    ) -> SamplerResult<((), C)> {
        Ok(((), cache))
    }

    fn select<N: NextTokenFn<C>>(
        &mut self,
        next: &mut N,
        _state: &mut (),
        ctx: &StepContext<'_>,
        cache: C,
    ) -> SamplerResult<(Array1<u32>, C)> {
        let out = next.call(ctx.prompt, cache, ctx.index)?;
        check_batch(&out.logits, ctx.batch_size())?;
        let tokens = self.select_rows(&out.logits)?;
        Ok((tokens, out.cache))
    }
}

// =============================================================================
// Tests
// =============================================================================
