//! Contrastive Search
//!
//! Picks, among the `k` most likely next tokens, the one that balances model
//! confidence against a degeneration penalty: the maximum cosine similarity
//! between the candidate's hidden state and the hidden states of the tokens
//! already generated. Each step runs one batched lookahead call with the `k`
//! candidates expanded as beams.
//!
//! Protocol per generation call:
//! - `begin` calls `next(prompt, cache, index)` once to obtain the logits for
//!   the first position.
//! - every step expands prompt and cache to `batch * k` rows, calls
//!   `next(beams, cache_beams, index + 1)`, scores the candidates and keeps
//!   the chosen beam's logits, hidden state and cache for the following step.
//!
//! @version 0.1.0
//! @author `AutomataNexus` Development Team

use ndarray::{s, Array1, Array2, Array3, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::beam::{chosen_rows, BeamCache};
use crate::decode::{check_batch, SelectionPolicy, StepContext};
use crate::error::{SamplerError, SamplerResult};
use crate::next::NextTokenFn;
use crate::ops::{argmax, cosine_similarity, ranked_indices, softmax};

// =============================================================================
// ContrastiveConfig
// =============================================================================

/// Configuration for contrastive search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContrastiveConfig {
    /// Number of candidates evaluated per step.
    pub k: usize,
    /// Weight of the degeneration penalty, expected in `[0, 1]`.
    pub alpha: f32,
    /// Divides the logits before the softmax.
    pub temperature: f32,
}

impl Default for ContrastiveConfig {
    fn default() -> Self {
        Self {
            k: 5,
            alpha: 0.6,
            temperature: 1.0,
        }
    }
}

impl ContrastiveConfig {
    /// Creates a config with `k` candidates and penalty weight `alpha`.
    pub fn new(k: usize, alpha: f32) -> Self {
        Self {
            k,
            alpha,
            ..Default::default()
        }
    }

    /// Sets the temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Checks the parameter ranges.
    ///
    /// `alpha` is not rejected; values outside `[0, 1]` only log a warning.
    pub fn validate(&self) -> SamplerResult<()> {
        if self.k == 0 {
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
        if !(0.0..=1.0).contains(&self.alpha) {
            warn!(alpha = self.alpha, "contrastive alpha outside [0, 1]");
        }
        Ok(())
    }
}

// =============================================================================
// ContrastiveState
// =============================================================================

/// Decode state carried between contrastive steps.
#[derive(Debug, Clone)]
pub struct ContrastiveState {
    /// Logits for the position about to be generated, `[batch, vocab_size]`.
    pub logits: Array2<f32>,
    /// Hidden-state history, `[batch, length, hidden_dim]`.
    pub hidden_states: Array3<f32>,
}

/// Top-`k` candidates of every row with their renormalized probabilities.
struct Candidates {
    ids: Array2<u32>,
    confidence: Array2<f32>,
}

// =============================================================================
// ContrastiveSampler
// =============================================================================

/// Contrastive search policy.
#[derive(Debug, Clone)]
pub struct ContrastiveSampler {
    config: ContrastiveConfig,
}

impl ContrastiveSampler {
    /// Validates `config` and creates the sampler.
    pub fn new(config: ContrastiveConfig) -> SamplerResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The validated configuration.
    pub fn config(&self) -> &ContrastiveConfig {
        &self.config
    }

    fn candidates(&self, logits: &Array2<f32>, ctx: &StepContext<'_>) -> SamplerResult<Candidates> {
        let k = self.config.k;
        let (batch_size, vocab_size) = logits.dim();
        if k > vocab_size {
            return Err(SamplerError::InvalidInput(format!(
                "k = {} exceeds the vocabulary size {}",
                k, vocab_size
            )));
        }

        let mut ids = Array2::zeros((batch_size, k));
        let mut confidence = Array2::zeros((batch_size, k));
        for (b, row) in logits.axis_iter(Axis(0)).enumerate() {
            let probs = softmax(row, self.config.temperature);
            let ranked = ranked_indices(probs.view(), k);
            let total: f32 = ranked.iter().map(|&id| probs[id]).sum();
            let existing = ctx.prompt[[b, ctx.index]];

            for (j, &id) in ranked.iter().enumerate() {
                ids[[b, j]] = if ctx.frozen[b] { existing } else { id as u32 };
                confidence[[b, j]] = if total > 0.0 {
                    probs[id] / total
                } else {
                    1.0 / k as f32
                };
            }
        }
        Ok(Candidates { ids, confidence })
    }

    /// Maximum cosine similarity between `candidate` and the hidden states of
    /// positions `0..index` of `row`; 0 when there is no history.
    fn degeneration_penalty(
        history: &Array3<f32>,
        row: usize,
        index: usize,
        candidate: ArrayView1<'_, f32>,
    ) -> f32 {
        if index == 0 {
            return 0.0;
        }
        history
            .slice(s![row, ..index, ..])
            .axis_iter(Axis(0))
            .map(|past| cosine_similarity(candidate, past))
            .fold(f32::NEG_INFINITY, f32::max)
    }
}

impl<C: BeamCache> SelectionPolicy<C> for ContrastiveSampler {
    type State = ContrastiveState;

    fn begin<N: NextTokenFn<C>>(
        &mut self,
        next: &mut N,
        prompt: &Array2<u32>,
        cache: C,
        index: usize,
        hidden_states: Option<Array3<f32>>,
    ) -> SamplerResult<(ContrastiveState, C)> {
        let (batch_size, length) = prompt.dim();
        let out = next.call(prompt, cache, index)?;
        check_batch(&out.logits, batch_size)?;
        if out.hidden_states.nrows() != batch_size {
            return Err(SamplerError::shape_mismatch(
                format!("hidden states with {} rows", batch_size),
                format!("{} rows", out.hidden_states.nrows()),
            ));
        }
        let hidden_dim = out.hidden_states.ncols();

        let hidden_states = match hidden_states {
            Some(hidden) => {
                if hidden.dim() != (batch_size, length, hidden_dim) {
                    return Err(SamplerError::shape_mismatch(
                        format!("hidden states of shape {:?}", (batch_size, length, hidden_dim)),
                        format!("{:?}", hidden.dim()),
                    ));
                }
                hidden
            }
            None => Array3::zeros((batch_size, length, hidden_dim)),
        };

        Ok((
            ContrastiveState {
                logits: out.logits,
                hidden_states,
            },
            out.cache,
        ))
    }

    fn select<N: NextTokenFn<C>>(
        &mut self,
        next: &mut N,
        state: &mut ContrastiveState,
        ctx: &StepContext<'_>,
        cache: C,
    ) -> SamplerResult<(Array1<u32>, C)> {
        let k = self.config.k;
        let alpha = self.config.alpha;
        let batch_size = ctx.batch_size();
        let index = ctx.index;
        let hidden_dim = state.hidden_states.len_of(Axis(2));

        let candidates = self.candidates(&state.logits, ctx)?;

        let mut prompt_beams = ctx.prompt.clone().expand_beams(k)?;
        for ((b, j), &id) in candidates.ids.indexed_iter() {
            prompt_beams[[b * k + j, index]] = id;
        }
        let cache_beams = cache.expand_beams(k)?;

        let out = next.call(&prompt_beams, cache_beams, index + 1)?;
        check_batch(&out.logits, batch_size * k)?;
        if out.hidden_states.dim() != (batch_size * k, hidden_dim) {
            return Err(SamplerError::shape_mismatch(
                format!("hidden states of shape {:?}", (batch_size * k, hidden_dim)),
                format!("{:?}", out.hidden_states.dim()),
            ));
        }

        let chosen: Vec<usize> = (0..batch_size)
            .map(|b| {
                let scores: Array1<f32> = (0..k)
                    .map(|j| {
                        let penalty = Self::degeneration_penalty(
                            &state.hidden_states,
                            b,
                            index,
                            out.hidden_states.row(b * k + j),
                        );
                        (1.0 - alpha) * candidates.confidence[[b, j]] - alpha * penalty
                    })
                    .collect();
                argmax(scores.view())
            })
            .collect();

        let rows = chosen_rows(k, &chosen)?;
        for (b, &row) in rows.iter().enumerate() {
            state
                .hidden_states
                .slice_mut(s![b, index, ..])
                .assign(&out.hidden_states.row(row));
        }
        state.logits = out.logits.select(Axis(0), &rows);
        let cache = out.cache.select_beams(k, &chosen)?;

        let tokens: Array1<u32> = chosen
            .iter()
            .enumerate()
            .map(|(b, &j)| candidates.ids[[b, j]])
            .collect();
        Ok((tokens, cache))
    }
}

// =============================================================================
// Tests
// =============================================================================
