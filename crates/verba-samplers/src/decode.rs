//! Decoding Loop Controller
//!
//! Drives generation for every selection policy: it validates the call,
//! walks positions `index..length`, asks the policy for one token per row,
//! writes the tokens with masked selects and stops early once every row has
//! emitted a stop token.
//!
//! The number of iterations is `length - index` for every row. Rows that are
//! done keep executing the same writes, they just select their old value.
//!
//! @version 0.1.0
//! @author `AutomataNexus` Development Team

use std::collections::HashSet;

use ndarray::{Array1, Array2, Array3};
use tracing::{debug, trace};

use crate::error::{SamplerError, SamplerResult};
use crate::next::NextTokenFn;
use crate::stop::StopTracker;

// =============================================================================
// SampleOptions
// =============================================================================

/// Per-call arguments of a sampler invocation.
#[derive(Debug, Clone, Default)]
pub struct SampleOptions {
    /// First position to generate.
    pub index: usize,
    /// Tokens that finish a row.
    pub stop_token_ids: Option<HashSet<u32>>,
    /// Positions whose existing value must be kept, shape `[batch, length]`.
    pub mask: Option<Array2<bool>>,
    /// Hidden-state history `[batch, length, hidden_dim]` (contrastive only).
    pub hidden_states: Option<Array3<f32>>,
}

impl SampleOptions {
    /// Options starting at position 0 with no stop tokens.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the first position to generate.
    pub fn with_index(mut self, index: usize) -> Self {
        self.index = index;
        self
    }

    /// Sets the stop tokens.
    pub fn with_stop_token_ids<I: IntoIterator<Item = u32>>(mut self, ids: I) -> Self {
        self.stop_token_ids = Some(ids.into_iter().collect());
        self
    }

    /// Sets the protection mask.
    pub fn with_mask(mut self, mask: Array2<bool>) -> Self {
        self.mask = Some(mask);
        self
    }

    /// Sets the hidden-state history.
    pub fn with_hidden_states(mut self, hidden_states: Array3<f32>) -> Self {
        self.hidden_states = Some(hidden_states);
        self
    }
}

// =============================================================================
// SelectionPolicy
// =============================================================================

/// View of the decode state handed to a policy for one step.
#[derive(Debug, Clone, Copy)]
pub struct StepContext<'a> {
    /// Token buffer as written so far, shape `[batch, length]`.
    pub prompt: &'a Array2<u32>,
    /// Position being generated.
    pub index: usize,
    /// Rows whose value at `index` will be kept regardless of the selection.
    pub frozen: &'a Array1<bool>,
}

impl StepContext<'_> {
    /// Batch dimension of the prompt.
    pub fn batch_size(&self) -> usize {
        self.prompt.nrows()
    }
}

/// A token-selection policy plugged into the shared decoding loop.
pub trait SelectionPolicy<C> {
    /// Policy state carried between the steps of one generation call.
    type State;

    /// Prepares the per-call state before the first step.
    fn begin<N: NextTokenFn<C>>(
        &mut self,
        next: &mut N,
        prompt: &Array2<u32>,
        cache: C,
        index: usize,
        hidden_states: Option<Array3<f32>>,
    ) -> SamplerResult<(Self::State, C)>;

    /// Selects one token per row for position `ctx.index`.
    fn select<N: NextTokenFn<C>>(
        &mut self,
        next: &mut N,
        state: &mut Self::State,
        ctx: &StepContext<'_>,
        cache: C,
    ) -> SamplerResult<(Array1<u32>, C)>;

    /// Runs a full generation call and returns the completed token buffer.
    fn sample<N: NextTokenFn<C>>(
        &mut self,
        mut next: N,
        prompt: Array2<u32>,
        cache: C,
        options: SampleOptions,
    ) -> SamplerResult<Array2<u32>>
    where
        Self: Sized,
    {
        run(self, &mut next, prompt, cache, options)
    }
}

// =============================================================================
// Loop
// =============================================================================

/// Runs the decoding loop for `policy` over positions `options.index..length`.
pub fn run<C, P, N>(
    policy: &mut P,
    next: &mut N,
    prompt: Array2<u32>,
    cache: C,
    options: SampleOptions,
) -> SamplerResult<Array2<u32>>
where
    P: SelectionPolicy<C>,
    N: NextTokenFn<C>,
{
    let SampleOptions {
        index,
        stop_token_ids,
        mask,
        hidden_states,
    } = options;
    let (batch_size, length) = prompt.dim();

    if index >= length {
        return Err(SamplerError::InvalidInput(format!(
            "index {} must be smaller than the prompt length {}",
            index, length
        )));
    }
    if let Some(mask) = &mask {
        if mask.dim() != prompt.dim() {
            return Err(SamplerError::shape_mismatch(
                format!("mask of shape {:?}", prompt.dim()),
                format!("{:?}", mask.dim()),
            ));
        }
    }

    debug!(batch_size, length, index, "starting decode");

    let mut prompt = prompt;
    let mut tracker = StopTracker::new(batch_size, stop_token_ids, mask);
    let (mut state, mut cache) = policy.begin(next, &prompt, cache, index, hidden_states)?;
    let mut steps = 0usize;

    for step in index..length {
        let frozen = tracker.frozen_at(step);
        let ctx = StepContext {
            prompt: &prompt,
            index: step,
            frozen: &frozen,
        };
        let (tokens, next_cache) = policy.select(next, &mut state, &ctx, cache)?;
        cache = next_cache;

        if tokens.len() != batch_size {
            return Err(SamplerError::shape_mismatch(
                format!("{} tokens", batch_size),
                format!("{}", tokens.len()),
            ));
        }

        tracker.commit(&mut prompt, step, tokens.view());
        steps += 1;
        trace!(step, "tokens written");

        if tracker.all_done() {
            debug!(step, "all rows emitted a stop token");
            break;
        }
    }

    debug!(steps, "decode finished");
    Ok(prompt)
}

/// Checks that a next-token call returned one non-empty logit row per
/// prompt row.
pub(crate) fn check_batch(logits: &Array2<f32>, expected: usize) -> SamplerResult<()> {
    if logits.nrows() != expected {
        return Err(SamplerError::shape_mismatch(
            format!("logits with {} rows", expected),
            format!("{} rows", logits.nrows()),
        ));
    }
    if logits.ncols() == 0 {
        return Err(SamplerError::shape_mismatch(
            "logits over a non-empty vocabulary",
            "0 columns",
        ));
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
