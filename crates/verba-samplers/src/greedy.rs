//! Greedy selection: the most likely token of every row.
//!
//! @version 0.1.0
//! @author `AutomataNexus` Development Team

use ndarray::{Array1, Array2, Array3, Axis};

use crate::decode::{check_batch, SelectionPolicy, StepContext};
use crate::error::SamplerResult;
use crate::next::NextTokenFn;
use crate::ops::argmax;

/// Picks the argmax of the logits at every step, lowest id on ties.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GreedySampler;

impl GreedySampler {
    /// Creates a greedy sampler.
    pub fn new() -> Self {
        Self
    }

    /// Argmax over the last axis of `logits`.
    pub fn select_rows(logits: &Array2<f32>) -> Array1<u32> {
        logits
            .axis_iter(Axis(0))
            .map(|row| argmax(row) as u32)
            .collect()
    }
}

impl<C> SelectionPolicy<C> for GreedySampler {
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
        Ok((Self::select_rows(&out.logits), out.cache))
    }
}
