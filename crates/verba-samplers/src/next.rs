//! Next-token function contract.
//!
//! A next-token function wraps one forward pass of a language model. The
//! decoding loop calls it with the current token buffer, the opaque cache and
//! the position being generated, and receives per-row logits, per-row hidden
//! states and the (possibly updated) cache back.
//!
//! @version 0.1.0
//! @author `AutomataNexus` Development Team

use ndarray::Array2;

use crate::error::SamplerResult;

// =============================================================================
// StepOutput
// =============================================================================

/// Output of a single next-token call.
#[derive(Debug, Clone)]
pub struct StepOutput<C> {
    /// Next-token logits, shape `[batch, vocab_size]`.
    pub logits: Array2<f32>,
    /// Hidden state of the last position, shape `[batch, hidden_dim]`.
    pub hidden_states: Array2<f32>,
    /// Cache to thread into the following call.
    pub cache: C,
}

impl<C> StepOutput<C> {
    /// Creates a step output.
    pub fn new(logits: Array2<f32>, hidden_states: Array2<f32>, cache: C) -> Self {
        Self {
            logits,
            hidden_states,
            cache,
        }
    }

    /// Creates a step output with an empty `[batch, 0]` hidden state.
    ///
    /// Useful for policies that never look at hidden states.
    pub fn logits_only(logits: Array2<f32>, cache: C) -> Self {
        let batch = logits.nrows();
        Self::new(logits, Array2::zeros((batch, 0)), cache)
    }

    /// Batch dimension of the logits.
    pub fn batch_size(&self) -> usize {
        self.logits.nrows()
    }

    /// Vocabulary dimension of the logits.
    pub fn vocab_size(&self) -> usize {
        self.logits.ncols()
    }
}

// =============================================================================
// NextTokenFn
// =============================================================================

/// Caller-supplied next-token prediction function.
///
/// Implementations must tolerate being called many times per generation and,
/// for contrastive search, with a batch dimension multiplied by `k`. Errors
/// are propagated unchanged by the samplers.
///
/// Contrastive search looks one position ahead, so its last call arrives with
/// `index == prompt.ncols()`; `index` must not be used to read `prompt` there.
pub trait NextTokenFn<C> {
    /// Runs one prediction step at position `index`.
    fn call(&mut self, prompt: &Array2<u32>, cache: C, index: usize) -> SamplerResult<StepOutput<C>>;
}

impl<C, F> NextTokenFn<C> for F
where
    F: FnMut(&Array2<u32>, C, usize) -> SamplerResult<StepOutput<C>>,
{
    fn call(&mut self, prompt: &Array2<u32>, cache: C, index: usize) -> SamplerResult<StepOutput<C>> {
        self(prompt, cache, index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logits_only_shapes() {
        let out = StepOutput::logits_only(Array2::<f32>::zeros((3, 26)), ());
        assert_eq!(out.batch_size(), 3);
        assert_eq!(out.vocab_size(), 26);
        assert_eq!(out.hidden_states.dim(), (3, 0));
    }

    #[test]
    fn test_closure_is_next_token_fn() {
        let mut calls = 0;
        let mut next = |prompt: &Array2<u32>, cache: usize, _index: usize| -> SamplerResult<StepOutput<usize>> {
            calls += 1;
            Ok(StepOutput::logits_only(
                Array2::zeros((prompt.nrows(), 4)),
                cache + 1,
            ))
        };
        let prompt = Array2::<u32>::zeros((2, 5));
        let out = next.call(&prompt, 0, 0).unwrap();
        let out = next.call(&prompt, out.cache, 1).unwrap();
        assert_eq!(out.cache, 2);
        assert_eq!(calls, 2);
    }
}
