//! verba-samplers - Autoregressive Decoding for Language Models
//!
//! This crate drives text generation on top of a caller-supplied next-token
//! function. A shared decoding loop walks the token buffer position by
//! position; a pluggable selection policy decides which token to write.
//!
//! # Key Features
//! - Shared decoding loop with stop tokens, protected positions and early exit
//! - Greedy decoding
//! - Top-P (nucleus) sampling with optional top-k and seeded randomness
//! - Contrastive search with batched beam lookahead
//! - Opaque model caches through the `BeamCache` trait
//!
//! # Example
//! ```ignore
//! use ndarray::Array2;
//! use verba_samplers::{SampleOptions, SamplerResult, SelectionPolicy, StepOutput};
//! use verba_samplers::{TopPConfig, TopPSampler};
//!
//! let mut sampler = TopPSampler::new(TopPConfig::new(0.9).with_seed(42))?;
//! let next = |prompt: &Array2<u32>, cache: (), index: usize| -> SamplerResult<StepOutput<()>> {
//!     let logits = model.forward(prompt, index);
//!     Ok(StepOutput::logits_only(logits, cache))
//! };
//! let output = sampler.sample(next, prompt, (), SampleOptions::new().with_stop_token_ids([eos]))?;
//! ```
//!
//! @version 0.1.0
//! @author `AutomataNexus` Development Team

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod ops;
pub mod next;
pub mod beam;
pub mod stop;
pub mod decode;
pub mod greedy;
pub mod top_p;
pub mod contrastive;
pub mod config;

pub use error::{BoxedError, SamplerError, SamplerResult};
pub use next::{NextTokenFn, StepOutput};
pub use beam::BeamCache;
pub use stop::StopTracker;
pub use decode::{run, SampleOptions, SelectionPolicy, StepContext};
pub use greedy::GreedySampler;
pub use top_p::{TopPConfig, TopPSampler};
pub use contrastive::{ContrastiveConfig, ContrastiveSampler, ContrastiveState};
pub use config::{Sampler, SamplerConfig, SamplerState};

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_configs() {
        let top_p = TopPConfig::default();
        assert_eq!(top_p.p, 0.1);
        assert_eq!(top_p.temperature, 1.0);

        let contrastive = ContrastiveConfig::default();
        assert_eq!(contrastive.k, 5);
        assert_eq!(contrastive.alpha, 0.6);
    }

    #[test]
    fn test_default_sampler_config_is_top_p() {
        assert_eq!(SamplerConfig::default().name(), "top_p");
    }
}
