//! # Verba - NLP Building Blocks in Pure Rust
//!
//! Verba bundles the pieces around a language model that are not the model
//! itself:
//!
//! ## Features
//!
//! - **Samplers**: a shared autoregressive decoding loop with greedy, top-p
//!   and contrastive token selection, stop tokens and protected positions
//! - **Layers**: start/end packing, random swap augmentation and masked-LM
//!   mask generation
//! - **Metrics**: corpus BLEU with the `13a` tokenizer
//!
//! # Quick Start
//!
//! ```ignore
//! use verba::prelude::*;
//!
//! let packer = StartEndPacker::new(StartEndPackerConfig::new(16, 0u32).with_start_value(vec![1]))?;
//! let prompt = packer.call(&[prompt_ids])?.values;
//!
//! let mut sampler = Sampler::from_config(SamplerConfig::TopP(TopPConfig::new(0.9).with_seed(7)))?;
//! let output = sampler.sample(next, prompt, cache, SampleOptions::new().with_index(prompt_len))?;
//!
//! let mut bleu = Bleu::new(BleuConfig::default())?;
//! let score = bleu.call(&references, &detokenized)?;
//! ```
//!
//! # Feature Flags
//!
//! - `full` (default): All features enabled
//! - `samplers`: Decoding loop and selection policies
//! - `layers`: Preprocessing layers
//! - `metrics`: Evaluation metrics
//!
//! @version 0.1.0
//! @author `AutomataNexus` Development Team

#![warn(missing_docs)]
#![warn(clippy::all)]

// =============================================================================
// Re-exports
// =============================================================================

#[cfg(feature = "samplers")]
pub use verba_samplers as samplers;

#[cfg(feature = "layers")]
pub use verba_layers as layers;

#[cfg(feature = "metrics")]
pub use verba_metrics as metrics;

// =============================================================================
// Prelude
// =============================================================================

/// Common imports for generation pipelines.
///
/// ```ignore
/// use verba::prelude::*;
/// ```
pub mod prelude {
    // Samplers
    #[cfg(feature = "samplers")]
    pub use verba_samplers::{
        run, BeamCache, ContrastiveConfig, ContrastiveSampler, GreedySampler, NextTokenFn,
        SampleOptions, Sampler, SamplerConfig, SamplerError, SamplerResult, SelectionPolicy,
        StepOutput, TopPConfig, TopPSampler,
    };

    // Layers
    #[cfg(feature = "layers")]
    pub use verba_layers::{
        LayerError, LayerResult, MaskedLmConfig, MaskedLmMaskGenerator, PackOverrides,
        PreprocessingLayer, RandomSwap, SkipRule, StartEndPacker, StartEndPackerConfig,
    };

    // Metrics
    #[cfg(feature = "metrics")]
    pub use verba_metrics::{
        Bleu, BleuConfig, Metric, MetricError, MetricResult, Tokenizer, TokenizerKind,
    };
}

// =============================================================================
// Version Information
// =============================================================================

/// Returns the version of Verba.
#[must_use]
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Returns a string describing the enabled features.
#[must_use]
pub fn features() -> String {
    let mut features: Vec<&str> = Vec::new();

    #[cfg(feature = "samplers")]
    features.push("samplers");

    #[cfg(feature = "layers")]
    features.push("layers");

    #[cfg(feature = "metrics")]
    features.push("metrics");

    if features.is_empty() {
        "none".to_string()
    } else {
        features.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert_eq!(version(), "0.1.0");
    }

    #[test]
    #[cfg(feature = "full")]
    fn test_default_features() {
        assert_eq!(features(), "samplers, layers, metrics");
    }
}
