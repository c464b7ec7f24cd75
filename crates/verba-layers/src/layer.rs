//! Preprocessing Layer Trait
//!
//! Common calling convention of every layer in this crate, plus the seeded
//! generator shared by the random layers.
//!
//! @version 0.1.0
//! @author `AutomataNexus` Development Team

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::error::{LayerError, LayerResult};

// =============================================================================
// PreprocessingLayer Trait
// =============================================================================

/// A stateless-looking transformation over a batch of token sequences.
///
/// Layers that need randomness keep their generator behind a lock, so `call`
/// only needs a shared reference and layers can be shared across threads.
pub trait PreprocessingLayer: Send + Sync {
    /// Batch the layer consumes.
    type Input: ?Sized;
    /// Result of one call.
    type Output;

    /// Applies the layer to `inputs`.
    fn call(&self, inputs: &Self::Input) -> LayerResult<Self::Output>;
}

// =============================================================================
// Randomness
// =============================================================================

/// Generator seeded from `seed`, or from system entropy when absent.
pub(crate) fn seeded_rng(seed: Option<u64>) -> Mutex<StdRng> {
    let rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    Mutex::new(rng)
}

/// Checks that a probability lies in `[0, 1]`.
pub(crate) fn check_rate(name: &str, rate: f64) -> LayerResult<()> {
    if (0.0..=1.0).contains(&rate) {
        Ok(())
    } else {
        Err(LayerError::InvalidConfig(format!(
            "{} must be in [0, 1], got {}",
            name, rate
        )))
    }
}
