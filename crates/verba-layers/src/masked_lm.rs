//! Masked Language Model Mask Generator
//!
//! Selects positions of a token sequence for a masked-LM objective and
//! replaces them with a mask token, a random token, or leaves them unchanged.
//! The selected positions, their original ids and their weights are returned
//! padded to a fixed length so batches stack into dense arrays.
//!
//! @version 0.1.0
//! @author `AutomataNexus` Development Team

use std::collections::HashSet;

use ndarray::Array2;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{LayerError, LayerResult};
use crate::layer::{check_rate, seeded_rng, PreprocessingLayer};

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for [`MaskedLmMaskGenerator`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskedLmConfig {
    /// Size of the vocabulary random replacements are drawn from.
    pub vocabulary_size: u32,
    /// Probability of selecting each selectable token.
    pub mask_selection_rate: f64,
    /// Maximum number of selected positions per sequence.
    pub mask_selection_length: usize,
    /// Id written over selected tokens.
    pub mask_token_id: u32,
    /// Ids that are never selected.
    pub unselectable_token_ids: Vec<u32>,
    /// Probability of replacing a selected token with the mask token.
    pub mask_token_rate: f64,
    /// Probability of replacing a selected token with a random token.
    pub random_token_rate: f64,
    /// Generator seed; entropy when absent.
    pub seed: Option<u64>,
}

impl MaskedLmConfig {
    /// Creates a config with the usual 80/10/10 replacement split and id 0
    /// unselectable.
    pub fn new(
        vocabulary_size: u32,
        mask_selection_rate: f64,
        mask_selection_length: usize,
        mask_token_id: u32,
    ) -> Self {
        Self {
            vocabulary_size,
            mask_selection_rate,
            mask_selection_length,
            mask_token_id,
            unselectable_token_ids: vec![0],
            mask_token_rate: 0.8,
            random_token_rate: 0.1,
            seed: None,
        }
    }

    /// Sets the ids that are never selected.
    pub fn with_unselectable_token_ids(mut self, ids: Vec<u32>) -> Self {
        self.unselectable_token_ids = ids;
        self
    }

    /// Sets the mask and random replacement probabilities.
    pub fn with_replacement_rates(mut self, mask_token_rate: f64, random_token_rate: f64) -> Self {
        self.mask_token_rate = mask_token_rate;
        self.random_token_rate = random_token_rate;
        self
    }

    /// Sets the generator seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Checks ids and rates.
    pub fn validate(&self) -> LayerResult<()> {
        if self.mask_token_id >= self.vocabulary_size {
            return Err(LayerError::InvalidConfig(format!(
                "Mask token id should be in range [0, vocabulary_size - 1], got mask_token_id={} and vocabulary_size={}",
                self.mask_token_id, self.vocabulary_size
            )));
        }
        check_rate("mask_selection_rate", self.mask_selection_rate)?;
        check_rate("mask_token_rate", self.mask_token_rate)?;
        check_rate("random_token_rate", self.random_token_rate)?;
        if self.mask_token_rate + self.random_token_rate > 1.0 {
            return Err(LayerError::InvalidConfig(format!(
                "mask_token_rate + random_token_rate must be at most 1, got {}",
                self.mask_token_rate + self.random_token_rate
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Outputs
// =============================================================================

/// Masking result for one sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskedSequence {
    /// Input ids with the selected positions replaced.
    pub token_ids: Vec<u32>,
    /// Selected positions, ascending, padded with 0.
    pub mask_positions: Vec<usize>,
    /// Original ids at the selected positions, padded with 0.
    pub mask_ids: Vec<u32>,
    /// 1.0 for real selections, 0.0 for padding.
    pub mask_weights: Vec<f32>,
}

/// Masking result for a batch. `token_ids` keeps the ragged input lengths.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskedLmOutput {
    /// Input ids with the selected positions replaced.
    pub token_ids: Vec<Vec<u32>>,
    /// `[batch, mask_selection_length]`
    pub mask_positions: Array2<usize>,
    /// `[batch, mask_selection_length]`
    pub mask_ids: Array2<u32>,
    /// `[batch, mask_selection_length]`
    pub mask_weights: Array2<f32>,
}

// =============================================================================
// MaskedLmMaskGenerator
// =============================================================================

/// Generates masked-LM training targets.
#[derive(Debug)]
pub struct MaskedLmMaskGenerator {
    config: MaskedLmConfig,
    unselectable: HashSet<u32>,
    rng: Mutex<StdRng>,
}

impl MaskedLmMaskGenerator {
    /// Validates `config` and creates the generator.
    pub fn new(config: MaskedLmConfig) -> LayerResult<Self> {
        config.validate()?;
        let unselectable = config.unselectable_token_ids.iter().copied().collect();
        let rng = seeded_rng(config.seed);
        Ok(Self {
            config,
            unselectable,
            rng,
        })
    }

    /// The generator configuration.
    pub fn config(&self) -> &MaskedLmConfig {
        &self.config
    }

    /// Masks a single sequence.
    pub fn mask_sequence(&self, token_ids: &[u32]) -> MaskedSequence {
        let config = &self.config;
        let mut rng = self.rng.lock();

        let mut positions: Vec<usize> = Vec::new();
        for (position, token) in token_ids.iter().enumerate() {
            if !self.unselectable.contains(token) && rng.gen_bool(config.mask_selection_rate) {
                positions.push(position);
            }
        }
        if positions.len() > config.mask_selection_length {
            positions.shuffle(&mut *rng);
            positions.truncate(config.mask_selection_length);
            positions.sort_unstable();
        }

        let mut masked = token_ids.to_vec();
        let mut mask_ids = Vec::with_capacity(config.mask_selection_length);
        for &position in &positions {
            mask_ids.push(token_ids[position]);
            let draw: f64 = rng.gen();
            if draw < config.mask_token_rate {
                masked[position] = config.mask_token_id;
            } else if draw < config.mask_token_rate + config.random_token_rate {
                masked[position] = rng.gen_range(0..config.vocabulary_size);
            }
        }

        let selected = positions.len();
        let mut mask_weights = vec![1.0f32; selected];
        positions.resize(config.mask_selection_length, 0);
        mask_ids.resize(config.mask_selection_length, 0);
        mask_weights.resize(config.mask_selection_length, 0.0);
        trace!(length = token_ids.len(), selected, "generated mask");

        MaskedSequence {
            token_ids: masked,
            mask_positions: positions,
            mask_ids,
            mask_weights,
        }
    }
}

impl PreprocessingLayer for MaskedLmMaskGenerator {
    type Input = [Vec<u32>];
    type Output = MaskedLmOutput;

    fn call(&self, inputs: &[Vec<u32>]) -> LayerResult<MaskedLmOutput> {
        let width = self.config.mask_selection_length;
        let mut token_ids = Vec::with_capacity(inputs.len());
        let mut positions = Vec::with_capacity(inputs.len() * width);
        let mut ids = Vec::with_capacity(inputs.len() * width);
        let mut weights = Vec::with_capacity(inputs.len() * width);

        for sequence in inputs {
            let masked = self.mask_sequence(sequence);
            token_ids.push(masked.token_ids);
            positions.extend(masked.mask_positions);
            ids.extend(masked.mask_ids);
            weights.extend(masked.mask_weights);
        }

        let shape = (inputs.len(), width);
        Ok(MaskedLmOutput {
            token_ids,
            mask_positions: Array2::from_shape_vec(shape, positions)?,
            mask_ids: Array2::from_shape_vec(shape, ids)?,
            mask_weights: Array2::from_shape_vec(shape, weights)?,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
