//! verba-layers - Preprocessing Layers for NLP Pipelines
//!
//! Token-level preprocessing applied before a model sees its inputs.
//!
//! # Key Features
//! - `StartEndPacker`: start/end markers plus fixed-length padding or truncation
//! - `RandomSwap`: swap augmentation with skip lists or predicates
//! - `MaskedLmMaskGenerator`: masked-LM targets with mask/random/keep replacement
//!
//! # Example
//! ```ignore
//! use verba_layers::{PreprocessingLayer, StartEndPacker, StartEndPackerConfig};
//!
//! let packer = StartEndPacker::new(
//!     StartEndPackerConfig::new(6, 0u32)
//!         .with_start_value(vec![1])
//!         .with_end_value(vec![2]),
//! )?;
//! let packed = packer.call(&[vec![5, 6, 7], vec![8, 9, 10, 11]])?;
//! // [[1, 5, 6, 7, 2, 0], [1, 8, 9, 10, 11, 2]]
//! ```
//!
//! @version 0.1.0
//! @author `AutomataNexus` Development Team

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod layer;
pub mod start_end_packer;
pub mod random_swap;
pub mod masked_lm;

pub use error::{LayerError, LayerResult};
pub use layer::PreprocessingLayer;
pub use start_end_packer::{PackOverrides, PackedBatch, StartEndPacker, StartEndPackerConfig};
pub use random_swap::{RandomSwap, SkipRule};
pub use masked_lm::{MaskedLmConfig, MaskedLmMaskGenerator, MaskedLmOutput, MaskedSequence};

// =============================================================================
// Tests
// =============================================================================
