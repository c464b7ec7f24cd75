//! verba-metrics - Evaluation Metrics for Text Generation
//!
//! Stateful metrics that score generated text against references.
//!
//! # Key Features
//! - Corpus BLEU with configurable n-gram order and smoothing
//! - `13a`, byte, whitespace and character tokenizers
//! - Accumulation across batches with explicit reset
//!
//! # Example
//! ```ignore
//! use verba_metrics::{Bleu, BleuConfig, Metric};
//!
//! let mut bleu = Bleu::new(BleuConfig::default())?;
//! bleu.update_state(
//!     &[["He eats a sweet apple."]],
//!     &["He He He eats sweet apple which is a fruit."],
//! )?;
//! println!("BLEU: {:.3}", bleu.result());
//! ```
//!
//! @version 0.1.0
//! @author `AutomataNexus` Development Team

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod tokenizer;
pub mod metric;
pub mod bleu;

pub use error::{MetricError, MetricResult};
pub use tokenizer::{
    Bleu13aTokenizer, ByteTokenizer, CharTokenizer, Tokenizer, TokenizerKind, WhitespaceTokenizer,
};
pub use metric::Metric;
pub use bleu::{Bleu, BleuConfig};
