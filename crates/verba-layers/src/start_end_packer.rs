//! Start/End Packer
//!
//! Adds start and end markers to token sequences and pads or truncates them
//! to a fixed length. Content is truncated first, so end markers survive
//! truncation.
//!
//! @version 0.1.0
//! @author `AutomataNexus` Development Team

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{LayerError, LayerResult};
use crate::layer::PreprocessingLayer;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for [`StartEndPacker`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartEndPackerConfig<T> {
    /// Length of every packed sequence.
    pub sequence_length: usize,
    /// Values prepended to each sequence.
    pub start_value: Vec<T>,
    /// Values appended to each sequence.
    pub end_value: Vec<T>,
    /// Value used to fill short sequences.
    pub pad_value: T,
    /// Whether batch calls also return a padding mask.
    pub return_padding_mask: bool,
}

impl<T> StartEndPackerConfig<T> {
    /// Packs to `sequence_length`, padding with `pad_value`, without markers.
    pub fn new(sequence_length: usize, pad_value: T) -> Self {
        Self {
            sequence_length,
            start_value: Vec::new(),
            end_value: Vec::new(),
            pad_value,
            return_padding_mask: false,
        }
    }

    /// Sets the start markers.
    pub fn with_start_value(mut self, start_value: Vec<T>) -> Self {
        self.start_value = start_value;
        self
    }

    /// Sets the end markers.
    pub fn with_end_value(mut self, end_value: Vec<T>) -> Self {
        self.end_value = end_value;
        self
    }

    /// Requests a padding mask from batch calls.
    pub fn with_padding_mask(mut self, return_padding_mask: bool) -> Self {
        self.return_padding_mask = return_padding_mask;
        self
    }
}

/// Per-call overrides of the packer configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackOverrides {
    /// Replaces the configured sequence length.
    pub sequence_length: Option<usize>,
    /// Whether to prepend the start markers.
    pub add_start_value: bool,
    /// Whether to append the end markers.
    pub add_end_value: bool,
}

impl Default for PackOverrides {
    fn default() -> Self {
        Self {
            sequence_length: None,
            add_start_value: true,
            add_end_value: true,
        }
    }
}

impl PackOverrides {
    /// Overrides the sequence length.
    pub fn sequence_length(mut self, sequence_length: usize) -> Self {
        self.sequence_length = Some(sequence_length);
        self
    }

    /// Skips the start markers.
    pub fn without_start_value(mut self) -> Self {
        self.add_start_value = false;
        self
    }

    /// Skips the end markers.
    pub fn without_end_value(mut self) -> Self {
        self.add_end_value = false;
        self
    }
}

/// Output of a batch call.
#[derive(Debug, Clone, PartialEq)]
pub struct PackedBatch<T> {
    /// Packed sequences, `[batch, sequence_length]`.
    pub values: Array2<T>,
    /// `true` for non-padding positions, when requested.
    pub padding_mask: Option<Array2<bool>>,
}

// =============================================================================
// StartEndPacker
// =============================================================================

/// Adds start/end markers and pads or truncates to a fixed length.
#[derive(Debug, Clone)]
pub struct StartEndPacker<T> {
    config: StartEndPackerConfig<T>,
}

impl<T: Clone> StartEndPacker<T> {
    /// Validates `config` and creates the packer.
    pub fn new(config: StartEndPackerConfig<T>) -> LayerResult<Self> {
        check_length(config.sequence_length)?;
        Ok(Self { config })
    }

    /// The packer configuration.
    pub fn config(&self) -> &StartEndPackerConfig<T> {
        &self.config
    }

    /// Packs a single sequence with the configured settings.
    pub fn pack(&self, sequence: &[T]) -> Vec<T> {
        self.pack_row(sequence, &PackOverrides::default()).0
    }

    /// Packs a single sequence with per-call overrides.
    pub fn pack_with(&self, sequence: &[T], overrides: &PackOverrides) -> LayerResult<Vec<T>> {
        if let Some(length) = overrides.sequence_length {
            check_length(length)?;
        }
        Ok(self.pack_row(sequence, overrides).0)
    }

    /// Packs a batch with per-call overrides.
    pub fn call_with(
        &self,
        batch: &[Vec<T>],
        overrides: &PackOverrides,
    ) -> LayerResult<PackedBatch<T>> {
        let length = overrides
            .sequence_length
            .unwrap_or(self.config.sequence_length);
        check_length(length)?;

        let mut values = Vec::with_capacity(batch.len() * length);
        let mut mask = Vec::with_capacity(batch.len() * length);
        for sequence in batch {
            let (row, filled) = self.pack_row(sequence, overrides);
            values.extend(row);
            mask.extend((0..length).map(|i| i < filled));
        }
        trace!(batch_size = batch.len(), length, "packed batch");

        let values = Array2::from_shape_vec((batch.len(), length), values)?;
        let padding_mask = if self.config.return_padding_mask {
            Some(Array2::from_shape_vec((batch.len(), length), mask)?)
        } else {
            None
        };
        Ok(PackedBatch {
            values,
            padding_mask,
        })
    }

    /// Packs one row; also returns the number of non-padding positions.
    fn pack_row(&self, sequence: &[T], overrides: &PackOverrides) -> (Vec<T>, usize) {
        let length = overrides
            .sequence_length
            .unwrap_or(self.config.sequence_length);
        let start: &[T] = if overrides.add_start_value {
            &self.config.start_value
        } else {
            &[]
        };
        let end: &[T] = if overrides.add_end_value {
            &self.config.end_value
        } else {
            &[]
        };

        let room = length.saturating_sub(start.len() + end.len());
        let content = &sequence[..sequence.len().min(room)];

        let mut row: Vec<T> = start
            .iter()
            .chain(content)
            .chain(end)
            .take(length)
            .cloned()
            .collect();
        let filled = row.len();
        row.resize(length, self.config.pad_value.clone());
        (row, filled)
    }
}

impl<T: Clone + Send + Sync> PreprocessingLayer for StartEndPacker<T> {
    type Input = [Vec<T>];
    type Output = PackedBatch<T>;

    fn call(&self, inputs: &[Vec<T>]) -> LayerResult<PackedBatch<T>> {
        self.call_with(inputs, &PackOverrides::default())
    }
}

fn check_length(sequence_length: usize) -> LayerResult<()> {
    if sequence_length == 0 {
        return Err(LayerError::InvalidConfig(
            "sequence_length must be at least 1".to_string(),
        ));
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn packer(length: usize) -> StartEndPacker<u32> {
        StartEndPacker::new(StartEndPackerConfig::new(length, 0)).unwrap()
    }

    #[test]
    fn test_dense_input() {
        assert_eq!(packer(5).pack(&[5, 6, 7]), vec![5, 6, 7, 0, 0]);
    }

    #[test]
    fn test_ragged_batch() {
        let output = packer(5).call(&[vec![5, 6, 7], vec![8, 9, 10, 11]]).unwrap();
        assert_eq!(output.values, array![[5, 6, 7, 0, 0], [8, 9, 10, 11, 0]]);
        assert!(output.padding_mask.is_none());
    }

    #[test]
    fn test_start_end_values() {
        let packer = StartEndPacker::new(
            StartEndPackerConfig::new(6, 0)
                .with_start_value(vec![1])
                .with_end_value(vec![2]),
        )
        .unwrap();
        let output = packer.call(&[vec![5, 6, 7], vec![8, 9, 10, 11]]).unwrap();
        assert_eq!(output.values, array![[1, 5, 6, 7, 2, 0], [1, 8, 9, 10, 11, 2]]);
    }

    #[test]
    fn test_multiple_start_end_values() {
        let packer = StartEndPacker::new(
            StartEndPackerConfig::new(8, 0)
                .with_start_value(vec![1, 2])
                .with_end_value(vec![3, 4]),
        )
        .unwrap();
        let output = packer
            .call(&[vec![5, 6, 7], vec![8, 9, 10, 11, 12, 13]])
            .unwrap();
        assert_eq!(
            output.values,
            array![[1, 2, 5, 6, 7, 3, 4, 0], [1, 2, 8, 9, 10, 11, 3, 4]]
        );
    }

    #[test]
    fn test_end_value_survives_truncation() {
        let packer = StartEndPacker::new(
            StartEndPackerConfig::new(5, 0)
                .with_start_value(vec![1])
                .with_end_value(vec![2]),
        )
        .unwrap();
        let output = packer.call(&[vec![5, 6], vec![8, 9, 10, 11, 12, 13]]).unwrap();
        assert_eq!(output.values, array![[1, 5, 6, 2, 0], [1, 8, 9, 10, 2]]);
    }

    #[test]
    fn test_padding_value_and_mask() {
        let packer = StartEndPacker::new(
            StartEndPackerConfig::new(7, 3)
                .with_start_value(vec![1])
                .with_end_value(vec![2])
                .with_padding_mask(true),
        )
        .unwrap();
        let output = packer.call(&[vec![5, 6, 7], vec![8, 9, 10, 11]]).unwrap();
        assert_eq!(output.values, array![[1, 5, 6, 7, 2, 3, 3], [1, 8, 9, 10, 11, 2, 3]]);
        assert_eq!(
            output.padding_mask.unwrap(),
            array![
                [true, true, true, true, true, false, false],
                [true, true, true, true, true, true, false]
            ]
        );
    }

    #[test]
    fn test_call_overrides() {
        let packer = StartEndPacker::new(
            StartEndPackerConfig::new(4, 0)
                .with_start_value(vec![1])
                .with_end_value(vec![2]),
        )
        .unwrap();
        let x = [5, 6, 7];
        assert_eq!(packer.pack(&x), vec![1, 5, 6, 2]);
        let no_start = PackOverrides::default().without_start_value();
        assert_eq!(packer.pack_with(&x, &no_start).unwrap(), vec![5, 6, 7, 2]);
        let no_end = PackOverrides::default().without_end_value();
        assert_eq!(packer.pack_with(&x, &no_end).unwrap(), vec![1, 5, 6, 7]);
        let short = PackOverrides::default().sequence_length(2);
        assert_eq!(packer.pack_with(&x, &short).unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_markers_longer_than_sequence_are_truncated() {
        let packer = StartEndPacker::new(
            StartEndPackerConfig::new(2, 0).with_start_value(vec![1, 2, 3]),
        )
        .unwrap();
        assert_eq!(packer.pack(&[9]), vec![1, 2]);
    }

    #[test]
    fn test_zero_length_is_rejected() {
        assert!(StartEndPacker::new(StartEndPackerConfig::new(0, 0u32)).is_err());
        let zero = PackOverrides::default().sequence_length(0);
        assert!(packer(3).pack_with(&[1], &zero).is_err());
    }

    #[test]
    fn test_config_serde() {
        let config = StartEndPackerConfig::new(512, 100u32)
            .with_start_value(vec![10])
            .with_end_value(vec![20]);
        let json = serde_json::to_string(&config).unwrap();
        let back: StartEndPackerConfig<u32> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
