//! Stop and mask bookkeeping.
//!
//! Tracks which rows have emitted a stop token and which positions are
//! protected from being overwritten. All updates are masked selects over the
//! batch, so every row executes the same instructions regardless of state.
//!
//! @version 0.1.0
//! @author `AutomataNexus` Development Team

use std::collections::HashSet;

use ndarray::{Array1, Array2, ArrayView1, Zip};

// =============================================================================
// StopTracker
// =============================================================================

/// Per-row done state plus optional per-position protection.
#[derive(Debug, Clone)]
pub struct StopTracker {
    stop_token_ids: Option<HashSet<u32>>,
    mask: Option<Array2<bool>>,
    done: Array1<bool>,
}

impl StopTracker {
    /// Creates a tracker for `batch_size` rows, none of them done.
    ///
    /// `mask`, when given, must have the prompt's shape; `true` marks
    /// positions whose existing value is kept.
    pub fn new(
        batch_size: usize,
        stop_token_ids: Option<HashSet<u32>>,
        mask: Option<Array2<bool>>,
    ) -> Self {
        Self {
            stop_token_ids,
            mask,
            done: Array1::from_elem(batch_size, false),
        }
    }

    /// Rows that have emitted a stop token.
    pub fn done(&self) -> ArrayView1<'_, bool> {
        self.done.view()
    }

    /// Rows whose value at `index` must not change: done rows and rows with a
    /// protected position.
    pub fn frozen_at(&self, index: usize) -> Array1<bool> {
        match &self.mask {
            Some(mask) => &self.done | &mask.column(index),
            None => self.done.clone(),
        }
    }

    /// Writes `tokens` into column `index` of `prompt` for non-frozen rows and
    /// marks rows that just emitted a stop token as done.
    pub fn commit(&mut self, prompt: &mut Array2<u32>, index: usize, tokens: ArrayView1<'_, u32>) {
        let frozen = self.frozen_at(index);

        Zip::from(prompt.column_mut(index))
            .and(tokens)
            .and(&frozen)
            .for_each(|slot, &token, &keep| {
                *slot = if keep { *slot } else { token };
            });

        if let Some(stop) = &self.stop_token_ids {
            Zip::from(&mut self.done)
                .and(tokens)
                .and(&frozen)
                .for_each(|done, &token, &keep| {
                    *done = *done || (!keep && stop.contains(&token));
                });
        }
    }

    /// True once stop ids are configured and every row is done.
    pub fn all_done(&self) -> bool {
        self.stop_token_ids.is_some() && self.done.iter().all(|&d| d)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_commit_writes_and_marks_done() {
        let mut prompt = Array2::<u32>::from_elem((2, 3), 9);
        let mut tracker = StopTracker::new(2, Some(HashSet::from([1])), None);

        tracker.commit(&mut prompt, 0, array![1, 4].view());
        assert_eq!(prompt.column(0), array![1, 4]);
        assert_eq!(tracker.done(), array![true, false]);
        assert!(!tracker.all_done());

        tracker.commit(&mut prompt, 1, array![5, 1].view());
        assert_eq!(prompt, array![[1, 9, 9], [4, 1, 9]]);
        assert!(tracker.all_done());
    }

    #[test]
    fn test_done_rows_keep_existing_values() {
        let mut prompt = Array2::<u32>::from_elem((1, 3), 0);
        let mut tracker = StopTracker::new(1, Some(HashSet::from([7])), None);
        tracker.commit(&mut prompt, 0, array![7].view());
        tracker.commit(&mut prompt, 1, array![3].view());
        tracker.commit(&mut prompt, 2, array![4].view());
        assert_eq!(prompt, array![[7, 0, 0]]);
    }

    #[test]
    fn test_protected_positions_are_kept_and_do_not_stop() {
        let mut prompt = array![[7u32, 0], [0, 0]];
        let mask = array![[true, false], [false, false]];
        let mut tracker = StopTracker::new(2, Some(HashSet::from([7])), Some(mask));

        tracker.commit(&mut prompt, 0, array![7, 2].view());
        assert_eq!(prompt.column(0), array![7, 2]);
        assert_eq!(tracker.done(), array![false, false]);
    }

    #[test]
    fn test_without_stop_ids_never_all_done() {
        let mut prompt = Array2::<u32>::zeros((1, 2));
        let mut tracker = StopTracker::new(1, None, None);
        tracker.commit(&mut prompt, 0, array![1].view());
        assert!(!tracker.all_done());
    }
}
