//! Beam expansion for opaque caches.
//!
//! Contrastive search evaluates `k` hypothetical continuations per row in a
//! single next-token call. Every per-row structure is therefore reshaped from
//! `[batch, ...]` to `[batch * k, ...]` before the call, where row `b` becomes
//! rows `b * k .. b * k + k`, and collapsed back to `[batch, ...]` afterwards
//! by keeping one beam per row.
//!
//! The samplers never look inside a cache. [`BeamCache`] is the only thing
//! they need from it, and is implemented for owned `ndarray` arrays (batch on
//! axis 0), `()`, `Option`, `Vec` and tuples so nested cache layouts compose.
//!
//! @version 0.1.0
//! @author `AutomataNexus` Development Team

use ndarray::{Array, Axis, RemoveAxis};

use crate::error::{SamplerError, SamplerResult};

// =============================================================================
// BeamCache Trait
// =============================================================================

/// A per-row structure that can be expanded into beams and collapsed back.
pub trait BeamCache: Sized {
    /// `[batch, ...]` to `[batch * k, ...]`, each row repeated `k` times
    /// consecutively.
    fn expand_beams(self, k: usize) -> SamplerResult<Self>;

    /// `[batch * k, ...]` to `[batch, ...]`, keeping beam `chosen[b]` of row `b`.
    fn select_beams(self, k: usize, chosen: &[usize]) -> SamplerResult<Self>;
}

/// Row indices that repeat every one of `batch` rows `k` times.
pub(crate) fn expanded_rows(batch: usize, k: usize) -> Vec<usize> {
    (0..batch).flat_map(|b| std::iter::repeat(b).take(k)).collect()
}

/// Flat beam row kept for every batch row.
pub(crate) fn chosen_rows(k: usize, chosen: &[usize]) -> SamplerResult<Vec<usize>> {
    chosen
        .iter()
        .enumerate()
        .map(|(b, &j)| {
            if j < k {
                Ok(b * k + j)
            } else {
                Err(SamplerError::InvalidInput(format!(
                    "beam index {} out of range for k = {}",
                    j, k
                )))
            }
        })
        .collect()
}

// =============================================================================
// Implementations
// =============================================================================

impl<A, D> BeamCache for Array<A, D>
where
    A: Clone,
    D: RemoveAxis,
{
    fn expand_beams(self, k: usize) -> SamplerResult<Self> {
        let batch = self.len_of(Axis(0));
        Ok(self.select(Axis(0), &expanded_rows(batch, k)))
    }

    fn select_beams(self, k: usize, chosen: &[usize]) -> SamplerResult<Self> {
        let beams = self.len_of(Axis(0));
        if beams != chosen.len() * k {
            return Err(SamplerError::shape_mismatch(
                format!("{} beam rows", chosen.len() * k),
                format!("{} rows", beams),
            ));
        }
        Ok(self.select(Axis(0), &chosen_rows(k, chosen)?))
    }
}

impl BeamCache for () {
    fn expand_beams(self, _k: usize) -> SamplerResult<Self> {
        Ok(())
    }

    fn select_beams(self, _k: usize, _chosen: &[usize]) -> SamplerResult<Self> {
        Ok(())
    }
}

impl<T: BeamCache> BeamCache for Option<T> {
    fn expand_beams(self, k: usize) -> SamplerResult<Self> {
        self.map(|inner| inner.expand_beams(k)).transpose()
    }

    fn select_beams(self, k: usize, chosen: &[usize]) -> SamplerResult<Self> {
        self.map(|inner| inner.select_beams(k, chosen)).transpose()
    }
}

impl<T: BeamCache> BeamCache for Vec<T> {
    fn expand_beams(self, k: usize) -> SamplerResult<Self> {
        self.into_iter().map(|inner| inner.expand_beams(k)).collect()
    }

    fn select_beams(self, k: usize, chosen: &[usize]) -> SamplerResult<Self> {
        self.into_iter()
            .map(|inner| inner.select_beams(k, chosen))
            .collect()
    }
}

impl<A: BeamCache, B: BeamCache> BeamCache for (A, B) {
    fn expand_beams(self, k: usize) -> SamplerResult<Self> {
        Ok((self.0.expand_beams(k)?, self.1.expand_beams(k)?))
    }

    fn select_beams(self, k: usize, chosen: &[usize]) -> SamplerResult<Self> {
        Ok((self.0.select_beams(k, chosen)?, self.1.select_beams(k, chosen)?))
    }
}

impl<A: BeamCache, B: BeamCache, C: BeamCache> BeamCache for (A, B, C) {
    fn expand_beams(self, k: usize) -> SamplerResult<Self> {
        Ok((
            self.0.expand_beams(k)?,
            self.1.expand_beams(k)?,
            self.2.expand_beams(k)?,
        ))
    }

    fn select_beams(self, k: usize, chosen: &[usize]) -> SamplerResult<Self> {
        Ok((
            self.0.select_beams(k, chosen)?,
            self.1.select_beams(k, chosen)?,
            self.2.select_beams(k, chosen)?,
        ))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array3};

    #[test]
    fn test_expand_repeats_rows_consecutively() {
        let cache = array![[1u32, 2], [3, 4]];
        let beams = cache.expand_beams(3).unwrap();
        assert_eq!(
            beams,
            array![[1, 2], [1, 2], [1, 2], [3, 4], [3, 4], [3, 4]]
        );
    }

    #[test]
    fn test_select_keeps_one_beam_per_row() {
        let beams = array![[0.0f32], [1.0], [2.0], [10.0], [11.0], [12.0]];
        let kept = beams.select_beams(3, &[2, 0]).unwrap();
        assert_eq!(kept, array![[2.0], [10.0]]);
    }

    #[test]
    fn test_expand_then_select_restores_three_dim_cache() {
        let cache = Array3::from_shape_fn((2, 3, 4), |(b, l, d)| (b * 100 + l * 10 + d) as f32);
        let restored = cache
            .clone()
            .expand_beams(5)
            .unwrap()
            .select_beams(5, &[4, 1])
            .unwrap();
        assert_eq!(restored, cache);
    }

    #[test]
    fn test_select_rejects_wrong_beam_count() {
        let beams = array![[0.0f32], [1.0], [2.0]];
        assert!(matches!(
            beams.select_beams(2, &[0, 1]),
            Err(SamplerError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_select_rejects_out_of_range_beam() {
        let beams = array![[0.0f32], [1.0]];
        assert!(matches!(
            beams.select_beams(2, &[2]),
            Err(SamplerError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_nested_caches() {
        let cache = (Some(array![[1u32], [2]]), vec![array![5.0f32, 6.0]]);
        let beams = cache.expand_beams(2).unwrap();
        assert_eq!(beams.0.as_ref().unwrap(), &array![[1], [1], [2], [2]]);
        assert_eq!(beams.1[0], array![5.0, 5.0, 6.0, 6.0]);

        let kept = beams.select_beams(2, &[1, 0]).unwrap();
        assert_eq!(kept.0.unwrap(), array![[1], [2]]);
        assert_eq!(kept.1[0], array![5.0, 6.0]);
    }
}
