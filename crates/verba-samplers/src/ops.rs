//! Row-level numeric helpers shared by the selection policies.
//!
//! Every function here works on a single batch row so policies stay free of
//! cross-row dependencies.
//!
//! @version 0.1.0
//! @author `AutomataNexus` Development Team

use ndarray::{Array1, ArrayView1};
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

/// Norm floor used when l2-normalizing hidden states.
const NORM_EPSILON: f32 = 1e-12;

// =============================================================================
// Probabilities
// =============================================================================

/// Numerically stable softmax of `logits / temperature`.
///
/// When the scaled maximum is not finite (all `-inf`, or some `+inf`), the
/// probability mass is shared equally between the entries equal to it.
pub fn softmax(logits: ArrayView1<'_, f32>, temperature: f32) -> Array1<f32> {
    let scaled = logits.mapv(|v| v / temperature);
    let max = scaled.iter().copied().fold(f32::NEG_INFINITY, f32::max);

    if !max.is_finite() {
        let hits = scaled.iter().filter(|&&v| v == max).count().max(1);
        return scaled.mapv(|v| if v == max { 1.0 / hits as f32 } else { 0.0 });
    }

    let exps = scaled.mapv(|v| (v - max).exp());
    let sum = exps.sum();
    exps / sum
}

/// Index of the maximum value; the first occurrence wins ties.
pub fn argmax(values: ArrayView1<'_, f32>) -> usize {
    let mut best = 0;
    let mut max_val = f32::NEG_INFINITY;
    for (i, &v) in values.iter().enumerate() {
        if v > max_val {
            max_val = v;
            best = i;
        }
    }
    best
}

/// Returns up to `limit` indices ordered by descending value.
///
/// The sort is stable, so equal values keep ascending index order.
pub fn ranked_indices(values: ArrayView1<'_, f32>, limit: usize) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..values.len()).collect();
    indices.sort_by(|&a, &b| values[b].total_cmp(&values[a]));
    indices.truncate(limit);
    indices
}

// =============================================================================
// Similarity
// =============================================================================

/// Cosine similarity of two l2-normalized vectors.
///
/// Zero vectors have similarity 0 with everything.
pub fn cosine_similarity(a: ArrayView1<'_, f32>, b: ArrayView1<'_, f32>) -> f32 {
    let dot = a.dot(&b);
    let norm_a = a.dot(&a).sqrt().max(NORM_EPSILON);
    let norm_b = b.dot(&b).sqrt().max(NORM_EPSILON);
    dot / (norm_a * norm_b)
}

// =============================================================================
// Sampling
// =============================================================================

/// Draws an index from unnormalized, non-negative weights.
///
/// Falls back to index 0 (the highest ranked candidate) when the weights do
/// not form a valid distribution, e.g. all zero.
pub fn sample_categorical<R: Rng + ?Sized>(weights: &[f32], rng: &mut R) -> usize {
    match WeightedIndex::new(weights) {
        Ok(dist) => dist.sample(rng),
        Err(_) => 0,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_softmax_sums_to_one() {
        let probs = softmax(array![1.0, 2.0, 3.0].view(), 1.0);
        assert_abs_diff_eq!(probs.sum(), 1.0, epsilon = 1e-6);
        assert!(probs[2] > probs[1] && probs[1] > probs[0]);
    }

    #[test]
    fn test_softmax_tiny_temperature_is_one_hot() {
        let probs = softmax(array![3.0, 2.0, 1.0].view(), 1e-9);
        assert_eq!(probs, array![1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_softmax_all_negative_infinity_is_uniform() {
        let probs = softmax(Array1::from_elem(4, f32::NEG_INFINITY).view(), 1.0);
        assert_eq!(probs, array![0.25, 0.25, 0.25, 0.25]);
    }

    #[test]
    fn test_argmax_first_occurrence() {
        assert_eq!(argmax(array![1.0, 5.0, 5.0, 2.0].view()), 1);
        assert_eq!(argmax(array![-1.0, -2.0, -0.5].view()), 2);
    }

    #[test]
    fn test_ranked_indices_stable_ties() {
        let values = array![1.0, 3.0, 3.0, 2.0, 3.0];
        assert_eq!(ranked_indices(values.view(), 4), vec![1, 2, 4, 3]);
        assert_eq!(ranked_indices(values.view(), 10).len(), 5);
    }

    #[test]
    fn test_cosine_similarity() {
        let a = array![1.0, 1.0, 1.0];
        let b = array![2.0, 2.0, 2.0];
        assert_abs_diff_eq!(cosine_similarity(a.view(), b.view()), 1.0, epsilon = 1e-6);

        let c = array![1.0, -1.0, 0.0];
        assert_abs_diff_eq!(cosine_similarity(a.view(), c.view()), 0.0, epsilon = 1e-6);

        let zero = array![0.0, 0.0, 0.0];
        assert_eq!(cosine_similarity(a.view(), zero.view()), 0.0);
    }

    #[test]
    fn test_sample_categorical_skips_zero_weights() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            assert_eq!(sample_categorical(&[0.0, 0.4, 0.0], &mut rng), 1);
        }
    }

    #[test]
    fn test_sample_categorical_degenerate_falls_back() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(sample_categorical(&[0.0, 0.0], &mut rng), 0);
    }
}
