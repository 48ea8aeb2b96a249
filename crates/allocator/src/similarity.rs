//! Scoring capability used by the allocator.
//!
//! The allocator never computes similarity itself; it asks a [`Similarity`]
//! implementation. [`Cosine`] is the production one.

use crate::types::AllocationError;

/// Compatibility scorer between two embedding vectors.
pub trait Similarity: Send + Sync {
    /// Score `a` against `b`. Implementations must reject vectors of
    /// different length with [`AllocationError::DimensionMismatch`].
    fn score(&self, a: &[f32], b: &[f32]) -> Result<f32, AllocationError>;
}

/// Cosine similarity scorer.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cosine;

impl Similarity for Cosine {
    fn score(&self, a: &[f32], b: &[f32]) -> Result<f32, AllocationError> {
        cosine_similarity(a, b)
    }
}

/// Cosine similarity in [-1, 1].
///
/// Returns 0.0 when either vector has zero magnitude. Sums are accumulated
/// in `f64`, so any finite input yields a finite score.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32, AllocationError> {
    if a.len() != b.len() {
        return Err(AllocationError::DimensionMismatch {
            context: "similarity input".into(),
            expected: a.len(),
            found: b.len(),
        });
    }

    let dot: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(&x, &y)| f64::from(x) * f64::from(y))
        .sum();
    let norm_a = a.iter().map(|&x| f64::from(x).powi(2)).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|&x| f64::from(x).powi(2)).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }

    let sim = dot / (norm_a * norm_b);
    if sim.is_nan() {
        return Ok(0.0);
    }
    // Rounding can push identical vectors slightly past 1.0.
    Ok(sim.clamp(-1.0, 1.0) as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_vectors_score_one() {
        let sim = cosine_similarity(&[1.0, 0.0, 0.0], &[1.0, 0.0, 0.0]).unwrap();
        assert!((sim - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn orthogonal_vectors_score_zero() {
        let sim = cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).unwrap();
        assert_eq!(sim, 0.0);
    }

    #[test]
    fn opposite_vectors_score_minus_one() {
        let sim = cosine_similarity(&[1.0, 2.0], &[-1.0, -2.0]).unwrap();
        assert!((sim + 1.0).abs() < 1e-6);
    }

    #[test]
    fn scale_does_not_matter() {
        let a = cosine_similarity(&[3.0, 4.0], &[6.0, 8.0]).unwrap();
        assert!((a - 1.0).abs() < 1e-6);
    }

    #[test]
    fn zero_vector_scores_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]).unwrap(), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[0.0, 0.0]).unwrap(), 0.0);
    }

    #[test]
    fn dimension_mismatch_is_an_error() {
        let err = cosine_similarity(&[1.0, 0.0, 0.0], &[1.0, 0.0]).unwrap_err();
        assert_eq!(
            err,
            AllocationError::DimensionMismatch {
                context: "similarity input".into(),
                expected: 3,
                found: 2,
            }
        );
    }

    #[test]
    fn huge_finite_components_stay_in_range() {
        let sim = cosine_similarity(&[1e20, 0.0], &[1e20, 0.0]).unwrap();
        assert!((sim - 1.0).abs() < 1e-6);

        let sim = cosine_similarity(&[f32::MAX, f32::MAX], &[-f32::MAX, f32::MAX]).unwrap();
        assert!(sim.is_finite());
        assert!((-1.0..=1.0).contains(&sim));
    }

    #[test]
    fn cosine_trait_delegates() {
        let sim = Cosine.score(&[0.5, 0.5], &[0.5, 0.5]).unwrap();
        assert!((sim - 1.0).abs() < 1e-6);
    }
}
