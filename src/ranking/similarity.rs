//! Cosine similarity between query and document vectors.
//!
//! Scores are not clamped: cosine similarity lives in [-1, 1] and any
//! display rounding is left to the caller.

use rayon::prelude::*;

use crate::ranking::errors::ScoringError;
use crate::ranking::vector::{SparseVector, Vector};

/// Cosine similarity between two vectors of the same kind and dimensionality.
///
/// Similarity against a vector whose components are all zero is defined as
/// 0.0; any other vector, however small, gets its real cosine.
pub fn cosine_similarity(a: &Vector, b: &Vector) -> Result<f32, ScoringError> {
    if a.dimensions() != b.dimensions() {
        return Err(ScoringError::DimensionMismatch {
            expected: a.dimensions(),
            got: b.dimensions(),
        });
    }

    match (a, b) {
        (Vector::Sparse(a), Vector::Sparse(b)) => Ok(sparse_cosine(a, b)),
        (Vector::Dense(a), Vector::Dense(b)) => Ok(dense_cosine(a, b)),
        _ => Err(ScoringError::KindMismatch),
    }
}

// Accumulated in f64 so that tiny but nonzero vectors do not underflow to a
// zero norm.
fn dense_cosine(a: &[f32], b: &[f32]) -> f32 {
    let (mut dot, mut sq_a, mut sq_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        sq_a += x * x;
        sq_b += y * y;
    }
    finish_cosine(dot, sq_a, sq_b)
}

fn sparse_cosine(a: &SparseVector, b: &SparseVector) -> f32 {
    finish_cosine(a.dot(b), a.dot(a), b.dot(b))
}

/// Only an exactly zero vector scores 0; nothing is rescaled or clamped.
fn finish_cosine(dot: f64, sq_a: f64, sq_b: f64) -> f32 {
    if sq_a == 0.0 || sq_b == 0.0 {
        return 0.0;
    }
    (dot / (sq_a.sqrt() * sq_b.sqrt())) as f32
}

/// Score every document against the query, keeping input order.
///
/// Fails on the first mismatched or non-finite score; no document is
/// silently skipped.
pub fn score_all(query: &Vector, documents: &[Vector]) -> Result<Vec<f32>, ScoringError> {
    documents
        .par_iter()
        .enumerate()
        .map(|(position, doc)| {
            let score = cosine_similarity(query, doc)?;
            if !score.is_finite() {
                return Err(ScoringError::NonFinite { position });
            }
            Ok(score)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dense(v: &[f32]) -> Vector {
        Vector::Dense(v.to_vec())
    }

    #[test]
    fn test_identical_vectors_score_one() {
        let v = dense(&[0.3, -1.2, 4.0]);
        let score = cosine_similarity(&v, &v).unwrap();
        assert!((score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_orthogonal_vectors_score_zero() {
        let score = cosine_similarity(&dense(&[1.0, 0.0]), &dense(&[0.0, 1.0])).unwrap();
        assert_eq!(score, 0.0);
    }

    #[test]
    fn test_opposite_vectors_are_not_clamped() {
        let score = cosine_similarity(&dense(&[1.0, 2.0]), &dense(&[-1.0, -2.0])).unwrap();
        assert!((score + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_zero_vector_scores_zero() {
        let zero = dense(&[0.0, 0.0, 0.0]);
        let other = dense(&[1.0, 2.0, 3.0]);
        assert_eq!(cosine_similarity(&zero, &other).unwrap(), 0.0);
        assert_eq!(cosine_similarity(&other, &zero).unwrap(), 0.0);
        assert_eq!(cosine_similarity(&zero, &zero).unwrap(), 0.0);

        let sparse_zero = Vector::Sparse(SparseVector::zeros(3));
        let sparse = Vector::Sparse(SparseVector::new(3, vec![(1, 1.0)]));
        assert_eq!(cosine_similarity(&sparse_zero, &sparse).unwrap(), 0.0);
    }

    #[test]
    fn test_tiny_vectors_get_real_cosine() {
        let tiny = dense(&[1e-8, 0.0]);
        assert!(!tiny.is_zero());
        assert!((cosine_similarity(&tiny, &tiny).unwrap() - 1.0).abs() < 1e-6);

        let tinier = dense(&[1e-30, -1e-30]);
        let opposite = dense(&[-1e-30, 1e-30]);
        assert!((cosine_similarity(&tinier, &opposite).unwrap() + 1.0).abs() < 1e-6);

        let sparse = Vector::Sparse(SparseVector::new(4, vec![(2, 1e-8)]));
        assert!((cosine_similarity(&sparse, &sparse).unwrap() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_symmetry() {
        let a = dense(&[0.1, 0.7, -0.2, 0.9]);
        let b = dense(&[0.5, -0.3, 0.8, 0.05]);
        assert_eq!(
            cosine_similarity(&a, &b).unwrap(),
            cosine_similarity(&b, &a).unwrap()
        );

        let a = Vector::Sparse(SparseVector::new(6, vec![(0, 0.4), (3, 0.2), (5, 0.9)]));
        let b = Vector::Sparse(SparseVector::new(6, vec![(1, 0.3), (3, 0.7), (5, 0.1)]));
        assert_eq!(
            cosine_similarity(&a, &b).unwrap(),
            cosine_similarity(&b, &a).unwrap()
        );
    }

    #[test]
    fn test_sparse_matches_dense() {
        let sa = Vector::Sparse(SparseVector::new(4, vec![(0, 1.0), (2, 2.0)]));
        let sb = Vector::Sparse(SparseVector::new(4, vec![(0, 3.0), (3, 1.0)]));
        let da = dense(&[1.0, 0.0, 2.0, 0.0]);
        let db = dense(&[3.0, 0.0, 0.0, 1.0]);

        let sparse_score = cosine_similarity(&sa, &sb).unwrap();
        let dense_score = cosine_similarity(&da, &db).unwrap();
        assert!((sparse_score - dense_score).abs() < 1e-6);
    }

    #[test]
    fn test_dimension_mismatch() {
        let result = cosine_similarity(&dense(&[1.0, 0.0]), &dense(&[1.0, 0.0, 0.0]));
        assert_eq!(
            result,
            Err(ScoringError::DimensionMismatch {
                expected: 2,
                got: 3
            })
        );
    }

    #[test]
    fn test_kind_mismatch() {
        let sparse = Vector::Sparse(SparseVector::new(2, vec![(0, 1.0)]));
        let result = cosine_similarity(&sparse, &dense(&[1.0, 0.0]));
        assert_eq!(result, Err(ScoringError::KindMismatch));
    }

    #[test]
    fn test_score_all_keeps_order() {
        let query = dense(&[1.0, 0.0]);
        let docs = vec![dense(&[0.0, 1.0]), dense(&[1.0, 0.0]), dense(&[1.0, 1.0])];
        let scores = score_all(&query, &docs).unwrap();

        assert_eq!(scores.len(), 3);
        assert_eq!(scores[0], 0.0);
        assert!((scores[1] - 1.0).abs() < 1e-6);
        assert!((scores[2] - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-6);
    }

    #[test]
    fn test_score_all_reports_non_finite() {
        let query = dense(&[1.0, 0.0]);
        let docs = vec![dense(&[1.0, 0.0]), dense(&[f32::NAN, 1.0])];
        let result = score_all(&query, &docs);
        assert_eq!(result, Err(ScoringError::NonFinite { position: 1 }));
    }
}
