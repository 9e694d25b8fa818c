//! Similarity computation for embeddings.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::error::{EmbeddingError, Result};

/// Compute the cosine similarity between two embeddings.
///
/// Returns a value between -1.0 and 1.0. Zero vectors score 0.0 against
/// everything.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(EmbeddingError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }

    let dot_product: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let magnitude_a = magnitude(a);
    let magnitude_b = magnitude(b);

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return Ok(0.0);
    }

    Ok(dot_product / (magnitude_a * magnitude_b))
}

fn magnitude(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Normalize an embedding to unit length in place.
pub fn normalize(embedding: &mut [f32]) {
    let magnitude = magnitude(embedding);
    if magnitude > 0.0 {
        embedding.iter_mut().for_each(|x| *x /= magnitude);
    }
}

/// A ranked match: the candidate's position in the input and its score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityResult {
    /// Index of the matched candidate.
    pub position: usize,

    /// Cosine similarity to the query.
    pub score: f32,
}

/// Rank `candidates` against `query` and keep the `k` best.
///
/// Ties keep insertion order, so older candidates win over newer ones with
/// an identical score.
pub fn find_top_k<'a, I>(query: &[f32], candidates: I, k: usize) -> Result<Vec<SimilarityResult>>
where
    I: IntoIterator<Item = &'a [f32]>,
{
    let mut scores: Vec<(OrderedFloat<f32>, usize)> = Vec::new();

    for (position, embedding) in candidates.into_iter().enumerate() {
        let score = cosine_similarity(query, embedding)?;
        scores.push((OrderedFloat(score), position));
    }

    // Stable sort, descending by score.
    scores.sort_by(|a, b| b.0.cmp(&a.0));

    Ok(scores
        .into_iter()
        .take(k)
        .map(|(score, position)| SimilarityResult {
            position,
            score: score.0,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cosine_similarity_identical() {
        let sim = cosine_similarity(&[1.0, 0.0, 0.0], &[1.0, 0.0, 0.0]).unwrap();
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let sim = cosine_similarity(&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0]).unwrap();
        assert!(sim.abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_zero_vector() {
        let sim = cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]).unwrap();
        assert_eq!(sim, 0.0);
    }

    #[test]
    fn test_dimension_mismatch() {
        assert!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]).is_err());
    }

    #[test]
    fn test_normalize() {
        let mut v = vec![3.0, 4.0];
        normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_find_top_k() {
        let candidates: Vec<Vec<f32>> = vec![
            vec![0.0, 1.0, 0.0], // similarity 0.0
            vec![1.0, 0.0, 0.0], // similarity 1.0
            vec![0.7, 0.7, 0.0], // similarity ~0.7
        ];

        let results =
            find_top_k(&[1.0, 0.0, 0.0], candidates.iter().map(Vec::as_slice), 2).unwrap();

        let positions: Vec<usize> = results.iter().map(|r| r.position).collect();
        assert_eq!(positions, vec![1, 2]);
    }

    #[test]
    fn test_find_top_k_ties_keep_insertion_order() {
        let candidates: Vec<Vec<f32>> = vec![vec![1.0, 0.0], vec![2.0, 0.0]];
        let results =
            find_top_k(&[1.0, 0.0], candidates.iter().map(Vec::as_slice), 2).unwrap();
        assert_eq!(results[0].position, 0);
        assert_eq!(results[1].position, 1);
    }
}
