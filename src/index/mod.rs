//! Brute-force semantic similarity search
//!
//! Every stored vector is scored against the query with cosine similarity,
//! the scores are sorted descending and the first `k` are kept. This is an
//! O(n·d) scan with no index structure; the corpus is small and rebuilt
//! wholesale when it changes.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A retrieved passage with its similarity to the query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityResult {
    /// Position of the passage in the corpus (document order)
    pub index: usize,
    pub chunk: String,
    /// Cosine similarity in [-1, 1], or NaN when undefined
    pub score: f32,
}

/// Cosine similarity of two vectors.
///
/// Returns NaN when either vector has zero norm or the dimensions differ.
/// NaN is a defined "no similarity" value; it is not clamped.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return f32::NAN;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        return f32::NAN;
    }
    (dot / denom) as f32
}

/// Descending by score, NaN after every real score
fn by_score_desc(a: &SimilarityResult, b: &SimilarityResult) -> Ordering {
    match (a.score.is_nan(), b.score.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal),
    }
}

/// Rank stored passages against a query vector.
///
/// `chunks[i]` must correspond to `vectors[i]`. Ties keep document order.
/// Returns at most `k` results; a missing query vector yields no results.
pub fn search(
    query: Option<&[f32]>,
    chunks: &[String],
    vectors: &[Vec<f32>],
    k: usize,
) -> Vec<SimilarityResult> {
    debug_assert_eq!(chunks.len(), vectors.len());

    let Some(query) = query else {
        return Vec::new();
    };

    let mut scored: Vec<SimilarityResult> = chunks
        .iter()
        .zip(vectors)
        .enumerate()
        .map(|(index, (chunk, vector))| SimilarityResult {
            index,
            chunk: chunk.clone(),
            score: cosine_similarity(query, vector),
        })
        .collect();

    // Vec::sort_by is stable, so equal scores stay in document order
    scored.sort_by(by_score_desc);
    scored.truncate(k);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> (Vec<String>, Vec<Vec<f32>>) {
        (
            vec![
                "Liu Fang likes singing".to_string(),
                "Wang Hua likes painting".to_string(),
                "Zhang Wei likes singing and painting".to_string(),
            ],
            vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.7, 0.7]],
        )
    }

    #[test]
    fn test_cosine_basic() {
        assert!((cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 3.0]).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_symmetric() {
        let pairs = [
            (vec![0.3f32, -1.2, 4.5], vec![2.0f32, 0.1, -0.7]),
            (vec![1e-3f32, 5.0, 2.5], vec![9.0f32, -3.0, 0.25]),
            (vec![0.1f32, 0.2, 0.3], vec![0.3f32, 0.2, 0.1]),
        ];
        for (a, b) in pairs {
            assert_eq!(cosine_similarity(&a, &b), cosine_similarity(&b, &a));
        }
    }

    #[test]
    fn test_cosine_zero_norm_is_nan() {
        assert!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]).is_nan());
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 0.0]).is_nan());
        assert!(cosine_similarity(&[], &[]).is_nan());
    }

    #[test]
    fn test_cosine_dimension_mismatch_is_nan() {
        assert!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]).is_nan());
    }

    #[test]
    fn test_search_ranks_descending() {
        let (chunks, vectors) = corpus();
        let results = search(Some(&[1.0, 0.1][..]), &chunks, &vectors, 3);

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].chunk, "Liu Fang likes singing");
        assert_eq!(results[0].index, 0);
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_search_top_k_bound() {
        let (chunks, vectors) = corpus();
        for k in 0..6 {
            let results = search(Some(&[0.5, 0.5][..]), &chunks, &vectors, k);
            assert_eq!(results.len(), k.min(chunks.len()));
        }
    }

    #[test]
    fn test_search_k_larger_than_corpus() {
        let chunks = vec!["a".to_string(), "b".to_string()];
        let vectors: Vec<Vec<f32>> = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        assert_eq!(search(Some(&[1.0, 1.0][..]), &chunks, &vectors, 5).len(), 2);
    }

    #[test]
    fn test_search_without_query_is_empty() {
        let (chunks, vectors) = corpus();
        assert!(search(None, &chunks, &vectors, 3).is_empty());
    }

    #[test]
    fn test_search_ties_keep_document_order() {
        let chunks: Vec<String> = ["first", "second", "third"].iter().map(|s| s.to_string()).collect();
        let vectors: Vec<Vec<f32>> = vec![vec![1.0, 0.0], vec![2.0, 0.0], vec![0.0, 1.0]];
        let results = search(Some(&[1.0, 0.0][..]), &chunks, &vectors, 3);

        assert_eq!(results[0].chunk, "first");
        assert_eq!(results[1].chunk, "second");
        assert_eq!(results[2].chunk, "third");
    }

    #[test]
    fn test_search_nan_scores_rank_last() {
        let chunks: Vec<String> = ["zero", "opposite", "match"].iter().map(|s| s.to_string()).collect();
        let vectors: Vec<Vec<f32>> = vec![vec![0.0, 0.0], vec![-1.0, 0.0], vec![1.0, 0.0]];
        let results = search(Some(&[1.0, 0.0][..]), &chunks, &vectors, 3);

        assert_eq!(results[0].chunk, "match");
        assert_eq!(results[1].chunk, "opposite");
        assert_eq!(results[2].chunk, "zero");
        assert!(results[2].score.is_nan());
    }
}
