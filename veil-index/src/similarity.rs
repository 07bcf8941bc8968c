//! Cosine scoring and deterministic top-k ranking shared by both backends.

use std::cmp::Ordering;

use veil_core::errors::RetrievalError;
use veil_core::models::IndexHit;

/// Cosine similarity in [-1, 1], accumulated in f64. Zero-norm input scores 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| (*x as f64) * (*y as f64)).sum();
    let norm_a: f64 = a.iter().map(|x| (*x as f64) * (*x as f64)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| (*x as f64) * (*x as f64)).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0) as f32
}

pub(crate) fn is_zero_norm(v: &[f32]) -> bool {
    v.iter().all(|x| *x == 0.0)
}

/// Sort by score descending, chunk id ascending on ties, keep `top_k`.
pub fn rank_hits(mut hits: Vec<IndexHit>, top_k: usize) -> Vec<IndexHit> {
    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.chunk_id.cmp(&b.chunk_id))
    });
    hits.truncate(top_k);
    hits
}

pub(crate) fn check_query(embedding: &[f32], dimensions: usize) -> Result<(), RetrievalError> {
    if embedding.len() != dimensions {
        return Err(RetrievalError::InvalidEmbedding {
            reason: format!(
                "query has {} dimensions, index expects {dimensions}",
                embedding.len()
            ),
        });
    }
    if embedding.iter().any(|v| !v.is_finite()) {
        return Err(RetrievalError::InvalidEmbedding {
            reason: "query contains NaN or infinite values".to_string(),
        });
    }
    Ok(())
}
