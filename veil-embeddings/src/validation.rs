//! Embedding sanity checks shared by the embedder and the retriever.

use veil_core::errors::RetrievalError;

/// Check length and numeric validity of a query embedding.
pub fn validate_embedding(embedding: &[f32], dimensions: usize) -> Result<(), RetrievalError> {
    if embedding.len() != dimensions {
        return Err(RetrievalError::InvalidEmbedding {
            reason: format!(
                "expected {dimensions} dimensions, got {}",
                embedding.len()
            ),
        });
    }
    if let Some(pos) = embedding.iter().position(|v| !v.is_finite()) {
        return Err(RetrievalError::InvalidEmbedding {
            reason: format!("non-finite value at index {pos}"),
        });
    }
    Ok(())
}
