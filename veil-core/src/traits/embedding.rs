use async_trait::async_trait;

use crate::errors::VeilResult;

/// Query embedding generation.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text, returning a fixed-length vector.
    async fn embed(&self, text: &str) -> VeilResult<Vec<f32>>;

    /// The dimensionality of embeddings produced by this provider.
    fn dimensions(&self) -> usize;

    /// Human-readable provider name. Part of the cache key.
    fn name(&self) -> &str;
}

/// Content-hash keyed embedding cache with its own eviction policy.
pub trait EmbeddingCache: Send + Sync {
    fn get(&self, key: &str) -> Option<Vec<f32>>;

    fn put(&self, key: String, embedding: Vec<f32>);
}
