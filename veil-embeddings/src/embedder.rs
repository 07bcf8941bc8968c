//! QueryEmbedder: cache lookup, guarded provider call, validation.

use std::sync::Arc;

use tracing::{debug, info};
use veil_core::config::VeilConfig;
use veil_core::errors::{ConfigError, GenerationError, VeilResult};
use veil_core::traits::{EmbeddingCache, EmbeddingProvider};
use veil_resilience::{CircuitBreaker, Guard, RetryPolicy};

use crate::cache::{cache_key, MokaEmbeddingCache};
use crate::providers;
use crate::validation::validate_embedding;

/// Turns user text into a validated query embedding.
///
/// Only validated vectors are cached, so a provider that briefly returns
/// garbage cannot poison later turns.
pub struct QueryEmbedder {
    provider: Arc<dyn EmbeddingProvider>,
    cache: Arc<dyn EmbeddingCache>,
    guard: Guard,
    dimensions: usize,
}

impl QueryEmbedder {
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        cache: Arc<dyn EmbeddingCache>,
        guard: Guard,
        dimensions: usize,
    ) -> VeilResult<Self> {
        if provider.dimensions() != dimensions {
            return Err(ConfigError::InvalidValue {
                field: "retrieval.dimensions".to_string(),
                reason: format!(
                    "provider '{}' produces {} dimensions, index expects {dimensions}",
                    provider.name(),
                    provider.dimensions()
                ),
            }
            .into());
        }
        Ok(Self {
            provider,
            cache,
            guard,
            dimensions,
        })
    }

    /// Wire provider, cache, and guard from configuration.
    pub fn from_config(config: &VeilConfig) -> VeilResult<Self> {
        let dims = config.retrieval.dimensions;
        let provider = providers::create_provider(&config.embedding, dims)?;
        let cache = Arc::new(MokaEmbeddingCache::from_config(&config.embedding));
        let res = &config.resilience;
        let breaker = Arc::new(CircuitBreaker::new(
            "embedding",
            res.breaker_failure_threshold,
            res.breaker_cooldown(),
        ));
        let guard = Guard::new(
            breaker,
            res.embedding_timeout(),
            RetryPolicy::from_config(res),
        );
        info!(
            provider = provider.name(),
            dims,
            cache_capacity = config.embedding.cache_capacity,
            "QueryEmbedder initialized"
        );
        Self::new(provider, cache, guard, dims)
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn guard(&self) -> &Guard {
        &self.guard
    }

    /// Embed `text`, serving repeats from the cache.
    pub async fn embed(&self, text: &str) -> VeilResult<Vec<f32>> {
        let key = cache_key(self.provider.name(), text);
        if let Some(hit) = self.cache.get(&key) {
            debug!(event = "embedding_cache_hit", provider = self.provider.name());
            return Ok(hit);
        }

        let provider = Arc::clone(&self.provider);
        let embedding = self
            .guard
            .call(
                || {
                    let provider = Arc::clone(&provider);
                    let text = text.to_string();
                    async move { provider.embed(&text).await }
                },
                || {
                    GenerationError::EmbeddingUnavailable {
                        reason: "embedding call timed out".to_string(),
                    }
                    .into()
                },
            )
            .await?;

        validate_embedding(&embedding, self.dimensions)?;
        self.cache.put(key, embedding.clone());
        Ok(embedding)
    }
}

impl std::fmt::Debug for QueryEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryEmbedder")
            .field("provider", &self.provider.name())
            .field("dimensions", &self.dimensions)
            .finish_non_exhaustive()
    }
}
