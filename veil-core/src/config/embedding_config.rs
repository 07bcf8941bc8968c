use serde::{Deserialize, Serialize};

use super::defaults;

/// Embedding collaborator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Provider: "http" or "hashing".
    pub provider: String,
    /// Endpoint for the HTTP provider (OpenAI-compatible `/embeddings`).
    pub endpoint: Option<String>,
    /// Model name sent to the HTTP provider.
    pub model: Option<String>,
    /// Environment variable holding the API key.
    pub api_key_env: Option<String>,
    /// Embedding cache max entries.
    pub cache_capacity: u64,
    /// Embedding cache time-to-live in seconds.
    pub cache_ttl_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: defaults::DEFAULT_EMBEDDING_PROVIDER.to_string(),
            endpoint: None,
            model: None,
            api_key_env: None,
            cache_capacity: defaults::DEFAULT_EMBEDDING_CACHE_CAPACITY,
            cache_ttl_secs: defaults::DEFAULT_EMBEDDING_CACHE_TTL_SECS,
        }
    }
}
