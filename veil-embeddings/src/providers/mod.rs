//! Embedding providers and the config-driven factory.

mod hashing;
mod http;

use std::sync::Arc;

use veil_core::config::EmbeddingConfig;
use veil_core::errors::{ConfigError, VeilResult};
use veil_core::traits::EmbeddingProvider;

pub use hashing::HashingEmbedder;
pub use http::HttpEmbeddingProvider;

/// Build the provider named by `config.provider`.
pub fn create_provider(
    config: &EmbeddingConfig,
    dimensions: usize,
) -> VeilResult<Arc<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "hashing" => Ok(Arc::new(HashingEmbedder::new(dimensions))),
        "http" => Ok(Arc::new(HttpEmbeddingProvider::from_config(config, dimensions)?)),
        other => Err(ConfigError::InvalidValue {
            field: "embedding.provider".to_string(),
            reason: format!("unknown provider '{other}', expected 'http' or 'hashing'"),
        }
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_builds_hashing_provider() {
        let provider = create_provider(&EmbeddingConfig::default(), 64).unwrap();
        assert_eq!(provider.name(), "hashing");
        assert_eq!(provider.dimensions(), 64);
    }

    #[test]
    fn unknown_provider_is_config_error() {
        let config = EmbeddingConfig {
            provider: "onnx".to_string(),
            ..Default::default()
        };
        let err = create_provider(&config, 64).err().unwrap();
        assert_eq!(err.kind(), "config");
    }

    #[test]
    fn http_provider_requires_endpoint() {
        let config = EmbeddingConfig {
            provider: "http".to_string(),
            ..Default::default()
        };
        assert!(create_provider(&config, 64).is_err());
    }
}
