//! Configuration. Every section is `#[serde(default)]`, so a partial TOML file
//! only overrides what it names.

pub mod audit_config;
pub mod context_config;
pub mod defaults;
pub mod embedding_config;
pub mod generation_config;
pub mod observability_config;
pub mod resilience_config;
pub mod retrieval_config;
pub mod storage_config;

use std::path::Path;

use serde::{Deserialize, Serialize};

pub use audit_config::AuditConfig;
pub use context_config::ContextConfig;
pub use embedding_config::EmbeddingConfig;
pub use generation_config::GenerationConfig;
pub use observability_config::ObservabilityConfig;
pub use resilience_config::ResilienceConfig;
pub use retrieval_config::RetrievalConfig;
pub use storage_config::StorageConfig;

use crate::errors::{ConfigError, VeilResult};

/// Top-level configuration aggregating all subsystem configs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VeilConfig {
    pub retrieval: RetrievalConfig,
    pub context: ContextConfig,
    pub generation: GenerationConfig,
    pub resilience: ResilienceConfig,
    pub embedding: EmbeddingConfig,
    pub audit: AuditConfig,
    pub storage: StorageConfig,
    pub observability: ObservabilityConfig,
}

impl VeilConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> VeilResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| ConfigError::Parse {
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse, and validate a TOML file.
    pub fn load(path: &Path) -> VeilResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&text)
    }

    /// Reject values that would make the pipeline misbehave at runtime.
    pub fn validate(&self) -> VeilResult<()> {
        if self.retrieval.dimensions == 0 {
            return Err(invalid("retrieval.dimensions", "must be greater than zero"));
        }
        if self.retrieval.top_k == 0 {
            return Err(invalid("retrieval.top_k", "must be greater than zero"));
        }
        let share = self.context.citable_share;
        if !share.is_finite() || share <= 0.0 || share >= 1.0 {
            return Err(invalid("context.citable_share", "must be strictly between 0 and 1"));
        }
        if self.context.marker_prefix.trim().is_empty()
            || !self
                .context
                .marker_prefix
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(invalid("context.marker_prefix", "must be non-empty ASCII alphanumeric"));
        }
        if self.generation.stream_channel_capacity == 0 {
            return Err(invalid("generation.stream_channel_capacity", "must be at least 1"));
        }
        if self.generation.event_channel_capacity == 0 {
            return Err(invalid("generation.event_channel_capacity", "must be at least 1"));
        }
        if self.generation.fallback_message.trim().is_empty() {
            return Err(invalid("generation.fallback_message", "must not be empty"));
        }
        if self.resilience.max_attempts == 0 {
            return Err(invalid("resilience.max_attempts", "must be at least 1"));
        }
        if self.resilience.breaker_failure_threshold == 0 {
            return Err(invalid("resilience.breaker_failure_threshold", "must be at least 1"));
        }
        if self.audit.ngram_size < 2 {
            return Err(invalid("audit.ngram_size", "must be at least 2"));
        }
        Ok(())
    }
}

fn invalid(field: &str, reason: &str) -> crate::errors::VeilError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
    .into()
}
