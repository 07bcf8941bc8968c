use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::defaults;

/// Timeouts, circuit breaker, and retry settings for network collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResilienceConfig {
    pub embedding_timeout_ms: u64,
    pub index_timeout_ms: u64,
    /// Deadline for the model to produce its first token.
    pub first_token_timeout_ms: u64,
    /// Maximum silence between two tokens once streaming has started.
    pub token_idle_timeout_ms: u64,
    /// Consecutive failures before a breaker opens.
    pub breaker_failure_threshold: u32,
    /// How long an open breaker rejects calls before probing again.
    pub breaker_cooldown_ms: u64,
    /// Total attempts per call, including the first.
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
}

impl ResilienceConfig {
    pub fn embedding_timeout(&self) -> Duration {
        Duration::from_millis(self.embedding_timeout_ms)
    }

    pub fn index_timeout(&self) -> Duration {
        Duration::from_millis(self.index_timeout_ms)
    }

    pub fn first_token_timeout(&self) -> Duration {
        Duration::from_millis(self.first_token_timeout_ms)
    }

    pub fn token_idle_timeout(&self) -> Duration {
        Duration::from_millis(self.token_idle_timeout_ms)
    }

    pub fn breaker_cooldown(&self) -> Duration {
        Duration::from_millis(self.breaker_cooldown_ms)
    }
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            embedding_timeout_ms: defaults::DEFAULT_EMBEDDING_TIMEOUT_MS,
            index_timeout_ms: defaults::DEFAULT_INDEX_TIMEOUT_MS,
            first_token_timeout_ms: defaults::DEFAULT_FIRST_TOKEN_TIMEOUT_MS,
            token_idle_timeout_ms: defaults::DEFAULT_TOKEN_IDLE_TIMEOUT_MS,
            breaker_failure_threshold: defaults::DEFAULT_BREAKER_FAILURE_THRESHOLD,
            breaker_cooldown_ms: defaults::DEFAULT_BREAKER_COOLDOWN_MS,
            max_attempts: defaults::DEFAULT_MAX_ATTEMPTS,
            backoff_base_ms: defaults::DEFAULT_BACKOFF_BASE_MS,
            backoff_max_ms: defaults::DEFAULT_BACKOFF_MAX_MS,
        }
    }
}
