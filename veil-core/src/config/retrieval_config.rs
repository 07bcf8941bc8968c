use serde::{Deserialize, Serialize};

use super::defaults;

/// PrivacyRetriever configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Results requested from each partition independently.
    pub top_k: usize,
    /// Index dimensionality for this deployment.
    pub dimensions: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: defaults::DEFAULT_TOP_K,
            dimensions: defaults::DEFAULT_EMBEDDING_DIMENSIONS,
        }
    }
}
