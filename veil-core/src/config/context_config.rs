use serde::{Deserialize, Serialize};

use super::defaults;

/// ContextBuilder configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Overall token budget for retrieved content.
    pub token_budget: usize,
    /// Fraction of the budget reserved for citable chunks. The rest goes to learn-only.
    pub citable_share: f64,
    /// Prefix of citation markers, rendered as `[PREFIX-n]`.
    pub marker_prefix: String,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            token_budget: defaults::DEFAULT_TOKEN_BUDGET,
            citable_share: defaults::DEFAULT_CITABLE_SHARE,
            marker_prefix: defaults::DEFAULT_MARKER_PREFIX.to_string(),
        }
    }
}
