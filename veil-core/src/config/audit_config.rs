use serde::{Deserialize, Serialize};

use super::defaults;

/// PrivacyAuditor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Word count of the n-gram fingerprints extracted from each learn-only chunk.
    pub ngram_size: usize,
    /// Chunks shorter than `ngram_size` words are fingerprinted whole if at least this long.
    pub min_fingerprint_chars: usize,
    /// Minimum length of a single code-like token (letters mixed with digits) to fingerprint alone.
    pub min_distinctive_token_chars: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            ngram_size: defaults::DEFAULT_NGRAM_SIZE,
            min_fingerprint_chars: defaults::DEFAULT_MIN_FINGERPRINT_CHARS,
            min_distinctive_token_chars: defaults::DEFAULT_MIN_DISTINCTIVE_TOKEN_CHARS,
        }
    }
}
