use std::sync::Arc;

use moka::sync::Cache;
use tiktoken_rs::CoreBPE;
use veil_core::errors::{ConfigError, VeilResult};

/// Token counter wrapping tiktoken's cl100k_base tokenizer.
/// Cheap to clone; clones share the tokenizer and the cache.
#[derive(Clone)]
pub struct TokenCounter {
    bpe: Arc<CoreBPE>,
    cache: Cache<String, usize>,
}

impl TokenCounter {
    /// Load the tokenizer with a count cache of `cache_capacity` entries.
    pub fn new(cache_capacity: u64) -> VeilResult<Self> {
        let bpe = tiktoken_rs::cl100k_base().map_err(|e| ConfigError::ResourceLoad {
            resource: "cl100k_base tokenizer".to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            bpe: Arc::new(bpe),
            cache: Cache::new(cache_capacity),
        })
    }

    /// Count tokens in the given text (uncached).
    pub fn count(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }

    /// Count tokens, memoised by blake3 content hash.
    pub fn count_cached(&self, text: &str) -> usize {
        let hash = blake3::hash(text.as_bytes()).to_hex().to_string();
        self.cache.get_with(hash, || self.count(text))
    }
}

impl std::fmt::Debug for TokenCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCounter")
            .field("cached_entries", &self.cache.entry_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_has_no_tokens() {
        let counter = TokenCounter::new(16).unwrap();
        assert_eq!(counter.count(""), 0);
    }

    #[test]
    fn cached_matches_uncached() {
        let counter = TokenCounter::new(16).unwrap();
        let text = "Return policy is 30 days";
        assert_eq!(counter.count(text), counter.count_cached(text));
        assert_eq!(counter.count_cached(text), counter.count_cached(text));
    }

    #[test]
    fn clones_share_cache() {
        let counter = TokenCounter::new(16).unwrap();
        let clone = counter.clone();
        assert_eq!(counter.count_cached("shared"), clone.count_cached("shared"));
    }
}
