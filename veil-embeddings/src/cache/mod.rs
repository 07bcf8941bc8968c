//! Embedding cache keyed by blake3 content hash.

mod moka_cache;

pub use moka_cache::MokaEmbeddingCache;

/// Cache key for `text` embedded by `provider`. Including the provider name
/// keeps vectors from different models apart.
pub fn cache_key(provider: &str, text: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(provider.as_bytes());
    hasher.update(&[0u8]);
    hasher.update(text.as_bytes());
    hasher.finalize().to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_depends_on_provider_and_text() {
        assert_eq!(cache_key("a", "x"), cache_key("a", "x"));
        assert_ne!(cache_key("a", "x"), cache_key("b", "x"));
        assert_ne!(cache_key("a", "x"), cache_key("a", "y"));
        // The separator keeps ("ab", "c") and ("a", "bc") apart.
        assert_ne!(cache_key("ab", "c"), cache_key("a", "bc"));
    }
}
