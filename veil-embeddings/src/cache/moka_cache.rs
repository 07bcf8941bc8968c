//! In-memory cache using moka: TinyLFU admission, per-entry TTL.

use std::time::Duration;

use moka::sync::Cache;
use veil_core::config::EmbeddingConfig;
use veil_core::traits::EmbeddingCache;

pub struct MokaEmbeddingCache {
    cache: Cache<String, Vec<f32>>,
}

impl MokaEmbeddingCache {
    pub fn new(max_entries: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();
        Self { cache }
    }

    pub fn from_config(config: &EmbeddingConfig) -> Self {
        Self::new(
            config.cache_capacity,
            Duration::from_secs(config.cache_ttl_secs),
        )
    }

    /// Number of entries currently in the cache (eventually consistent).
    pub fn len(&self) -> u64 {
        self.cache.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.cache.invalidate_all();
    }
}

impl EmbeddingCache for MokaEmbeddingCache {
    fn get(&self, key: &str) -> Option<Vec<f32>> {
        self.cache.get(key)
    }

    fn put(&self, key: String, embedding: Vec<f32>) {
        self.cache.insert(key, embedding);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_get() {
        let cache = MokaEmbeddingCache::new(100, Duration::from_secs(60));
        cache.put("abc".to_string(), vec![1.0, 2.0]);
        assert_eq!(cache.get("abc"), Some(vec![1.0, 2.0]));
        assert_eq!(cache.get("missing"), None);
    }

    #[test]
    fn entries_expire_after_ttl() {
        let cache = MokaEmbeddingCache::new(100, Duration::from_millis(20));
        cache.put("k".to_string(), vec![1.0]);
        std::thread::sleep(Duration::from_millis(60));
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn clear_empties_cache() {
        let cache = MokaEmbeddingCache::new(100, Duration::from_secs(60));
        cache.put("a".to_string(), vec![1.0]);
        cache.clear();
        assert_eq!(cache.get("a"), None);
    }
}
