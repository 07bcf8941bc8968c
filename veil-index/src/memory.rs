//! In-memory backend.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;
use veil_core::errors::VeilResult;
use veil_core::models::{IndexHit, KnowledgeChunk, Namespace, Partition};
use veil_core::traits::VectorIndex;

use crate::similarity::{check_query, cosine_similarity, is_zero_norm, rank_hits};

/// Chunks keyed by namespace, then id. A query only ever touches its own
/// namespace's map.
pub struct InMemoryVectorIndex {
    dimensions: usize,
    shards: RwLock<HashMap<Namespace, BTreeMap<String, KnowledgeChunk>>>,
}

impl InMemoryVectorIndex {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            shards: RwLock::new(HashMap::new()),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Store a chunk, replacing any chunk with the same id in its namespace.
    /// Rejects vectors of the wrong length or with non-finite values.
    pub fn insert(&self, chunk: KnowledgeChunk) -> VeilResult<()> {
        chunk.validate_embedding(self.dimensions)?;
        let mut shards = self.shards.write().unwrap_or_else(|e| e.into_inner());
        shards
            .entry(chunk.namespace.clone())
            .or_default()
            .insert(chunk.id.clone(), chunk);
        Ok(())
    }

    pub fn insert_all(&self, chunks: impl IntoIterator<Item = KnowledgeChunk>) -> VeilResult<()> {
        for chunk in chunks {
            self.insert(chunk)?;
        }
        Ok(())
    }

    pub fn remove(&self, namespace: &Namespace, chunk_id: &str) -> bool {
        let mut shards = self.shards.write().unwrap_or_else(|e| e.into_inner());
        shards
            .get_mut(namespace)
            .map(|shard| shard.remove(chunk_id).is_some())
            .unwrap_or(false)
    }

    pub fn len(&self, namespace: &Namespace) -> usize {
        let shards = self.shards.read().unwrap_or_else(|e| e.into_inner());
        shards.get(namespace).map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self, namespace: &Namespace) -> bool {
        self.len(namespace) == 0
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn query(
        &self,
        namespace: &Namespace,
        embedding: &[f32],
        top_k: usize,
        partition: Option<Partition>,
    ) -> VeilResult<Vec<IndexHit>> {
        check_query(embedding, self.dimensions)?;
        if top_k == 0 || is_zero_norm(embedding) {
            return Ok(Vec::new());
        }

        let shards = self.shards.read().unwrap_or_else(|e| e.into_inner());
        let Some(shard) = shards.get(namespace) else {
            return Ok(Vec::new());
        };
        let hits = shard
            .values()
            .filter(|c| partition.map_or(true, |p| c.partition() == p))
            .map(|c| IndexHit::from_chunk(c, cosine_similarity(embedding, &c.embedding)))
            .collect();
        Ok(rank_hits(hits, top_k))
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}
