//! SQLite backend over the `knowledge_chunks` table.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;
use veil_core::errors::{RetrievalError, VeilError, VeilResult};
use veil_core::models::{IndexHit, KnowledgeChunk, Namespace, Partition};
use veil_core::traits::VectorIndex;
use veil_storage::queries::chunks;
use veil_storage::WriteConnection;

use crate::similarity::{check_query, cosine_similarity, is_zero_norm, rank_hits};

/// Brute-force scan of one namespace partition per query. Rows that fail to
/// decode or have the wrong dimensionality are skipped and logged by id.
pub struct SqliteVectorIndex {
    conn: Arc<WriteConnection>,
    dimensions: usize,
}

impl SqliteVectorIndex {
    pub fn new(conn: Arc<WriteConnection>, dimensions: usize) -> Self {
        Self { conn, dimensions }
    }

    pub fn open_in_memory(dimensions: usize) -> VeilResult<Self> {
        Ok(Self::new(Arc::new(WriteConnection::open_in_memory()?), dimensions))
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub async fn insert(&self, chunk: &KnowledgeChunk) -> VeilResult<()> {
        chunk.validate_embedding(self.dimensions)?;
        self.conn
            .with_conn(|conn| chunks::upsert_chunk(conn, chunk))
            .await
    }

    pub async fn remove(&self, chunk_id: &str) -> VeilResult<bool> {
        self.conn
            .with_conn(|conn| chunks::delete_chunk(conn, chunk_id))
            .await
    }

    pub async fn len(&self, namespace: &Namespace) -> VeilResult<usize> {
        self.conn
            .with_conn(|conn| chunks::count_chunks(conn, namespace))
            .await
    }
}

#[async_trait]
impl VectorIndex for SqliteVectorIndex {
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

        let rows = self
            .conn
            .with_conn(|conn| chunks::scan_chunks(conn, namespace, partition))
            .await
            .map_err(|e| match e {
                VeilError::Storage(inner) => VeilError::from(RetrievalError::IndexUnavailable {
                    reason: inner.to_string(),
                }),
                other => other,
            })?;

        let mut hits = Vec::with_capacity(rows.len());
        for row in rows {
            let chunk = match row.and_then(|c| c.validate_embedding(self.dimensions).map(|_| c)) {
                Ok(chunk) => chunk,
                Err(RetrievalError::CorruptChunk { chunk_id, reason }) => {
                    warn!(event = "corrupt_chunk_skipped", chunk_id = %chunk_id, reason = %reason);
                    continue;
                }
                Err(other) => return Err(other.into()),
            };
            let score = cosine_similarity(embedding, &chunk.embedding);
            hits.push(IndexHit::from_chunk(&chunk, score));
        }
        Ok(rank_hits(hits, top_k))
    }

    fn name(&self) -> &str {
        "sqlite"
    }
}
