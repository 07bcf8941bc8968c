//! Knowledge chunks and retrieval results.
//!
//! `Debug` on the retrieval types prints ids and scores only. Chunk content
//! never ends up in a log line by accident.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::namespace::Namespace;
use crate::errors::RetrievalError;

/// Disclosure class of a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Partition {
    /// May be quoted and attributed.
    Citable,
    /// Informs reasoning only. Never quoted, cited, or revealed.
    LearnOnly,
}

impl Partition {
    pub fn is_citable(self) -> bool {
        matches!(self, Self::Citable)
    }

    pub fn from_citable(is_citable: bool) -> Self {
        if is_citable {
            Self::Citable
        } else {
            Self::LearnOnly
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Citable => "citable",
            Self::LearnOnly => "learn_only",
        }
    }
}

/// A stored fragment of knowledge. Immutable once stored; written by the
/// ingestion side and only read by this pipeline.
#[derive(Clone, Serialize, Deserialize)]
pub struct KnowledgeChunk {
    pub id: String,
    pub source_id: String,
    pub namespace: Namespace,
    pub embedding: Vec<f32>,
    pub content: String,
    pub is_citable: bool,
    /// Human-readable source name used as the citation label.
    #[serde(default)]
    pub source_title: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl KnowledgeChunk {
    pub fn partition(&self) -> Partition {
        Partition::from_citable(self.is_citable)
    }

    /// Check the stored vector against the namespace dimensionality.
    /// A mismatch is data corruption, not a caller error.
    pub fn validate_embedding(&self, dimensions: usize) -> Result<(), RetrievalError> {
        if self.embedding.len() != dimensions {
            return Err(RetrievalError::CorruptChunk {
                chunk_id: self.id.clone(),
                reason: format!(
                    "embedding has {} dimensions, namespace expects {dimensions}",
                    self.embedding.len()
                ),
            });
        }
        if self.embedding.iter().any(|v| !v.is_finite()) {
            return Err(RetrievalError::CorruptChunk {
                chunk_id: self.id.clone(),
                reason: "embedding contains NaN or infinite values".to_string(),
            });
        }
        Ok(())
    }
}

impl fmt::Debug for KnowledgeChunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KnowledgeChunk")
            .field("id", &self.id)
            .field("source_id", &self.source_id)
            .field("namespace", &self.namespace)
            .field("dimensions", &self.embedding.len())
            .field("content_len", &self.content.len())
            .field("is_citable", &self.is_citable)
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// One row returned by a `VectorIndex` query.
#[derive(Clone, Serialize, Deserialize)]
pub struct IndexHit {
    pub chunk_id: String,
    pub source_id: String,
    /// Namespace the hit was stored under, echoed so callers can verify isolation.
    pub namespace: Namespace,
    pub content: String,
    /// Cosine similarity in [-1, 1].
    pub score: f32,
    pub is_citable: bool,
    #[serde(default)]
    pub source_title: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl IndexHit {
    pub fn from_chunk(chunk: &KnowledgeChunk, score: f32) -> Self {
        Self {
            chunk_id: chunk.id.clone(),
            source_id: chunk.source_id.clone(),
            namespace: chunk.namespace.clone(),
            content: chunk.content.clone(),
            score,
            is_citable: chunk.is_citable,
            source_title: chunk.source_title.clone(),
            created_at: chunk.created_at,
        }
    }
}

impl fmt::Debug for IndexHit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexHit")
            .field("chunk_id", &self.chunk_id)
            .field("source_id", &self.source_id)
            .field("namespace", &self.namespace)
            .field("score", &self.score)
            .field("is_citable", &self.is_citable)
            .finish_non_exhaustive()
    }
}

/// A chunk admitted into one partition of a retrieval result.
#[derive(Clone)]
pub struct ScoredChunk {
    pub chunk_id: String,
    pub source_id: String,
    pub source_title: Option<String>,
    pub content: String,
    pub partition: Partition,
    pub created_at: DateTime<Utc>,
    /// Similarity clamped to [-1, 1].
    pub similarity: f32,
}

impl ScoredChunk {
    pub fn from_hit(hit: IndexHit, partition: Partition) -> Self {
        Self {
            chunk_id: hit.chunk_id,
            source_id: hit.source_id,
            source_title: hit.source_title,
            content: hit.content,
            partition,
            created_at: hit.created_at,
            similarity: hit.score.clamp(-1.0, 1.0),
        }
    }

    /// Label shown to users when this chunk is cited.
    pub fn label(&self) -> &str {
        self.source_title.as_deref().unwrap_or(&self.source_id)
    }
}

impl fmt::Debug for ScoredChunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScoredChunk")
            .field("chunk_id", &self.chunk_id)
            .field("source_id", &self.source_id)
            .field("partition", &self.partition)
            .field("similarity", &self.similarity)
            .finish_non_exhaustive()
    }
}

/// Partitioned retrieval output. Ephemeral: built per query, consumed by the
/// context builder, never persisted.
#[derive(Debug, Clone, Default)]
pub struct RetrievalResult {
    pub citable: Vec<ScoredChunk>,
    pub learn_only: Vec<ScoredChunk>,
}

impl RetrievalResult {
    pub fn is_empty(&self) -> bool {
        self.citable.is_empty() && self.learn_only.is_empty()
    }

    pub fn len(&self) -> usize {
        self.citable.len() + self.learn_only.len()
    }

    pub fn citable_ids(&self) -> Vec<&str> {
        self.citable.iter().map(|c| c.chunk_id.as_str()).collect()
    }

    pub fn learn_only_ids(&self) -> Vec<&str> {
        self.learn_only.iter().map(|c| c.chunk_id.as_str()).collect()
    }
}
