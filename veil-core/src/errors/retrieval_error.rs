/// Retrieval and context-assembly errors.
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("invalid embedding: {reason}")]
    InvalidEmbedding { reason: String },

    #[error("invalid namespace: {reason}")]
    InvalidNamespace { reason: String },

    #[error("vector index unavailable: {reason}")]
    IndexUnavailable { reason: String },

    #[error("context budget too small: top chunk needs {needed} tokens, budget is {available}")]
    BudgetTooSmall { needed: usize, available: usize },

    #[error("corrupt chunk {chunk_id}: {reason}")]
    CorruptChunk { chunk_id: String, reason: String },
}

impl RetrievalError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidEmbedding { .. } => "invalid_embedding",
            Self::InvalidNamespace { .. } => "invalid_namespace",
            Self::IndexUnavailable { .. } => "index_unavailable",
            Self::BudgetTooSmall { .. } => "budget_too_small",
            Self::CorruptChunk { .. } => "corrupt_chunk",
        }
    }
}
