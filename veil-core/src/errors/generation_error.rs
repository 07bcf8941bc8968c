use crate::models::GenerationState;

/// Errors raised while embedding the query or driving the model stream.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("language model unavailable: {reason}")]
    ModelUnavailable { reason: String },

    #[error("embedding provider unavailable: {reason}")]
    EmbeddingUnavailable { reason: String },

    #[error("model stream protocol error: {reason}")]
    StreamProtocol { reason: String },

    #[error("invalid session transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: GenerationState,
        to: GenerationState,
    },
}

impl GenerationError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ModelUnavailable { .. } => "model_unavailable",
            Self::EmbeddingUnavailable { .. } => "embedding_unavailable",
            Self::StreamProtocol { .. } => "stream_protocol",
            Self::InvalidTransition { .. } => "invalid_transition",
        }
    }
}
