//! Error taxonomy. One enum per subsystem, folded into `VeilError`.

mod config_error;
mod generation_error;
mod retrieval_error;
mod storage_error;

pub use config_error::ConfigError;
pub use generation_error::GenerationError;
pub use retrieval_error::RetrievalError;
pub use storage_error::StorageError;

/// Generic text shown to end users when a turn fails. Internal error strings
/// never reach the client.
pub const GENERIC_FAILURE_MESSAGE: &str =
    "Something went wrong while answering. Please try again.";

/// Top-level error for every fallible operation in the workspace.
#[derive(Debug, thiserror::Error)]
pub enum VeilError {
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Learn-only content reached a response. Turns never fail with this:
    /// the orchestrator ends them as `TurnOutcome::Blocked`, which derives
    /// this value for its `turn_blocked` log event.
    #[error("privacy violation: {} learn-only chunk(s) leaked", chunk_ids.len())]
    PrivacyViolation { chunk_ids: Vec<String> },

    #[error("circuit open for {component}: shedding load")]
    CircuitOpen { component: String },
}

pub type VeilResult<T> = Result<T, VeilError>;

impl VeilError {
    /// Whether the caller may retry the same request after a backoff.
    ///
    /// Caller bugs (`InvalidNamespace`, `InvalidEmbedding`) and privacy
    /// violations are never retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Retrieval(RetrievalError::IndexUnavailable { .. }) => true,
            Self::Generation(GenerationError::ModelUnavailable { .. })
            | Self::Generation(GenerationError::EmbeddingUnavailable { .. }) => true,
            Self::CircuitOpen { .. } => true,
            _ => false,
        }
    }

    /// Text safe to show to an end user for this error.
    pub fn user_message(&self) -> &'static str {
        GENERIC_FAILURE_MESSAGE
    }

    /// Short, stable label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Retrieval(e) => e.kind(),
            Self::Generation(e) => e.kind(),
            Self::Storage(_) => "storage",
            Self::Config(_) => "config",
            Self::PrivacyViolation { .. } => "privacy_violation",
            Self::CircuitOpen { .. } => "circuit_open",
        }
    }
}
