//! Data model shared across the pipeline.

pub mod audit;
pub mod chunk;
pub mod context;
pub mod message;
pub mod namespace;
pub mod request;
pub mod state;
pub mod stream_event;

pub use audit::{AuditVerdict, FingerprintKind, Violation, ViolationRecord};
pub use chunk::{IndexHit, KnowledgeChunk, Partition, RetrievalResult, ScoredChunk};
pub use context::{AssembledContext, CitationTarget};
pub use message::{Citation, Message, Role};
pub use namespace::Namespace;
pub use request::{ChatTurnRequest, CompletionRequest, ModelEvent, PromptMessage};
pub use state::GenerationState;
pub use stream_event::{CitationRef, StreamEvent};
