//! # veil-core
//!
//! Foundation crate for the Veil pipeline.
//! Defines the data model, collaborator traits, errors, and config.
//! Every other crate in the workspace depends on this.

pub mod config;
pub mod errors;
pub mod models;
pub mod traits;

// Re-export the most commonly used types at the crate root.
pub use config::VeilConfig;
pub use errors::{VeilError, VeilResult};
pub use models::{
    AssembledContext, ChatTurnRequest, Citation, GenerationState, IndexHit, KnowledgeChunk,
    Message, Namespace, RetrievalResult, Role, ScoredChunk, StreamEvent,
};
