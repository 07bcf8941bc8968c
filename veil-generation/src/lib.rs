//! # veil-generation
//!
//! Drives one chat turn from query to audited delivery:
//! embed → retrieve → build context → stream the model through the
//! [`CitationExtractor`] → audit → persist and deliver, block, or fail.
//!
//! Each turn owns its [`GenerationSession`] exclusively. [`ChatService`]
//! spawns one task per turn and hands the caller an event stream plus a
//! [`CancellationToken`].

pub mod cancel;
pub mod citation;
pub mod model;
pub mod orchestrator;
pub mod prompt;
pub mod registry;
pub mod service;
pub mod session;

pub use cancel::CancellationToken;
pub use citation::CitationExtractor;
pub use model::HttpChatModel;
pub use orchestrator::{Collaborators, GenerationOrchestrator, TurnOutcome};
pub use registry::SessionRegistry;
pub use service::{ChatResponse, ChatService, ResponseStatus, TurnHandle};
pub use session::GenerationSession;
