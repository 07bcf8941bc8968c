//! Collaborator seams. The pipeline depends on these traits only, never on a
//! concrete backend.

mod embedding;
mod language_model;
mod message_store;
mod vector_index;

pub use embedding::{EmbeddingCache, EmbeddingProvider};
pub use language_model::LanguageModel;
pub use message_store::MessageStore;
pub use vector_index::VectorIndex;
