//! # veil-embeddings
//!
//! Query embedding for the retrieval step.
//!
//! ## Architecture
//!
//! ```text
//! QueryEmbedder
//! ├── EmbeddingCache (moka, content-hash key, TTL)
//! ├── Guard (timeout + circuit breaker + retry)
//! ├── EmbeddingProvider
//! │   ├── HttpEmbeddingProvider (OpenAI-compatible /embeddings)
//! │   └── HashingEmbedder (deterministic, offline)
//! └── validation (dimensions, finite values)
//! ```

pub mod cache;
pub mod embedder;
pub mod providers;
pub mod validation;

pub use cache::{cache_key, MokaEmbeddingCache};
pub use embedder::QueryEmbedder;
pub use providers::{create_provider, HashingEmbedder, HttpEmbeddingProvider};
