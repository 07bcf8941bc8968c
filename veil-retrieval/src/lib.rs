//! # veil-retrieval
//!
//! The two steps between a query embedding and a prompt:
//!
//! 1. [`PrivacyRetriever`] queries the citable and learn-only partitions of one
//!    namespace independently and returns a [`RetrievalResult`].
//! 2. [`ContextBuilder`] trims both partitions into separate token sub-budgets
//!    and renders the citable block (with `[CITABLE-n]` markers) and the
//!    learn-only block (no markers, wrapped in non-disclosure instructions).
//!
//! [`RetrievalResult`]: veil_core::models::RetrievalResult

pub mod context;
pub mod markers;
pub mod retriever;

pub use context::ContextBuilder;
pub use markers::MarkerSyntax;
pub use retriever::PrivacyRetriever;
