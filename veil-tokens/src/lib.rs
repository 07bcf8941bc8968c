//! # veil-tokens
//!
//! Token counting via `tiktoken-rs` (`cl100k_base`), cached per blake3
//! content hash, plus the sub-budget split used by context assembly.

pub mod budget;
pub mod counter;

pub use budget::{BudgetSplit, SubBudget};
pub use counter::TokenCounter;
