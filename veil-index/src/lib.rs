//! # veil-index
//!
//! `VectorIndex` backends. Both are brute-force cosine scans scoped to one
//! namespace and, optionally, one partition:
//!
//! - [`InMemoryVectorIndex`]: `RwLock`-guarded maps, for tests and small bots.
//! - [`SqliteVectorIndex`]: chunks stored as f32 blobs in the shared database.

pub mod memory;
pub mod similarity;
pub mod sqlite;

pub use memory::InMemoryVectorIndex;
pub use similarity::{cosine_similarity, rank_hits};
pub use sqlite::SqliteVectorIndex;
