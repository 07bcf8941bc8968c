//! # veil-storage
//!
//! SQLite persistence: one write connection behind an async mutex, versioned
//! migrations, and [`SqliteMessageStore`] implementing `MessageStore`.
//! The knowledge-chunk table lives in the same schema and is queried by
//! `veil-index`.

pub mod migrations;
pub mod pool;
pub mod queries;
pub mod store;

pub use pool::WriteConnection;
pub use store::SqliteMessageStore;

use veil_core::errors::{StorageError, VeilError};

/// Wrap a rusqlite (or row decoding) failure as a storage error.
pub fn to_storage_err(message: String) -> VeilError {
    StorageError::SqliteError { message }.into()
}
