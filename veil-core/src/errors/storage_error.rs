/// Persistence errors for the message store and audit log.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("SQLite error: {message}")]
    SqliteError { message: String },

    #[error("migration failed at version {version}: {reason}")]
    MigrationFailed { version: u32, reason: String },

    #[error("row decode failed: {reason}")]
    DecodeFailed { reason: String },
}
