//! Versioned schema migrations tracked by `PRAGMA user_version`.

mod v001_messages;
mod v002_privacy_audit;
mod v003_knowledge_chunks;

use rusqlite::Connection;
use tracing::info;
use veil_core::errors::{StorageError, VeilResult};

type Migration = fn(&Connection) -> VeilResult<()>;

const MIGRATIONS: &[(u32, Migration)] = &[
    (1, v001_messages::migrate),
    (2, v002_privacy_audit::migrate),
    (3, v003_knowledge_chunks::migrate),
];

/// Latest schema version.
pub const LATEST_VERSION: u32 = 3;

pub fn current_version(conn: &Connection) -> VeilResult<u32> {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
        .map_err(|e| crate::to_storage_err(e.to_string()))
}

/// Apply every migration newer than the stored version, each in its own
/// transaction.
pub fn run_migrations(conn: &mut Connection) -> VeilResult<()> {
    let current = current_version(conn)?;
    for &(version, migrate) in MIGRATIONS.iter().filter(|(v, _)| *v > current) {
        let failed = |reason: String| StorageError::MigrationFailed { version, reason };

        let tx = conn.transaction().map_err(|e| failed(e.to_string()))?;
        migrate(&tx).map_err(|e| failed(e.to_string()))?;
        tx.pragma_update(None, "user_version", version)
            .map_err(|e| failed(e.to_string()))?;
        tx.commit().map_err(|e| failed(e.to_string()))?;

        info!(event = "migration_applied", version, "schema migrated");
    }
    Ok(())
}
