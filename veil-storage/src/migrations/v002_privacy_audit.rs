//! v002: privacy_violations. Ids and fingerprint kind only, never content.

use rusqlite::Connection;
use veil_core::errors::VeilResult;

use crate::to_storage_err;

pub fn migrate(conn: &Connection) -> VeilResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS privacy_violations (
            id               INTEGER PRIMARY KEY AUTOINCREMENT,
            session_id       TEXT NOT NULL,
            conversation_id  TEXT NOT NULL,
            chatbot_id       TEXT NOT NULL,
            chunk_id         TEXT NOT NULL,
            source_id        TEXT NOT NULL,
            kind             TEXT NOT NULL,
            recorded_at      TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_violations_conversation
            ON privacy_violations(conversation_id);
        CREATE INDEX IF NOT EXISTS idx_violations_chunk
            ON privacy_violations(chunk_id);
        ",
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}
