//! v001: messages, message_citations.

use rusqlite::Connection;
use veil_core::errors::VeilResult;

use crate::to_storage_err;

pub fn migrate(conn: &Connection) -> VeilResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS messages (
            seq              INTEGER PRIMARY KEY AUTOINCREMENT,
            id               TEXT NOT NULL UNIQUE,
            conversation_id  TEXT NOT NULL,
            role             TEXT NOT NULL CHECK (role IN ('user', 'assistant')),
            content          TEXT NOT NULL,
            created_at       TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_messages_conversation
            ON messages(conversation_id, seq);

        CREATE TABLE IF NOT EXISTS message_citations (
            message_id  TEXT NOT NULL,
            position    INTEGER NOT NULL,
            marker      TEXT NOT NULL,
            source_id   TEXT NOT NULL,
            chunk_id    TEXT NOT NULL,
            label       TEXT NOT NULL,
            PRIMARY KEY (message_id, position),
            FOREIGN KEY (message_id) REFERENCES messages(id) ON DELETE CASCADE
        );
        ",
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}
