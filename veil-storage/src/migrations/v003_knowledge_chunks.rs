//! v003: knowledge_chunks with little-endian f32 embedding blobs.

use rusqlite::Connection;
use veil_core::errors::VeilResult;

use crate::to_storage_err;

pub fn migrate(conn: &Connection) -> VeilResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS knowledge_chunks (
            id            TEXT PRIMARY KEY,
            source_id     TEXT NOT NULL,
            namespace     TEXT NOT NULL,
            is_citable    INTEGER NOT NULL CHECK (is_citable IN (0, 1)),
            content       TEXT NOT NULL,
            source_title  TEXT,
            embedding     BLOB NOT NULL,
            dimensions    INTEGER NOT NULL,
            created_at    TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_chunks_namespace_partition
            ON knowledge_chunks(namespace, is_citable);
        ",
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}
