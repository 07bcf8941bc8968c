//! privacy_violations audit log.

use rusqlite::{params, Connection};
use veil_core::errors::{StorageError, VeilResult};
use veil_core::models::{FingerprintKind, ViolationRecord};

use super::parse_timestamp;
use crate::to_storage_err;

pub fn insert_violations(conn: &Connection, records: &[ViolationRecord]) -> VeilResult<()> {
    let mut stmt = conn
        .prepare_cached(
            "INSERT INTO privacy_violations
                (session_id, conversation_id, chatbot_id, chunk_id, source_id, kind, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    for r in records {
        stmt.execute(params![
            r.session_id,
            r.conversation_id,
            r.chatbot_id,
            r.chunk_id,
            r.source_id,
            r.kind.as_str(),
            r.recorded_at.to_rfc3339(),
        ])
        .map_err(|e| to_storage_err(e.to_string()))?;
    }
    Ok(())
}

/// All violations recorded for a conversation, in insertion order.
pub fn violations_for(conn: &Connection, conversation_id: &str) -> VeilResult<Vec<ViolationRecord>> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT session_id, conversation_id, chatbot_id, chunk_id, source_id, kind, recorded_at
             FROM privacy_violations
             WHERE conversation_id = ?1
             ORDER BY id",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![conversation_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
            ))
        })
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut out = Vec::new();
    for row in rows {
        let (session_id, conversation_id, chatbot_id, chunk_id, source_id, kind, recorded_at) =
            row.map_err(|e| to_storage_err(e.to_string()))?;
        let kind = FingerprintKind::parse(&kind).ok_or_else(|| StorageError::DecodeFailed {
            reason: format!("unknown fingerprint kind '{kind}'"),
        })?;
        out.push(ViolationRecord {
            session_id,
            conversation_id,
            chatbot_id,
            chunk_id,
            source_id,
            kind,
            recorded_at: parse_timestamp(&recorded_at)?,
        });
    }
    Ok(out)
}
