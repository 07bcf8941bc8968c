//! messages + message_citations.

use rusqlite::{params, Connection};
use veil_core::errors::{StorageError, VeilResult};
use veil_core::models::{Citation, Message, Role};

use super::parse_timestamp;
use crate::to_storage_err;

/// Insert messages and their citations. The caller owns the transaction.
pub fn insert_messages(conn: &Connection, messages: &[Message]) -> VeilResult<()> {
    let mut insert_msg = conn
        .prepare_cached(
            "INSERT INTO messages (id, conversation_id, role, content, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    let mut insert_cit = conn
        .prepare_cached(
            "INSERT INTO message_citations
                (message_id, position, marker, source_id, chunk_id, label)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;

    for msg in messages {
        insert_msg
            .execute(params![
                msg.id,
                msg.conversation_id,
                msg.role.as_str(),
                msg.content,
                msg.created_at.to_rfc3339(),
            ])
            .map_err(|e| to_storage_err(e.to_string()))?;
        for (position, c) in msg.citations.iter().enumerate() {
            insert_cit
                .execute(params![
                    msg.id,
                    position as i64,
                    c.marker,
                    c.source_id,
                    c.chunk_id,
                    c.label,
                ])
                .map_err(|e| to_storage_err(e.to_string()))?;
        }
    }
    Ok(())
}

/// Last `limit` messages of a conversation, oldest first.
pub fn recent_messages(
    conn: &Connection,
    conversation_id: &str,
    limit: usize,
) -> VeilResult<Vec<Message>> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT id, conversation_id, role, content, created_at
             FROM messages
             WHERE conversation_id = ?1
             ORDER BY seq DESC
             LIMIT ?2",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;

    let rows = stmt
        .query_map(params![conversation_id, limit as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut out = Vec::new();
    for row in rows {
        let (id, conversation_id, role, content, created_at) =
            row.map_err(|e| to_storage_err(e.to_string()))?;
        let role = Role::parse(&role).ok_or_else(|| StorageError::DecodeFailed {
            reason: format!("unknown role '{role}' on message {id}"),
        })?;
        let citations = citations_for(conn, &id)?;
        out.push(Message {
            id,
            conversation_id,
            role,
            content,
            citations,
            created_at: parse_timestamp(&created_at)?,
        });
    }
    out.reverse();
    Ok(out)
}

fn citations_for(conn: &Connection, message_id: &str) -> VeilResult<Vec<Citation>> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT marker, source_id, chunk_id, label
             FROM message_citations
             WHERE message_id = ?1
             ORDER BY position",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![message_id], |row| {
            Ok(Citation {
                marker: row.get(0)?,
                source_id: row.get(1)?,
                chunk_id: row.get(2)?,
                label: row.get(3)?,
            })
        })
        .map_err(|e| to_storage_err(e.to_string()))?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))
}

pub fn count_messages(conn: &Connection, conversation_id: &str) -> VeilResult<usize> {
    let n: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM messages WHERE conversation_id = ?1",
            params![conversation_id],
            |row| row.get(0),
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(n as usize)
}
