//! knowledge_chunks: upsert and partition scans for the SQLite vector index.

use rusqlite::{params, Connection};
use veil_core::errors::{RetrievalError, VeilResult};
use veil_core::models::{KnowledgeChunk, Namespace, Partition};

use super::parse_timestamp;
use crate::to_storage_err;

/// Insert or replace a chunk. The caller validates dimensionality first.
pub fn upsert_chunk(conn: &Connection, chunk: &KnowledgeChunk) -> VeilResult<()> {
    conn.execute(
        "INSERT INTO knowledge_chunks
            (id, source_id, namespace, is_citable, content, source_title,
             embedding, dimensions, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
         ON CONFLICT(id) DO UPDATE SET
            source_id = excluded.source_id,
            namespace = excluded.namespace,
            is_citable = excluded.is_citable,
            content = excluded.content,
            source_title = excluded.source_title,
            embedding = excluded.embedding,
            dimensions = excluded.dimensions,
            created_at = excluded.created_at",
        params![
            chunk.id,
            chunk.source_id,
            chunk.namespace.as_str(),
            chunk.is_citable as i64,
            chunk.content,
            chunk.source_title,
            f32_vec_to_bytes(&chunk.embedding),
            chunk.embedding.len() as i64,
            chunk.created_at.to_rfc3339(),
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

pub fn delete_chunk(conn: &Connection, chunk_id: &str) -> VeilResult<bool> {
    let n = conn
        .execute("DELETE FROM knowledge_chunks WHERE id = ?1", params![chunk_id])
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(n > 0)
}

/// Every chunk of one namespace, optionally limited to one partition, in id
/// order. Rows that fail to decode come back as `CorruptChunk` so the caller
/// can skip them without failing the whole scan.
pub fn scan_chunks(
    conn: &Connection,
    namespace: &Namespace,
    partition: Option<Partition>,
) -> VeilResult<Vec<Result<KnowledgeChunk, RetrievalError>>> {
    let citable_filter: Option<i64> = partition.map(|p| p.is_citable() as i64);
    let mut stmt = conn
        .prepare_cached(
            "SELECT id, source_id, namespace, is_citable, content, source_title,
                    embedding, dimensions, created_at
             FROM knowledge_chunks
             WHERE namespace = ?1 AND (?2 IS NULL OR is_citable = ?2)
             ORDER BY id",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;

    let rows = stmt
        .query_map(params![namespace.as_str(), citable_filter], |row| {
            Ok(RawChunk {
                id: row.get(0)?,
                source_id: row.get(1)?,
                namespace: row.get(2)?,
                is_citable: row.get::<_, i64>(3)? != 0,
                content: row.get(4)?,
                source_title: row.get(5)?,
                embedding: row.get(6)?,
                dimensions: row.get(7)?,
                created_at: row.get(8)?,
            })
        })
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut out = Vec::new();
    for row in rows {
        let raw = row.map_err(|e| to_storage_err(e.to_string()))?;
        out.push(raw.decode());
    }
    Ok(out)
}

pub fn count_chunks(conn: &Connection, namespace: &Namespace) -> VeilResult<usize> {
    let n: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM knowledge_chunks WHERE namespace = ?1",
            params![namespace.as_str()],
            |row| row.get(0),
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(n as usize)
}

struct RawChunk {
    id: String,
    source_id: String,
    namespace: String,
    is_citable: bool,
    content: String,
    source_title: Option<String>,
    embedding: Vec<u8>,
    dimensions: i64,
    created_at: String,
}

impl RawChunk {
    fn decode(self) -> Result<KnowledgeChunk, RetrievalError> {
        let corrupt = |reason: String| RetrievalError::CorruptChunk {
            chunk_id: self.id.clone(),
            reason,
        };
        let embedding = bytes_to_f32_vec(&self.embedding)
            .ok_or_else(|| corrupt("embedding blob is not a whole number of f32 values".into()))?;
        if embedding.len() as i64 != self.dimensions {
            return Err(corrupt(format!(
                "blob holds {} values, row says {}",
                embedding.len(),
                self.dimensions
            )));
        }
        let namespace = Namespace::parse(&self.namespace)
            .map_err(|e| corrupt(format!("stored namespace invalid: {e}")))?;
        let created_at =
            parse_timestamp(&self.created_at).map_err(|e| corrupt(e.to_string()))?;

        Ok(KnowledgeChunk {
            id: self.id.clone(),
            source_id: self.source_id.clone(),
            namespace,
            embedding,
            content: self.content.clone(),
            is_citable: self.is_citable,
            source_title: self.source_title.clone(),
            created_at,
        })
    }
}

/// Little-endian f32 encoding.
pub fn f32_vec_to_bytes(v: &[f32]) -> Vec<u8> {
    v.iter().flat_map(|f| f.to_le_bytes()).collect()
}

pub fn bytes_to_f32_vec(bytes: &[u8]) -> Option<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return None;
    }
    Some(
        bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_encoding_is_little_endian() {
        let bytes = f32_vec_to_bytes(&[1.0]);
        assert_eq!(bytes, 1.0f32.to_le_bytes().to_vec());
        assert_eq!(bytes_to_f32_vec(&bytes), Some(vec![1.0]));
    }

    #[test]
    fn truncated_blob_is_rejected() {
        assert_eq!(bytes_to_f32_vec(&[0, 0, 128]), None);
    }
}
