//! SqliteMessageStore: the `MessageStore` implementation.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use veil_core::config::StorageConfig;
use veil_core::errors::VeilResult;
use veil_core::models::{Message, ViolationRecord};
use veil_core::traits::MessageStore;

use crate::pool::WriteConnection;
use crate::queries::{messages, violations};
use crate::to_storage_err;

#[derive(Clone)]
pub struct SqliteMessageStore {
    conn: Arc<WriteConnection>,
}

impl SqliteMessageStore {
    pub fn new(conn: Arc<WriteConnection>) -> Self {
        Self { conn }
    }

    pub fn open(path: &Path, busy_timeout_ms: u32) -> VeilResult<Self> {
        Ok(Self::new(Arc::new(WriteConnection::open(path, busy_timeout_ms)?)))
    }

    pub fn open_in_memory() -> VeilResult<Self> {
        Ok(Self::new(Arc::new(WriteConnection::open_in_memory()?)))
    }

    pub fn from_config(config: &StorageConfig) -> VeilResult<Self> {
        Ok(Self::new(Arc::new(WriteConnection::from_config(config)?)))
    }

    /// The shared connection, for backends that live in the same database.
    pub fn connection(&self) -> &Arc<WriteConnection> {
        &self.conn
    }

    pub async fn count(&self, conversation_id: &str) -> VeilResult<usize> {
        self.conn
            .with_conn(|conn| messages::count_messages(conn, conversation_id))
            .await
    }
}

#[async_trait]
impl MessageStore for SqliteMessageStore {
    async fn append(&self, batch: &[Message]) -> VeilResult<()> {
        if batch.is_empty() {
            return Ok(());
        }
        self.conn
            .with_conn(|conn| {
                let tx = conn
                    .transaction()
                    .map_err(|e| to_storage_err(e.to_string()))?;
                messages::insert_messages(&tx, batch)?;
                tx.commit().map_err(|e| to_storage_err(e.to_string()))
            })
            .await?;
        debug!(event = "messages_persisted", count = batch.len());
        Ok(())
    }

    async fn recent(&self, conversation_id: &str, limit: usize) -> VeilResult<Vec<Message>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        self.conn
            .with_conn(|conn| messages::recent_messages(conn, conversation_id, limit))
            .await
    }

    async fn record_violations(&self, records: &[ViolationRecord]) -> VeilResult<()> {
        if records.is_empty() {
            return Ok(());
        }
        self.conn
            .with_conn(|conn| {
                let tx = conn
                    .transaction()
                    .map_err(|e| to_storage_err(e.to_string()))?;
                violations::insert_violations(&tx, records)?;
                tx.commit().map_err(|e| to_storage_err(e.to_string()))
            })
            .await
    }

    async fn violations(&self, conversation_id: &str) -> VeilResult<Vec<ViolationRecord>> {
        self.conn
            .with_conn(|conn| violations::violations_for(conn, conversation_id))
            .await
    }
}
