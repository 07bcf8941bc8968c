use async_trait::async_trait;

use crate::errors::VeilResult;
use crate::models::{Message, ViolationRecord};

/// Persistence for audited messages and the privacy audit log.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Persist messages atomically, in order.
    async fn append(&self, messages: &[Message]) -> VeilResult<()>;

    /// The most recent `limit` messages of a conversation, oldest first.
    async fn recent(&self, conversation_id: &str, limit: usize) -> VeilResult<Vec<Message>>;

    async fn record_violations(&self, records: &[ViolationRecord]) -> VeilResult<()>;

    async fn violations(&self, conversation_id: &str) -> VeilResult<Vec<ViolationRecord>>;
}
