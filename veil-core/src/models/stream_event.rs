use serde::{Deserialize, Serialize};

/// Citation as sent to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationRef {
    pub source_id: String,
    pub label: String,
}

/// Ordered events on the streaming connection to the caller.
///
/// A turn emits `TypingStart`, zero or more `MessageToken`s, and exactly one
/// terminal event (`MessageComplete`, `MessageBlocked`, or `MessageError`).
/// A cancelled turn emits no terminal event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    TypingStart,
    MessageToken {
        content: String,
    },
    MessageComplete {
        message_id: String,
        citations: Vec<CitationRef>,
    },
    MessageBlocked {
        reason: String,
    },
    MessageError {
        message: String,
        retryable: bool,
    },
}

impl StreamEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::MessageComplete { .. } | Self::MessageBlocked { .. } | Self::MessageError { .. }
        )
    }
}
