use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            _ => None,
        }
    }
}

/// A citation attached to a delivered message. Always points at a citable chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub marker: String,
    pub source_id: String,
    pub chunk_id: String,
    pub label: String,
}

/// A persisted conversation message. Assistant messages are only created from
/// audited text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub role: Role,
    pub content: String,
    pub citations: Vec<Citation>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn user(conversation_id: &str, content: &str) -> Self {
        Self::new(conversation_id, Role::User, content.to_string(), Vec::new())
    }

    pub fn assistant(conversation_id: &str, content: String, citations: Vec<Citation>) -> Self {
        Self::new(conversation_id, Role::Assistant, content, citations)
    }

    fn new(conversation_id: &str, role: Role, content: String, citations: Vec<Citation>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            conversation_id: conversation_id.to_string(),
            role,
            content,
            citations,
            created_at: Utc::now(),
        }
    }
}
