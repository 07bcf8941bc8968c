use serde::{Deserialize, Serialize};

use super::message::Role;

/// Inbound chat turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurnRequest {
    pub chatbot_id: String,
    pub conversation_id: String,
    pub user_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: Role,
    pub content: String,
}

/// Everything the language model receives for one completion.
#[derive(Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub citable_block: String,
    pub learn_only_block: String,
    pub history: Vec<PromptMessage>,
    pub user_text: String,
    pub max_output_tokens: u32,
    pub temperature: f32,
}

impl std::fmt::Debug for CompletionRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionRequest")
            .field("history_len", &self.history.len())
            .field("max_output_tokens", &self.max_output_tokens)
            .field("temperature", &self.temperature)
            .finish_non_exhaustive()
    }
}

/// One item of a model token stream. A well-formed stream ends with `Done`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelEvent {
    Token(String),
    Done,
}
