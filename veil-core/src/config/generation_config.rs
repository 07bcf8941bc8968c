use serde::{Deserialize, Serialize};

use super::defaults;

/// GenerationOrchestrator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Capacity of the model → orchestrator token channel. 1 means strict backpressure.
    pub stream_channel_capacity: usize,
    /// Capacity of the orchestrator → caller event channel created by `ChatService`.
    pub event_channel_capacity: usize,
    /// Number of persisted messages from the conversation fed back to the model.
    pub history_turns: usize,
    /// Forward tokens before the audit completes. When false, text is released only after audit.
    pub stream_provisional_tokens: bool,
    /// Message delivered instead of a response that failed the privacy audit.
    pub fallback_message: String,
    pub max_output_tokens: u32,
    pub temperature: f32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            stream_channel_capacity: defaults::DEFAULT_STREAM_CHANNEL_CAPACITY,
            event_channel_capacity: defaults::DEFAULT_EVENT_CHANNEL_CAPACITY,
            history_turns: defaults::DEFAULT_HISTORY_TURNS,
            stream_provisional_tokens: defaults::DEFAULT_STREAM_PROVISIONAL_TOKENS,
            fallback_message: defaults::DEFAULT_FALLBACK_MESSAGE.to_string(),
            max_output_tokens: defaults::DEFAULT_MAX_OUTPUT_TOKENS,
            temperature: defaults::DEFAULT_TEMPERATURE,
        }
    }
}
