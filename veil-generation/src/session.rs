//! Per-turn mutable state, owned by exactly one orchestration task.

use std::time::{Duration, Instant};

use veil_core::errors::GenerationError;
use veil_core::models::{Citation, GenerationState};

/// One in-flight generation. Never shared: the orchestrator holds it by
/// `&mut` for the whole turn and drops it once the turn is terminal.
#[derive(Debug)]
pub struct GenerationSession {
    id: String,
    state: GenerationState,
    /// Raw model output, exactly as streamed.
    token_buffer: String,
    /// Output after citation extraction; what the user would see.
    visible: String,
    emitted_citations: Vec<Citation>,
    tokens_received: usize,
    tokens_forwarded: usize,
    started_at: Instant,
    first_token_at: Option<Instant>,
}

impl GenerationSession {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: GenerationState::Idle,
            token_buffer: String::new(),
            visible: String::new(),
            emitted_citations: Vec::new(),
            tokens_received: 0,
            tokens_forwarded: 0,
            started_at: Instant::now(),
            first_token_at: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> GenerationState {
        self.state
    }

    /// Move to `next`, rejecting edges the state machine does not have.
    pub fn transition(&mut self, next: GenerationState) -> Result<(), GenerationError> {
        if !self.state.can_transition_to(next) {
            return Err(GenerationError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        tracing::trace!(
            session_id = %self.id,
            from = self.state.as_str(),
            to = next.as_str(),
            "session transition"
        );
        self.state = next;
        Ok(())
    }

    /// Append one raw model token. Returns true for the first token of the turn.
    pub fn push_token(&mut self, token: &str) -> bool {
        self.token_buffer.push_str(token);
        self.tokens_received += 1;
        if self.first_token_at.is_none() {
            self.first_token_at = Some(Instant::now());
            return true;
        }
        false
    }

    pub fn push_visible(&mut self, text: &str) {
        self.visible.push_str(text);
    }

    pub fn mark_forwarded(&mut self) {
        self.tokens_forwarded += 1;
    }

    pub fn set_citations(&mut self, citations: Vec<Citation>) {
        self.emitted_citations = citations;
    }

    pub fn token_buffer(&self) -> &str {
        &self.token_buffer
    }

    pub fn visible_text(&self) -> &str {
        &self.visible
    }

    pub fn emitted_citations(&self) -> &[Citation] {
        &self.emitted_citations
    }

    pub fn tokens_received(&self) -> usize {
        self.tokens_received
    }

    pub fn tokens_forwarded(&self) -> usize {
        self.tokens_forwarded
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn time_to_first_token(&self) -> Option<Duration> {
        self.first_token_at.map(|t| t.duration_since(self.started_at))
    }

    /// Drop everything generated so far. Used before a retry and whenever
    /// the text must not survive (blocked, cancelled, failed).
    pub fn discard_output(&mut self) {
        self.token_buffer.clear();
        self.visible.clear();
        self.emitted_citations.clear();
        self.tokens_received = 0;
        self.tokens_forwarded = 0;
        self.first_token_at = None;
    }
}
