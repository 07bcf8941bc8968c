//! Structured log events for key pipeline operations.
//!
//! Each function emits a `tracing` event with an `event` field naming it.

use veil_core::models::{FingerprintKind, GenerationState};

pub fn turn_started(session_id: &str, chatbot_id: &str, conversation_id: &str) {
    tracing::info!(
        event = "turn_started",
        session_id = %session_id,
        chatbot_id = %chatbot_id,
        conversation_id = %conversation_id,
        "turn started"
    );
}

pub fn retrieval_completed(session_id: &str, citable: usize, learn_only: usize) {
    tracing::debug!(
        event = "retrieval_completed",
        session_id = %session_id,
        citable,
        learn_only,
        "retrieval completed"
    );
}

pub fn context_assembled(
    session_id: &str,
    markers: usize,
    learn_only: usize,
    tokens: usize,
    budget: usize,
) {
    tracing::debug!(
        event = "context_assembled",
        session_id = %session_id,
        markers,
        learn_only,
        tokens,
        budget,
        "context assembled"
    );
}

/// A partition could not hold its top chunk; the turn proceeds without context.
pub fn context_skipped(session_id: &str, needed: usize, available: usize) {
    tracing::warn!(
        event = "context_skipped",
        session_id = %session_id,
        needed,
        available,
        "budget too small for the top-ranked chunk, generating without context"
    );
}

/// A marker-like segment in model output that did not resolve to a citable
/// chunk and was stripped.
pub fn citation_rejected(session_id: &str, marker: &str) {
    tracing::warn!(
        event = "citation_rejected",
        session_id = %session_id,
        marker = %marker,
        "unknown or non-citable marker stripped"
    );
}

pub fn privacy_violation(
    session_id: &str,
    conversation_id: &str,
    chunk_id: &str,
    source_id: &str,
    kind: FingerprintKind,
) {
    tracing::warn!(
        event = "privacy_violation",
        session_id = %session_id,
        conversation_id = %conversation_id,
        chunk_id = %chunk_id,
        source_id = %source_id,
        kind = kind.as_str(),
        "learn-only content leaked, response blocked"
    );
}

/// Summary of a blocked turn. `detail` names how many chunks leaked, never
/// their content.
pub fn turn_blocked(session_id: &str, error_kind: &str, detail: &str) {
    tracing::warn!(
        event = "turn_blocked",
        session_id = %session_id,
        error = error_kind,
        detail = %detail,
        "fallback delivered in place of the response"
    );
}

pub fn turn_finished(session_id: &str, state: GenerationState, elapsed_ms: u64, citations: usize) {
    tracing::info!(
        event = "turn_finished",
        session_id = %session_id,
        state = state.as_str(),
        elapsed_ms,
        citations,
        "turn finished"
    );
}

pub fn turn_failed(session_id: &str, error_kind: &str, retryable: bool) {
    tracing::error!(
        event = "turn_failed",
        session_id = %session_id,
        error = error_kind,
        retryable,
        "turn failed"
    );
}

pub fn circuit_opened(component: &str, consecutive_failures: u32) {
    tracing::warn!(
        event = "circuit_opened",
        component = %component,
        consecutive_failures,
        "circuit breaker opened"
    );
}

pub fn circuit_closed(component: &str) {
    tracing::info!(
        event = "circuit_closed",
        component = %component,
        "circuit breaker closed after successful probe"
    );
}

pub fn retry_scheduled(component: &str, attempt: u32, delay_ms: u64, error_kind: &str) {
    tracing::debug!(
        event = "retry_scheduled",
        component = %component,
        attempt,
        delay_ms,
        error = error_kind,
        "retrying collaborator call"
    );
}
