//! Per-terminal-state counts, violations, rejected citations, retries, and
//! time-to-first-token.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use veil_core::models::GenerationState;

/// Shared, lock-free counters. One instance per orchestrator, cloned behind
/// an `Arc` into every turn.
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    turns_started: AtomicU64,
    delivered: AtomicU64,
    blocked: AtomicU64,
    failed: AtomicU64,
    cancelled: AtomicU64,
    violations: AtomicU64,
    rejected_citations: AtomicU64,
    model_retries: AtomicU64,
    first_token_samples: AtomicU64,
    first_token_ms_total: AtomicU64,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_turn_started(&self) {
        self.turns_started.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a terminal state. Non-terminal states are ignored.
    pub fn record_terminal(&self, state: GenerationState) {
        let counter = match state {
            GenerationState::Delivered => &self.delivered,
            GenerationState::Blocked => &self.blocked,
            GenerationState::Failed => &self.failed,
            GenerationState::Cancelled => &self.cancelled,
            _ => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_violations(&self, count: usize) {
        self.violations.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_rejected_citation(&self) {
        self.rejected_citations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_model_retry(&self) {
        self.model_retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_first_token(&self, latency: Duration) {
        self.first_token_samples.fetch_add(1, Ordering::Relaxed);
        self.first_token_ms_total
            .fetch_add(latency.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let samples = self.first_token_samples.load(Ordering::Relaxed);
        let total = self.first_token_ms_total.load(Ordering::Relaxed);
        MetricsSnapshot {
            turns_started: self.turns_started.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            blocked: self.blocked.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            violations: self.violations.load(Ordering::Relaxed),
            rejected_citations: self.rejected_citations.load(Ordering::Relaxed),
            model_retries: self.model_retries.load(Ordering::Relaxed),
            first_token_samples: samples,
            mean_first_token_ms: if samples == 0 {
                0.0
            } else {
                total as f64 / samples as f64
            },
        }
    }
}

/// Point-in-time copy of [`PipelineMetrics`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub turns_started: u64,
    pub delivered: u64,
    pub blocked: u64,
    pub failed: u64,
    pub cancelled: u64,
    pub violations: u64,
    pub rejected_citations: u64,
    pub model_retries: u64,
    pub first_token_samples: u64,
    pub mean_first_token_ms: f64,
}

impl MetricsSnapshot {
    pub fn finished(&self) -> u64 {
        self.delivered + self.blocked + self.failed + self.cancelled
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
