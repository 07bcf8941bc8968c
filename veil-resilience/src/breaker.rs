//! Consecutive-failure circuit breaker.
//!
//! Closed → Open after `threshold` consecutive failures. Open rejects every
//! call until `cooldown` has elapsed, then admits a single probe (HalfOpen).
//! A successful probe closes the breaker; a failed probe re-opens it. A probe
//! that never reports back (its caller was cancelled) expires after another
//! `cooldown`.

use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use veil_core::errors::{VeilError, VeilResult};
use veil_observability::events;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerStatus {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug)]
struct BreakerState {
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    probe_started: Option<Instant>,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    component: String,
    threshold: u32,
    cooldown: Duration,
    state: Mutex<BreakerState>,
}

impl CircuitBreaker {
    pub fn new(component: impl Into<String>, threshold: u32, cooldown: Duration) -> Self {
        Self {
            component: component.into(),
            threshold: threshold.max(1),
            cooldown,
            state: Mutex::new(BreakerState {
                consecutive_failures: 0,
                opened_at: None,
                probe_started: None,
            }),
        }
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    /// Ask permission to make a call. Rejects with `CircuitOpen` while open.
    pub fn allow(&self) -> VeilResult<()> {
        let mut state = self.lock();
        match state.opened_at {
            None => Ok(()),
            Some(opened_at) => {
                let probe_outstanding = state
                    .probe_started
                    .is_some_and(|started| started.elapsed() < self.cooldown);
                if opened_at.elapsed() < self.cooldown || probe_outstanding {
                    Err(VeilError::CircuitOpen {
                        component: self.component.clone(),
                    })
                } else {
                    state.probe_started = Some(Instant::now());
                    Ok(())
                }
            }
        }
    }

    pub fn record_success(&self) {
        let mut state = self.lock();
        if state.opened_at.is_some() {
            events::circuit_closed(&self.component);
        }
        state.consecutive_failures = 0;
        state.opened_at = None;
        state.probe_started = None;
    }

    /// Count a failure. Returns true when this failure opened the circuit.
    pub fn record_failure(&self) -> bool {
        let mut state = self.lock();
        state.consecutive_failures = state.consecutive_failures.saturating_add(1);
        let was_probe = state.probe_started.take().is_some();
        if was_probe || (state.opened_at.is_none() && state.consecutive_failures >= self.threshold)
        {
            state.opened_at = Some(Instant::now());
            events::circuit_opened(&self.component, state.consecutive_failures);
            return true;
        }
        false
    }

    pub fn status(&self) -> BreakerStatus {
        let state = self.lock();
        match state.opened_at {
            None => BreakerStatus::Closed,
            Some(opened_at) if opened_at.elapsed() >= self.cooldown => BreakerStatus::HalfOpen,
            Some(_) => BreakerStatus::Open,
        }
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.lock().consecutive_failures
    }

    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        // State is a few counters; a panic mid-update cannot leave it unusable.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
