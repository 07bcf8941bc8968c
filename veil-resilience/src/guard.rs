//! Timeout + circuit breaker + retry around one collaborator.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use veil_core::errors::{VeilError, VeilResult};
use veil_observability::events;

use crate::breaker::CircuitBreaker;
use crate::retry::RetryPolicy;
use crate::timeout::with_timeout;

/// Call wrapper for one network collaborator.
///
/// Retryable failures (see [`VeilError::is_retryable`]) and timeouts count
/// against the breaker and are retried with backoff up to the policy's cap.
/// Non-retryable errors mean the collaborator answered, so they count as
/// breaker successes and are returned immediately. A `CircuitOpen`
/// rejection is returned without retrying.
#[derive(Debug, Clone)]
pub struct Guard {
    breaker: Arc<CircuitBreaker>,
    timeout: Duration,
    retry: RetryPolicy,
}

impl Guard {
    pub fn new(breaker: Arc<CircuitBreaker>, timeout: Duration, retry: RetryPolicy) -> Self {
        Self {
            breaker,
            timeout,
            retry,
        }
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Run `op` under the guard. `on_timeout` builds the error reported when
    /// an attempt exceeds the deadline; it should be retryable.
    pub async fn call<T, F, Fut, E>(&self, mut op: F, on_timeout: E) -> VeilResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = VeilResult<T>>,
        E: Fn() -> VeilError,
    {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            self.breaker.allow()?;

            match with_timeout(self.timeout, op(), &on_timeout).await {
                Ok(value) => {
                    self.breaker.record_success();
                    return Ok(value);
                }
                Err(err) if err.is_retryable() => {
                    self.breaker.record_failure();
                    if attempt >= self.retry.max_attempts {
                        return Err(err);
                    }
                    let delay = self.retry.delay_for(attempt);
                    events::retry_scheduled(
                        self.breaker.component(),
                        attempt,
                        delay.as_millis() as u64,
                        err.kind(),
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    self.breaker.record_success();
                    return Err(err);
                }
            }
        }
    }
}
