//! # veil-resilience
//!
//! Every network collaborator (embedding service, vector index, language
//! model) is called through a [`Guard`]: a per-call timeout, a circuit breaker
//! that sheds load after consecutive failures, and bounded exponential retry
//! for retryable errors.

pub mod breaker;
pub mod guard;
pub mod retry;
pub mod timeout;

pub use breaker::{BreakerStatus, CircuitBreaker};
pub use guard::Guard;
pub use retry::RetryPolicy;
pub use timeout::with_timeout;
