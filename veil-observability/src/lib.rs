//! # veil-observability
//!
//! Structured tracing setup, one helper per key pipeline event, and
//! lock-free pipeline metrics. Events carry ids and counts only; chunk
//! content and generated text are never logged.

pub mod metrics;
pub mod tracing_setup;

pub use metrics::{MetricsSnapshot, PipelineMetrics};
pub use tracing_setup::{events, init_tracing};
