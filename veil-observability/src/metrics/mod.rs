//! Pipeline counters.

mod pipeline_metrics;

pub use pipeline_metrics::{MetricsSnapshot, PipelineMetrics};
