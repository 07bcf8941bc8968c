//! Tracing setup: fmt layer + `EnvFilter`, optionally JSON lines.

pub mod events;

use tracing_subscriber::EnvFilter;
use veil_core::config::ObservabilityConfig;
use veil_core::errors::{ConfigError, VeilResult};

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `config.log_level` when set. Safe to call more than
/// once: returns `Ok(false)` when a subscriber is already installed.
pub fn init_tracing(config: &ObservabilityConfig) -> VeilResult<bool> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => build_filter(&config.log_level)?,
    };

    let installed = if config.json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .json()
            .try_init()
            .is_ok()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init()
            .is_ok()
    };
    Ok(installed)
}

fn build_filter(level: &str) -> VeilResult<EnvFilter> {
    EnvFilter::try_new(level).map_err(|e| {
        ConfigError::InvalidValue {
            field: "observability.log_level".to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}
