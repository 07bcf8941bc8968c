use serde::{Deserialize, Serialize};

use super::defaults;

/// Message store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database file path. `None` keeps everything in memory.
    pub db_path: Option<String>,
    pub busy_timeout_ms: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: Some(defaults::DEFAULT_DB_FILENAME.to_string()),
            busy_timeout_ms: defaults::DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}
