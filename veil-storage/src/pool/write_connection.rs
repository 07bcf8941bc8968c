//! Single write connection behind `tokio::sync::Mutex`.
//! Writes are serialized; migrations run before the connection is shared.

use std::path::Path;

use rusqlite::Connection;
use tokio::sync::Mutex;
use veil_core::config::StorageConfig;
use veil_core::errors::VeilResult;

use super::pragmas::apply_pragmas;
use crate::migrations::run_migrations;
use crate::to_storage_err;

pub struct WriteConnection {
    conn: Mutex<Connection>,
}

impl WriteConnection {
    /// Open (or create) a database file, apply pragmas, and migrate.
    pub fn open(path: &Path, busy_timeout_ms: u32) -> VeilResult<Self> {
        let conn = Connection::open(path).map_err(|e| to_storage_err(e.to_string()))?;
        Self::prepare(conn, busy_timeout_ms)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> VeilResult<Self> {
        let conn = Connection::open_in_memory().map_err(|e| to_storage_err(e.to_string()))?;
        Self::prepare(conn, veil_core::config::defaults::DEFAULT_BUSY_TIMEOUT_MS)
    }

    pub fn from_config(config: &StorageConfig) -> VeilResult<Self> {
        match config.db_path.as_deref() {
            Some(path) => Self::open(Path::new(path), config.busy_timeout_ms),
            None => Self::open_in_memory(),
        }
    }

    fn prepare(mut conn: Connection, busy_timeout_ms: u32) -> VeilResult<Self> {
        apply_pragmas(&conn, busy_timeout_ms)?;
        run_migrations(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the write lock and run `f` with the connection.
    pub async fn with_conn<F, T>(&self, f: F) -> VeilResult<T>
    where
        F: FnOnce(&mut Connection) -> VeilResult<T>,
    {
        let mut guard = self.conn.lock().await;
        f(&mut guard)
    }
}
