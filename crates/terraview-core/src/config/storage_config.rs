//! SQLite storage configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database file. `None` keeps everything in memory.
    pub db_path: Option<String>,
    /// Read-only connections in the pool (0 = default of 2).
    pub read_pool_size: usize,
    /// How long a debit waits on a competing writer before failing as busy.
    pub busy_timeout_ms: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            read_pool_size: 2,
            busy_timeout_ms: 5000,
        }
    }
}
