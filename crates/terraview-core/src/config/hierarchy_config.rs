//! Hierarchy index source and refresh settings.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HierarchyConfig {
    pub default_state: String,
    /// Age after which the index is rebuilt from the metadata source.
    pub refresh_interval_secs: u64,
    /// Read replica holding the `land_metadata` table.
    pub metadata_db_path: Option<String>,
}

impl Default for HierarchyConfig {
    fn default() -> Self {
        Self {
            default_state: "maharashtra".to_string(),
            refresh_interval_secs: 300,
            metadata_db_path: None,
        }
    }
}
