//! Tracing subscriber settings.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub log_filter: String,
    /// Emit JSON lines instead of the human-readable format.
    pub json: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_filter: "info".to_string(),
            json: false,
        }
    }
}
