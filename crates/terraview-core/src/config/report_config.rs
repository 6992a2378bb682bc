//! Defaults for report plans granted from orders.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub default_quantity: u32,
    pub default_duration_months: u32,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            default_quantity: 10,
            default_duration_months: 12,
        }
    }
}
