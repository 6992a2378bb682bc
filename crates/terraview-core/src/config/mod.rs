pub mod hierarchy_config;
pub mod ledger_config;
pub mod observability_config;
pub mod plan_config;
pub mod report_config;
pub mod storage_config;

use serde::{Deserialize, Serialize};

pub use hierarchy_config::HierarchyConfig;
pub use ledger_config::{ConsumptionTarget, LedgerConfig, PlanMatchPolicy};
pub use observability_config::ObservabilityConfig;
pub use plan_config::{PerPlanType, PlanConfig};
pub use report_config::ReportConfig;
pub use storage_config::StorageConfig;

use crate::errors::{EntitlementError, EntitlementResult};
use crate::models::MAX_DURATION_MONTHS;

/// Top-level configuration aggregating all subsystem configs.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EntitlementConfig {
    pub storage: StorageConfig,
    pub plans: PlanConfig,
    pub reports: ReportConfig,
    pub ledger: LedgerConfig,
    pub hierarchy: HierarchyConfig,
    pub observability: ObservabilityConfig,
}

impl EntitlementConfig {
    /// Load config from a TOML string, falling back to defaults for missing fields.
    pub fn from_toml(toml_str: &str) -> EntitlementResult<Self> {
        let config: Self =
            toml::from_str(toml_str).map_err(|e| EntitlementError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make every plan unusable, overflow a plan's
    /// term, or rebuild the hierarchy on every call.
    pub fn validate(&self) -> EntitlementResult<()> {
        for (plan_type, cap) in self.plans.allowed_transactions.iter() {
            if cap == 0 {
                return Err(EntitlementError::Config(format!(
                    "plans.allowed_transactions.{} must be at least 1",
                    plan_type.as_str().to_ascii_lowercase()
                )));
            }
        }
        for (plan_type, months) in self.plans.duration_months.iter() {
            if months == 0 || months > MAX_DURATION_MONTHS {
                return Err(EntitlementError::Config(format!(
                    "plans.duration_months.{} must be between 1 and {MAX_DURATION_MONTHS}",
                    plan_type.as_str().to_ascii_lowercase()
                )));
            }
        }
        if self.reports.default_quantity == 0 {
            return Err(EntitlementError::Config(
                "reports.default_quantity must be at least 1".to_string(),
            ));
        }
        let report_months = self.reports.default_duration_months;
        if report_months == 0 || report_months > MAX_DURATION_MONTHS {
            return Err(EntitlementError::Config(format!(
                "reports.default_duration_months must be between 1 and {MAX_DURATION_MONTHS}"
            )));
        }
        if self.hierarchy.refresh_interval_secs == 0 {
            return Err(EntitlementError::Config(
                "hierarchy.refresh_interval_secs must be at least 1".to_string(),
            ));
        }
        if self.hierarchy.default_state.trim().is_empty() {
            return Err(EntitlementError::Config(
                "hierarchy.default_state must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
