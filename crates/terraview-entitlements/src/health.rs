//! Per-subsystem health checks.

use serde::Serialize;

use terraview_core::traits::IEntitlementStorage;

use crate::hierarchy::HierarchyCache;

/// Result of a single subsystem health check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubsystemCheck {
    pub name: &'static str,
    pub healthy: bool,
    /// Reason when unhealthy, status info otherwise.
    pub detail: String,
}

impl SubsystemCheck {
    pub fn ok(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            healthy: true,
            detail: detail.into(),
        }
    }

    pub fn unhealthy(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            healthy: false,
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    /// Serving, but some checks failed.
    Degraded,
    /// Entitlement storage is unreachable; nothing can be decided.
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineHealth {
    pub status: HealthStatus,
    pub checks: Vec<SubsystemCheck>,
}

pub fn check_storage(storage: &dyn IEntitlementStorage) -> SubsystemCheck {
    match storage.ping().and_then(|_| storage.stats()) {
        Ok(stats) => SubsystemCheck::ok(
            STORAGE,
            format!(
                "connected ({} plans, {} report plans)",
                stats.plan_count, stats.report_plan_count
            ),
        ),
        Err(e) => SubsystemCheck::unhealthy(STORAGE, format!("query failed: {e}")),
    }
}

pub fn check_hierarchy(cache: &HierarchyCache) -> SubsystemCheck {
    let index = cache.snapshot();
    if index.is_empty() {
        return SubsystemCheck::unhealthy("hierarchy", "index is empty");
    }
    let detail = format!(
        "{} districts, {} villages, built {}",
        index.district_count(),
        index.village_count(),
        cache.built_at().to_rfc3339()
    );
    if cache.is_stale() {
        SubsystemCheck::unhealthy("hierarchy", format!("stale: {detail}"))
    } else {
        SubsystemCheck::ok("hierarchy", detail)
    }
}

const STORAGE: &str = "storage";

pub fn compute_health(checks: Vec<SubsystemCheck>) -> EngineHealth {
    let status = if checks.iter().any(|c| c.name == STORAGE && !c.healthy) {
        HealthStatus::Unavailable
    } else if checks.iter().all(|c| c.healthy) {
        HealthStatus::Healthy
    } else {
        HealthStatus::Degraded
    };
    EngineHealth { status, checks }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_failure_is_unavailable() {
        let health = compute_health(vec![
            SubsystemCheck::unhealthy("storage", "locked"),
            SubsystemCheck::ok("hierarchy", "ok"),
        ]);
        assert_eq!(health.status, HealthStatus::Unavailable);
    }

    #[test]
    fn other_failures_degrade() {
        let health = compute_health(vec![
            SubsystemCheck::ok("storage", "connected"),
            SubsystemCheck::unhealthy("hierarchy", "index is empty"),
        ]);
        assert_eq!(health.status, HealthStatus::Degraded);
    }
}
