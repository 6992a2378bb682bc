//! Consumption policy.

use serde::{Deserialize, Serialize};

/// Which entitlement a served report is charged to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsumptionTarget {
    /// Oldest report plan in the user's pool with units left.
    #[default]
    ReportPool,
    /// The hierarchical plan selected by `PlanMatchPolicy`.
    MatchingPlan,
}

/// How to pick the hierarchical plan to debit when several cover the target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanMatchPolicy {
    /// Only a plan whose type and entity equal the requested entity.
    #[default]
    Exact,
    /// Closest covering plan first: village, then taluka, then district.
    Narrowest,
    /// Widest covering plan first: district, then taluka, then village.
    Broadest,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub consumption_target: ConsumptionTarget,
    pub plan_match: PlanMatchPolicy,
}
