//! Plan and ReportPlan entitlements.
//!
//! Neither type carries a used-count field. The count always comes from the
//! audit rows, so `PlanUsage` / `ReportPlanUsage` pair a plan with the count
//! read at the same moment, and validity is evaluated against a caller-supplied
//! `now` every time it is asked for.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{EntityRef, EntityType};
use crate::errors::EntitlementError;

/// A plan month is a fixed 30 days.
pub const DAYS_PER_MONTH: i64 = 30;

/// Longest term a plan may be created with (100 years).
pub const MAX_DURATION_MONTHS: u32 = 1200;

/// `created_at + duration_months * 30d`, saturating at the latest
/// representable instant.
pub fn valid_till(created_at: DateTime<Utc>, duration_months: u32) -> DateTime<Utc> {
    Duration::try_days(i64::from(duration_months) * DAYS_PER_MONTH)
        .and_then(|term| created_at.checked_add_signed(term))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Reject a term of zero or above `MAX_DURATION_MONTHS`.
pub fn check_duration_months(duration_months: u32) -> Result<(), EntitlementError> {
    if duration_months == 0 || duration_months > MAX_DURATION_MONTHS {
        return Err(EntitlementError::InvalidInput(format!(
            "plan duration must be between 1 and {MAX_DURATION_MONTHS} months, got {duration_months}"
        )));
    }
    Ok(())
}

/// Scope of a hierarchical (map-view) plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PlanType {
    Village,
    Taluka,
    District,
    /// Trial plan scoped to a single village.
    Free,
}

impl PlanType {
    pub const ALL: [PlanType; 4] = [Self::Village, Self::Taluka, Self::District, Self::Free];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Village => "Village",
            Self::Taluka => "Taluka",
            Self::District => "District",
            Self::Free => "Free",
        }
    }

    /// Hierarchy level the plan's `entity_name` lives at.
    pub fn entity_type(&self) -> EntityType {
        match self {
            Self::Village | Self::Free => EntityType::Village,
            Self::Taluka => EntityType::Taluka,
            Self::District => EntityType::District,
        }
    }
}

impl fmt::Display for PlanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlanType {
    type Err = EntitlementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "village" => Ok(Self::Village),
            // Older rows were written with the "Talluka" spelling.
            "taluka" | "talluka" => Ok(Self::Taluka),
            "district" => Ok(Self::District),
            "free" => Ok(Self::Free),
            _ => Err(EntitlementError::InvalidInput(format!(
                "unknown plan type '{s}'"
            ))),
        }
    }
}

/// Hierarchical map-view entitlement, scoped to one geographic entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub id: String,
    pub user_ref: String,
    pub plan_type: PlanType,
    pub entity_name: String,
    pub created_at: DateTime<Utc>,
    pub duration_months: u32,
}

impl Plan {
    pub fn new(
        user_ref: impl Into<String>,
        plan_type: PlanType,
        entity_name: impl Into<String>,
        duration_months: u32,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_ref: user_ref.into(),
            plan_type,
            entity_name: entity_name.into(),
            created_at,
            duration_months,
        }
    }

    pub fn valid_till(&self) -> DateTime<Utc> {
        valid_till(self.created_at, self.duration_months)
    }

    pub fn entity(&self) -> EntityRef {
        EntityRef::new(self.plan_type.entity_type(), self.entity_name.clone())
    }
}

/// Quantity-bound entitlement, not scoped to geography. A user's report
/// plans form one pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportPlan {
    pub id: String,
    pub user_ref: String,
    pub quantity: u32,
    pub duration_months: u32,
    pub created_at: DateTime<Utc>,
}

impl ReportPlan {
    pub fn new(
        user_ref: impl Into<String>,
        quantity: u32,
        duration_months: u32,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_ref: user_ref.into(),
            quantity,
            duration_months,
            created_at,
        }
    }

    pub fn valid_till(&self) -> DateTime<Utc> {
        valid_till(self.created_at, self.duration_months)
    }
}

/// A plan together with its transaction count, as read from storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanUsage {
    pub plan: Plan,
    pub used: u32,
}

/// A plan with its count and the per-type cap it is held to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanStatus {
    pub plan: Plan,
    pub used: u32,
    pub allowed: u32,
}

impl PlanStatus {
    pub fn remaining(&self) -> u32 {
        self.allowed.saturating_sub(self.used)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.plan.valid_till()
    }

    pub fn is_exhausted(&self) -> bool {
        self.used >= self.allowed
    }

    /// Both conditions are required: inside the term and below the cap.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_expired_at(now) && !self.is_exhausted()
    }
}

/// A report plan together with its transaction count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportPlanUsage {
    pub plan: ReportPlan,
    pub used: u32,
}

impl ReportPlanUsage {
    pub fn remaining(&self) -> u32 {
        self.plan.quantity.saturating_sub(self.used)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.plan.valid_till()
    }

    pub fn is_exhausted(&self) -> bool {
        self.used >= self.plan.quantity
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_expired_at(now) && !self.is_exhausted()
    }
}

/// Aggregate over a user's time-valid report plans.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PoolSummary {
    pub plans: u32,
    pub total: u32,
    pub used: u32,
    pub remaining: u32,
}
