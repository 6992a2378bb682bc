//! Per-plan-type product rules.

use serde::{Deserialize, Serialize};

use crate::models::PlanType;

/// One value per `PlanType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerPlanType {
    pub village: u32,
    pub taluka: u32,
    pub district: u32,
    pub free: u32,
}

impl PerPlanType {
    pub fn get(&self, plan_type: PlanType) -> u32 {
        match plan_type {
            PlanType::Village => self.village,
            PlanType::Taluka => self.taluka,
            PlanType::District => self.district,
            PlanType::Free => self.free,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (PlanType, u32)> + '_ {
        PlanType::ALL.into_iter().map(move |t| (t, self.get(t)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanConfig {
    /// Transaction cap per plan.
    pub allowed_transactions: PerPlanType,
    /// Term applied when a plan is created without an explicit duration.
    pub duration_months: PerPlanType,
}

impl PlanConfig {
    pub fn allowed_transactions(&self, plan_type: PlanType) -> u32 {
        self.allowed_transactions.get(plan_type)
    }

    pub fn default_duration(&self, plan_type: PlanType) -> u32 {
        self.duration_months.get(plan_type)
    }
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            allowed_transactions: PerPlanType {
                village: 5,
                taluka: 5,
                district: 5,
                free: 3,
            },
            duration_months: PerPlanType {
                village: 12,
                taluka: 12,
                district: 12,
                free: 1,
            },
        }
    }
}
