//! EntitlementStore: plan creation and the valid-plan views.
//!
//! Validity is never stored. Each view reads plans with their transaction
//! counts and filters them against `clock.now()` at call time.

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use terraview_core::config::PlanConfig;
use terraview_core::errors::{EntitlementError, EntitlementResult};
use terraview_core::models::{
    check_duration_months, Plan, PlanStatus, PlanType, PlanUsage, ReportPlan, ReportPlanUsage,
};
use terraview_core::traits::{Clock, IEntitlementStorage};

use crate::hierarchy::HierarchyCache;

/// A user's plan entity names grouped by plan type, in creation order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlanDetails {
    pub village: Vec<String>,
    pub taluka: Vec<String>,
    pub district: Vec<String>,
    pub free: Vec<String>,
}

pub struct EntitlementStore {
    storage: Arc<dyn IEntitlementStorage>,
    hierarchy: Arc<HierarchyCache>,
    plans: PlanConfig,
    clock: Arc<dyn Clock>,
}

impl EntitlementStore {
    pub fn new(
        storage: Arc<dyn IEntitlementStorage>,
        hierarchy: Arc<HierarchyCache>,
        plans: PlanConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            storage,
            hierarchy,
            plans,
            clock,
        }
    }

    pub fn storage(&self) -> &Arc<dyn IEntitlementStorage> {
        &self.storage
    }

    pub fn hierarchy(&self) -> &Arc<HierarchyCache> {
        &self.hierarchy
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn allowed_transactions(&self, plan_type: PlanType) -> u32 {
        self.plans.allowed_transactions(plan_type)
    }

    pub fn default_duration(&self, plan_type: PlanType) -> u32 {
        self.plans.default_duration(plan_type)
    }

    fn status(&self, usage: PlanUsage) -> PlanStatus {
        PlanStatus {
            allowed: self.allowed_transactions(usage.plan.plan_type),
            plan: usage.plan,
            used: usage.used,
        }
    }

    /// Every plan the user holds, valid or not, oldest first.
    pub fn all_plans(&self, user_ref: &str) -> EntitlementResult<Vec<PlanStatus>> {
        Ok(self
            .storage
            .plans_for_user(user_ref)?
            .into_iter()
            .map(|usage| self.status(usage))
            .collect())
    }

    /// Plans inside their term with capacity left.
    pub fn valid_plans(&self, user_ref: &str) -> EntitlementResult<Vec<PlanStatus>> {
        let now = self.clock.now();
        Ok(self
            .all_plans(user_ref)?
            .into_iter()
            .filter(|s| s.is_valid_at(now))
            .collect())
    }

    pub fn all_report_plans(&self, user_ref: &str) -> EntitlementResult<Vec<ReportPlanUsage>> {
        self.storage.report_plans_for_user(user_ref)
    }

    /// Report plans inside their term with quantity left, oldest first.
    pub fn valid_report_plans(&self, user_ref: &str) -> EntitlementResult<Vec<ReportPlanUsage>> {
        let now = self.clock.now();
        Ok(self
            .storage
            .report_plans_for_user(user_ref)?
            .into_iter()
            .filter(|u| u.is_valid_at(now))
            .collect())
    }

    /// Create a plan with the product's default term.
    pub fn create_plan(
        &self,
        user_ref: &str,
        plan_type: PlanType,
        entity_name: &str,
    ) -> EntitlementResult<Plan> {
        self.grant_plan(user_ref, plan_type, entity_name, self.default_duration(plan_type))
    }

    /// Create a plan with an explicit term (admin grant).
    pub fn grant_plan(
        &self,
        user_ref: &str,
        plan_type: PlanType,
        entity_name: &str,
        duration_months: u32,
    ) -> EntitlementResult<Plan> {
        let plan = self.prepare_plan(user_ref, plan_type, entity_name, duration_months)?;
        self.storage.insert_plan(&plan)?;
        info!(
            user = %plan.user_ref,
            plan_id = %plan.id,
            plan_type = %plan.plan_type,
            entity = %plan.entity_name,
            duration_months,
            "plan created"
        );
        Ok(plan)
    }

    /// Validate the entity against the hierarchy and build the plan without
    /// persisting it. The stored name is the hierarchy's canonical spelling.
    pub fn prepare_plan(
        &self,
        user_ref: &str,
        plan_type: PlanType,
        entity_name: &str,
        duration_months: u32,
    ) -> EntitlementResult<Plan> {
        require_user(user_ref)?;
        check_duration_months(duration_months)?;
        let canonical = self
            .hierarchy
            .index()
            .canonical_name(plan_type.entity_type(), entity_name)
            .map_err(|e| e.into_invalid_entity(plan_type.as_str()))?;
        Ok(Plan::new(
            user_ref,
            plan_type,
            canonical,
            duration_months,
            self.clock.now(),
        ))
    }

    pub fn create_report_plan(
        &self,
        user_ref: &str,
        quantity: u32,
        duration_months: u32,
    ) -> EntitlementResult<ReportPlan> {
        let plan = self.prepare_report_plan(user_ref, quantity, duration_months)?;
        self.storage.insert_report_plan(&plan)?;
        info!(
            user = %plan.user_ref,
            plan_id = %plan.id,
            quantity,
            duration_months,
            "report plan created"
        );
        Ok(plan)
    }

    pub fn prepare_report_plan(
        &self,
        user_ref: &str,
        quantity: u32,
        duration_months: u32,
    ) -> EntitlementResult<ReportPlan> {
        require_user(user_ref)?;
        if quantity == 0 {
            return Err(EntitlementError::InvalidInput(
                "report plan quantity must be at least 1".to_string(),
            ));
        }
        check_duration_months(duration_months)?;
        Ok(ReportPlan::new(
            user_ref,
            quantity,
            duration_months,
            self.clock.now(),
        ))
    }

    /// Entity names of every plan the user holds, grouped by type.
    pub fn plan_details(&self, user_ref: &str) -> EntitlementResult<PlanDetails> {
        let mut details = PlanDetails::default();
        for usage in self.storage.plans_for_user(user_ref)? {
            let bucket = match usage.plan.plan_type {
                PlanType::Village => &mut details.village,
                PlanType::Taluka => &mut details.taluka,
                PlanType::District => &mut details.district,
                PlanType::Free => &mut details.free,
            };
            bucket.push(usage.plan.entity_name);
        }
        Ok(details)
    }
}

fn require_user(user_ref: &str) -> EntitlementResult<()> {
    if user_ref.trim().is_empty() {
        return Err(EntitlementError::InvalidInput(
            "user_ref must not be empty".to_string(),
        ));
    }
    Ok(())
}
