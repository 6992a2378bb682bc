//! ConsumptionLedger: records one unit of consumption per served artifact.
//!
//! Each debit is a single storage call that checks capacity and appends the
//! audit row in one write transaction. The ledger decides which plan pays;
//! storage guarantees the pay-or-nothing step.

mod selection;

pub use selection::candidates;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use terraview_core::config::{ConsumptionTarget, LedgerConfig, PlanMatchPolicy};
use terraview_core::errors::{EntitlementError, EntitlementResult};
use terraview_core::models::{
    ConsumptionDetails, EntityRef, PlanStatus, PoolSummary, ReportPlanUsage, ReportTransaction,
    Transaction, TransactionRecord,
};
use terraview_core::traits::PlanDebit;

use crate::store::EntitlementStore;

/// What a debit is for: the entity served and the audit descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumptionScope {
    pub entity: EntityRef,
    pub details: ConsumptionDetails,
}

pub struct ConsumptionLedger {
    store: Arc<EntitlementStore>,
    config: LedgerConfig,
}

impl ConsumptionLedger {
    pub fn new(store: Arc<EntitlementStore>, config: LedgerConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Debit per the configured consumption target.
    pub fn debit(
        &self,
        user_ref: &str,
        scope: &ConsumptionScope,
    ) -> EntitlementResult<TransactionRecord> {
        match self.config.consumption_target {
            ConsumptionTarget::ReportPool => self
                .debit_report(user_ref, &scope.details)
                .map(TransactionRecord::Report),
            ConsumptionTarget::MatchingPlan => self
                .debit_matching_plan(user_ref, &scope.entity, &scope.details)
                .map(TransactionRecord::Plan),
        }
    }

    /// Whether the configured target could pay for `scope` right now.
    /// Advisory only; the debit itself re-checks under the write lock.
    pub fn preflight(&self, user_ref: &str, scope: &ConsumptionScope) -> EntitlementResult<()> {
        match self.config.consumption_target {
            ConsumptionTarget::ReportPool => match self.get_report_access_plan(user_ref)? {
                Some(_) => Ok(()),
                None => Err(pool_exhausted(user_ref)),
            },
            ConsumptionTarget::MatchingPlan => {
                self.payable_plans(user_ref, &scope.entity)?;
                Ok(())
            }
        }
    }

    /// Oldest report plan that is inside its term with quantity left.
    pub fn get_report_access_plan(
        &self,
        user_ref: &str,
    ) -> EntitlementResult<Option<ReportPlanUsage>> {
        Ok(self.store.valid_report_plans(user_ref)?.into_iter().next())
    }

    pub fn debit_report(
        &self,
        user_ref: &str,
        details: &ConsumptionDetails,
    ) -> EntitlementResult<ReportTransaction> {
        let now = self.store.clock().now();
        match self.store.storage().debit_report_pool(user_ref, details, now) {
            Ok(tx) => {
                info!(user = %user_ref, plan_id = %tx.report_plan_id, "report unit consumed");
                Ok(tx)
            }
            Err(e) => {
                warn!(user = %user_ref, error = %e, "report debit rejected");
                Err(e)
            }
        }
    }

    /// Debit one specific plan, held to its type's cap.
    pub fn debit_plan(
        &self,
        user_ref: &str,
        plan_id: &str,
        details: &ConsumptionDetails,
    ) -> EntitlementResult<Transaction> {
        let usage = self
            .store
            .storage()
            .get_plan(plan_id)?
            .ok_or_else(|| EntitlementError::PlanNotFound {
                id: plan_id.to_string(),
            })?;
        let allowed = self.store.allowed_transactions(usage.plan.plan_type);
        let result = self.store.storage().debit_plan(PlanDebit {
            plan_id,
            user_ref,
            allowed,
            details,
            now: self.store.clock().now(),
        });
        match &result {
            Ok(_) => info!(
                user = %user_ref,
                plan_id,
                plan_type = %usage.plan.plan_type,
                entity = %usage.plan.entity_name,
                remaining = allowed.saturating_sub(usage.used.saturating_add(1)),
                "plan unit consumed"
            ),
            Err(e) => warn!(user = %user_ref, plan_id, error = %e, "plan debit rejected"),
        }
        result
    }

    /// The plan `debit_matching_plan` would charge, if any is valid.
    pub fn relevant_plan(
        &self,
        user_ref: &str,
        entity: &EntityRef,
    ) -> EntitlementResult<Option<PlanStatus>> {
        match self.payable_plans(user_ref, entity) {
            Ok(plans) => Ok(plans.into_iter().next()),
            Err(e) if e.is_business_denial() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Debit the plan chosen by the match policy. Never falls back to a plan
    /// the policy does not select.
    pub fn debit_matching_plan(
        &self,
        user_ref: &str,
        entity: &EntityRef,
        details: &ConsumptionDetails,
    ) -> EntitlementResult<Transaction> {
        let mut last_err = None;
        for status in self.payable_plans(user_ref, entity)? {
            match self.debit_plan(user_ref, &status.plan.id, details) {
                Ok(tx) => return Ok(tx),
                // Lost a race for the last unit; try the next candidate.
                Err(e @ EntitlementError::CapacityExceeded { .. }) => last_err = Some(e),
                Err(e) => return Err(e),
            }
        }
        Err(last_err.unwrap_or_else(|| EntitlementError::CapacityExceeded {
            scope: entity.to_string(),
            detail: "no matching plan has capacity left".to_string(),
        }))
    }

    /// Valid policy candidates, most preferred first. Never empty on success.
    fn payable_plans(
        &self,
        user_ref: &str,
        entity: &EntityRef,
    ) -> EntitlementResult<Vec<PlanStatus>> {
        let index = self.store.hierarchy().index();
        let entity = index
            .canonical_name(entity.entity_type, &entity.name)
            .map(|name| EntityRef::new(entity.entity_type, name))
            .map_err(EntitlementError::into_access_denied)?;

        let policy = self.config.plan_match;
        let now = self.store.clock().now();
        let plans = self.store.all_plans(user_ref)?;
        let matching = candidates(&index, &plans, &entity, policy);

        if matching.is_empty() {
            return Err(EntitlementError::AccessDenied {
                reason: format!("no plan matches {entity} under the {} policy", policy_name(policy)),
            });
        }
        let payable: Vec<_> = matching
            .into_iter()
            .filter(|s| s.is_valid_at(now))
            .cloned()
            .collect();
        if payable.is_empty() {
            return Err(EntitlementError::CapacityExceeded {
                scope: entity.to_string(),
                detail: "every matching plan is exhausted or expired".to_string(),
            });
        }
        Ok(payable)
    }

    /// Totals over the user's report plans that are still inside their term.
    pub fn pool_summary(&self, user_ref: &str) -> EntitlementResult<PoolSummary> {
        let now = self.store.clock().now();
        let mut summary = PoolSummary::default();
        for usage in self.store.all_report_plans(user_ref)? {
            if usage.is_expired_at(now) {
                continue;
            }
            summary.plans = summary.plans.saturating_add(1);
            summary.total = summary.total.saturating_add(usage.plan.quantity);
            summary.used = summary
                .used
                .saturating_add(usage.used.min(usage.plan.quantity));
            summary.remaining = summary.remaining.saturating_add(usage.remaining());
        }
        Ok(summary)
    }

    /// Audit rows of one plan, oldest first.
    pub fn plan_history(&self, plan_id: &str) -> EntitlementResult<Vec<Transaction>> {
        self.store.storage().transactions_for_plan(plan_id)
    }

    /// Audit rows across the user's report pool, oldest first.
    pub fn report_history(&self, user_ref: &str) -> EntitlementResult<Vec<ReportTransaction>> {
        self.store.storage().report_transactions_for_user(user_ref)
    }
}

fn policy_name(policy: PlanMatchPolicy) -> &'static str {
    match policy {
        PlanMatchPolicy::Exact => "exact",
        PlanMatchPolicy::Narrowest => "narrowest",
        PlanMatchPolicy::Broadest => "broadest",
    }
}

fn pool_exhausted(user_ref: &str) -> EntitlementError {
    EntitlementError::CapacityExceeded {
        scope: "report pool".to_string(),
        detail: format!("no report plan with remaining quantity for user {user_ref}"),
    }
}
