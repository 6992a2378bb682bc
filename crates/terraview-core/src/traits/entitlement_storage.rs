//! `IEntitlementStorage` trait: the only persistence seam the domain logic uses.
//!
//! Reads return plans paired with their transaction counts taken in the same
//! query, so callers always evaluate validity against a fresh count. The two
//! debit methods are the atomic units: each performs its capacity check and
//! its audit insert inside one write transaction, or changes nothing.

use chrono::{DateTime, Utc};

use crate::errors::EntitlementResult;
use crate::models::{
    CompletedOrder, ConsumptionDetails, FulfillmentOutcome, GrantedPlan, Plan, PlanUsage,
    ReportPlan, ReportPlanUsage, ReportTransaction, Transaction,
};

/// Arguments for a single debit against one hierarchical plan.
#[derive(Debug, Clone)]
pub struct PlanDebit<'a> {
    pub plan_id: &'a str,
    /// The debit is refused unless the plan belongs to this user.
    pub user_ref: &'a str,
    /// Per-type cap the plan is held to.
    pub allowed: u32,
    pub details: &'a ConsumptionDetails,
    pub now: DateTime<Utc>,
}

/// Row counts across the entitlement tables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageStats {
    pub plan_count: u64,
    pub report_plan_count: u64,
    pub transaction_count: u64,
    pub report_transaction_count: u64,
    pub fulfilled_order_count: u64,
}

pub trait IEntitlementStorage: Send + Sync {
    // ── Writes ──

    fn insert_plan(&self, plan: &Plan) -> EntitlementResult<()>;

    fn insert_report_plan(&self, plan: &ReportPlan) -> EntitlementResult<()>;

    /// Atomically check `plan` capacity and term, then append one transaction.
    /// Fails with `CapacityExceeded` when the plan is exhausted or expired,
    /// `PlanNotFound` when it does not exist or belongs to another user.
    fn debit_plan(&self, debit: PlanDebit<'_>) -> EntitlementResult<Transaction>;

    /// Atomically pick the oldest time-valid report plan with units left and
    /// append one report transaction to it. Fails with `CapacityExceeded` when
    /// the pool is empty.
    fn debit_report_pool(
        &self,
        user_ref: &str,
        details: &ConsumptionDetails,
        now: DateTime<Utc>,
    ) -> EntitlementResult<ReportTransaction>;

    /// Record an order and create its plan in one transaction. A repeated
    /// `order_payment_id` returns the original grant without writing.
    /// `plan` / `report_plan` is the plan to create for the order's kind.
    fn fulfill_order(
        &self,
        order: &CompletedOrder,
        plan: Option<&Plan>,
        report_plan: Option<&ReportPlan>,
        now: DateTime<Utc>,
    ) -> EntitlementResult<FulfillmentOutcome>;

    // ── Reads ──

    /// The grant already recorded for `order.order_payment_id`, if any.
    /// Fails with `InvalidInput` when it was recorded for a different user.
    fn fulfilled_order(&self, order: &CompletedOrder) -> EntitlementResult<Option<GrantedPlan>>;

    fn plans_for_user(&self, user_ref: &str) -> EntitlementResult<Vec<PlanUsage>>;

    fn get_plan(&self, plan_id: &str) -> EntitlementResult<Option<PlanUsage>>;

    /// Ordered oldest first.
    fn report_plans_for_user(&self, user_ref: &str) -> EntitlementResult<Vec<ReportPlanUsage>>;

    /// Ordered oldest first.
    fn transactions_for_plan(&self, plan_id: &str) -> EntitlementResult<Vec<Transaction>>;

    /// Ordered oldest first.
    fn report_transactions_for_user(
        &self,
        user_ref: &str,
    ) -> EntitlementResult<Vec<ReportTransaction>>;

    // ── Lifecycle ──

    fn stats(&self) -> EntitlementResult<StorageStats>;

    /// Cheap liveness probe.
    fn ping(&self) -> EntitlementResult<()>;
}
