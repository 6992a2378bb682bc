//! SqliteEntitlementStorage: `IEntitlementStorage` over a `ConnectionPool`.
//!
//! Reads go through the reader pool. Every write that must observe a count
//! runs inside `with_immediate_transaction`, so the capacity check and the
//! audit insert are one unit.

use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::debug;

use terraview_core::config::StorageConfig;
use terraview_core::errors::{EntitlementError, EntitlementResult};
use terraview_core::models::{
    CompletedOrder, ConsumptionDetails, FulfillmentOutcome, GrantedPlan, Plan, PlanUsage,
    ReportPlan, ReportPlanUsage, ReportTransaction, Transaction,
};
use terraview_core::traits::{IEntitlementStorage, PlanDebit, StorageStats};

use super::migrations;
use super::pool::ConnectionPool;
use super::queries::{order_ops, plan_ops, report_ops};
use super::to_storage_err;

pub struct SqliteEntitlementStorage {
    pool: ConnectionPool,
}

impl SqliteEntitlementStorage {
    /// Open per `config`: a file when `db_path` is set, otherwise in memory.
    pub fn open(config: &StorageConfig) -> EntitlementResult<Self> {
        match config.db_path.as_deref() {
            Some(path) => Self::open_file(Path::new(path), config),
            None => Self::open_in_memory(),
        }
    }

    pub fn open_file(path: &Path, config: &StorageConfig) -> EntitlementResult<Self> {
        let pool = ConnectionPool::open(path, config.read_pool_size, config.busy_timeout_ms)?;
        Self::from_pool(pool)
    }

    pub fn open_in_memory() -> EntitlementResult<Self> {
        let pool = ConnectionPool::open_in_memory(StorageConfig::default().busy_timeout_ms)?;
        Self::from_pool(pool)
    }

    fn from_pool(pool: ConnectionPool) -> EntitlementResult<Self> {
        let version = pool.with_writer(migrations::migrate)?;
        debug!(version, readers = pool.reader_count(), "entitlement storage ready");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }
}

impl IEntitlementStorage for SqliteEntitlementStorage {
    fn insert_plan(&self, plan: &Plan) -> EntitlementResult<()> {
        self.pool
            .with_writer(|conn| plan_ops::insert_plan(conn, plan))
    }

    fn insert_report_plan(&self, plan: &ReportPlan) -> EntitlementResult<()> {
        self.pool
            .with_writer(|conn| report_ops::insert_report_plan(conn, plan))
    }

    fn debit_plan(&self, debit: PlanDebit<'_>) -> EntitlementResult<Transaction> {
        self.pool.with_immediate_transaction(|conn| {
            let usage = plan_ops::get_plan(conn, debit.plan_id)?
                .filter(|u| u.plan.user_ref == debit.user_ref)
                .ok_or_else(|| EntitlementError::PlanNotFound {
                    id: debit.plan_id.to_string(),
                })?;

            let scope = format!("{} plan '{}'", usage.plan.plan_type, usage.plan.entity_name);
            if debit.now >= usage.plan.valid_till() {
                return Err(EntitlementError::CapacityExceeded {
                    scope,
                    detail: format!("expired at {}", usage.plan.valid_till()),
                });
            }
            if usage.used >= debit.allowed {
                return Err(EntitlementError::CapacityExceeded {
                    scope,
                    detail: format!("{} of {} transactions used", usage.used, debit.allowed),
                });
            }

            let tx = Transaction {
                id: uuid::Uuid::new_v4().to_string(),
                plan_id: usage.plan.id,
                created_at: debit.now,
                details: debit.details.clone(),
            };
            plan_ops::insert_transaction(conn, &tx)?;
            debug!(plan_id = %tx.plan_id, used = usage.used + 1, allowed = debit.allowed, "plan debited");
            Ok(tx)
        })
    }

    fn debit_report_pool(
        &self,
        user_ref: &str,
        details: &ConsumptionDetails,
        now: DateTime<Utc>,
    ) -> EntitlementResult<ReportTransaction> {
        self.pool.with_immediate_transaction(|conn| {
            let pool = report_ops::report_plans_for_user(conn, user_ref)?;
            let Some(usage) = pool.into_iter().find(|u| u.is_valid_at(now)) else {
                return Err(EntitlementError::CapacityExceeded {
                    scope: "report pool".to_string(),
                    detail: format!("no report plan with remaining quantity for user {user_ref}"),
                });
            };

            let tx = ReportTransaction {
                id: uuid::Uuid::new_v4().to_string(),
                report_plan_id: usage.plan.id,
                created_at: now,
                details: details.clone(),
            };
            report_ops::insert_report_transaction(conn, &tx)?;
            debug!(
                report_plan_id = %tx.report_plan_id,
                used = usage.used + 1,
                quantity = usage.plan.quantity,
                "report pool debited"
            );
            Ok(tx)
        })
    }

    fn fulfill_order(
        &self,
        order: &CompletedOrder,
        plan: Option<&Plan>,
        report_plan: Option<&ReportPlan>,
        now: DateTime<Utc>,
    ) -> EntitlementResult<FulfillmentOutcome> {
        self.pool.with_immediate_transaction(|conn| {
            if let Some(granted) = recorded_grant(conn, order)? {
                return Ok(FulfillmentOutcome::AlreadyFulfilled(granted));
            }

            let kind = order.product.kind();
            let plan_id = match (plan, report_plan) {
                (Some(plan), None) => {
                    plan_ops::insert_plan(conn, plan)?;
                    plan.id.clone()
                }
                (None, Some(report_plan)) => {
                    report_ops::insert_report_plan(conn, report_plan)?;
                    report_plan.id.clone()
                }
                _ => {
                    return Err(EntitlementError::InvalidInput(format!(
                        "order {} must grant exactly one plan",
                        order.order_payment_id
                    )))
                }
            };

            let granted = GrantedPlan { kind, plan_id };
            order_ops::insert_fulfilled_order(
                conn,
                &order.order_payment_id,
                &order.user_ref,
                &granted,
                now,
            )?;
            Ok(FulfillmentOutcome::Granted(granted))
        })
    }

    fn fulfilled_order(&self, order: &CompletedOrder) -> EntitlementResult<Option<GrantedPlan>> {
        self.pool.with_reader(|conn| recorded_grant(conn, order))
    }

    fn plans_for_user(&self, user_ref: &str) -> EntitlementResult<Vec<PlanUsage>> {
        self.pool
            .with_reader(|conn| plan_ops::plans_for_user(conn, user_ref))
    }

    fn get_plan(&self, plan_id: &str) -> EntitlementResult<Option<PlanUsage>> {
        self.pool.with_reader(|conn| plan_ops::get_plan(conn, plan_id))
    }

    fn report_plans_for_user(&self, user_ref: &str) -> EntitlementResult<Vec<ReportPlanUsage>> {
        self.pool
            .with_reader(|conn| report_ops::report_plans_for_user(conn, user_ref))
    }

    fn transactions_for_plan(&self, plan_id: &str) -> EntitlementResult<Vec<Transaction>> {
        self.pool
            .with_reader(|conn| plan_ops::transactions_for_plan(conn, plan_id))
    }

    fn report_transactions_for_user(
        &self,
        user_ref: &str,
    ) -> EntitlementResult<Vec<ReportTransaction>> {
        self.pool
            .with_reader(|conn| report_ops::report_transactions_for_user(conn, user_ref))
    }

    fn stats(&self) -> EntitlementResult<StorageStats> {
        self.pool.with_reader(|conn| {
            Ok(StorageStats {
                plan_count: plan_ops::count_plans(conn)?,
                report_plan_count: report_ops::count_report_plans(conn)?,
                transaction_count: plan_ops::count_transactions(conn)?,
                report_transaction_count: report_ops::count_report_transactions(conn)?,
                fulfilled_order_count: order_ops::count_fulfilled_orders(conn)?,
            })
        })
    }

    fn ping(&self) -> EntitlementResult<()> {
        self.pool.with_reader(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                .map_err(to_storage_err)?;
            Ok(())
        })
    }
}

/// The grant stored for the order's payment id, refused if another user owns it.
fn recorded_grant(
    conn: &rusqlite::Connection,
    order: &CompletedOrder,
) -> EntitlementResult<Option<GrantedPlan>> {
    match order_ops::get_fulfilled_order(conn, &order.order_payment_id)? {
        Some(existing) if existing.user_ref != order.user_ref => {
            Err(EntitlementError::InvalidInput(format!(
                "order {} was fulfilled for a different user",
                order.order_payment_id
            )))
        }
        Some(existing) => Ok(Some(existing.granted)),
        None => Ok(None),
    }
}
