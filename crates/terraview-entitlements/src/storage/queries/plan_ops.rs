//! Raw SQL operations for the plans and transactions tables.

use rusqlite::{params, Connection, OptionalExtension};

use terraview_core::errors::EntitlementResult;
use terraview_core::models::{ConsumptionDetails, Plan, PlanType, PlanUsage, Transaction};

use super::{corrupt, fmt_ts, parse_ts};
use crate::storage::to_storage_err;

/// Raw plan row with its transaction count.
#[derive(Debug, Clone)]
pub struct RawPlanRow {
    pub id: String,
    pub user_ref: String,
    pub plan_type: String,
    pub entity_name: String,
    pub duration_months: u32,
    pub created_at: String,
    pub used: u32,
}

impl RawPlanRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_ref: row.get(1)?,
            plan_type: row.get(2)?,
            entity_name: row.get(3)?,
            duration_months: row.get(4)?,
            created_at: row.get(5)?,
            used: row.get(6)?,
        })
    }

    fn into_usage(self) -> EntitlementResult<PlanUsage> {
        let plan_type: PlanType = self
            .plan_type
            .parse()
            .map_err(|_| corrupt("plans", format!("unknown plan_type '{}'", self.plan_type)))?;
        Ok(PlanUsage {
            plan: Plan {
                created_at: parse_ts("plans", &self.created_at)?,
                id: self.id,
                user_ref: self.user_ref,
                plan_type,
                entity_name: self.entity_name,
                duration_months: self.duration_months,
            },
            used: self.used,
        })
    }
}

const SELECT_PLAN_WITH_COUNT: &str = "
    SELECT p.id, p.user_ref, p.plan_type, p.entity_name, p.duration_months, p.created_at,
           (SELECT COUNT(*) FROM transactions t WHERE t.plan_id = p.id) AS used
    FROM plans p";

pub fn insert_plan(conn: &Connection, plan: &Plan) -> EntitlementResult<()> {
    conn.execute(
        "INSERT INTO plans (id, user_ref, plan_type, entity_name, duration_months, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            plan.id,
            plan.user_ref,
            plan.plan_type.as_str(),
            plan.entity_name,
            plan.duration_months,
            fmt_ts(plan.created_at),
        ],
    )
    .map_err(to_storage_err)?;
    Ok(())
}

/// All plans of a user, oldest first, with current transaction counts.
pub fn plans_for_user(conn: &Connection, user_ref: &str) -> EntitlementResult<Vec<PlanUsage>> {
    let mut stmt = conn
        .prepare(&format!(
            "{SELECT_PLAN_WITH_COUNT} WHERE p.user_ref = ?1 ORDER BY p.created_at ASC, p.rowid ASC"
        ))
        .map_err(to_storage_err)?;
    let rows = stmt
        .query_map(params![user_ref], RawPlanRow::from_row)
        .map_err(to_storage_err)?;

    let mut plans = Vec::new();
    for row in rows {
        plans.push(row.map_err(to_storage_err)?.into_usage()?);
    }
    Ok(plans)
}

pub fn get_plan(conn: &Connection, plan_id: &str) -> EntitlementResult<Option<PlanUsage>> {
    let raw = conn
        .query_row(
            &format!("{SELECT_PLAN_WITH_COUNT} WHERE p.id = ?1"),
            params![plan_id],
            RawPlanRow::from_row,
        )
        .optional()
        .map_err(to_storage_err)?;
    raw.map(RawPlanRow::into_usage).transpose()
}

pub fn insert_transaction(conn: &Connection, tx: &Transaction) -> EntitlementResult<()> {
    let details = serde_json::to_string(&tx.details)?;
    conn.execute(
        "INSERT INTO transactions (id, plan_id, details, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![tx.id, tx.plan_id, details, fmt_ts(tx.created_at)],
    )
    .map_err(to_storage_err)?;
    Ok(())
}

pub fn transactions_for_plan(conn: &Connection, plan_id: &str) -> EntitlementResult<Vec<Transaction>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, plan_id, details, created_at FROM transactions
             WHERE plan_id = ?1 ORDER BY created_at ASC, rowid ASC",
        )
        .map_err(to_storage_err)?;
    let rows = stmt
        .query_map(params![plan_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })
        .map_err(to_storage_err)?;

    let mut out = Vec::new();
    for row in rows {
        let (id, plan_id, details, created_at) = row.map_err(to_storage_err)?;
        let details: ConsumptionDetails = serde_json::from_str(&details)
            .map_err(|e| corrupt("transactions", format!("bad details for {id}: {e}")))?;
        out.push(Transaction {
            created_at: parse_ts("transactions", &created_at)?,
            id,
            plan_id,
            details,
        });
    }
    Ok(out)
}

pub fn count_plans(conn: &Connection) -> EntitlementResult<u64> {
    count(conn, "SELECT COUNT(*) FROM plans")
}

pub fn count_transactions(conn: &Connection) -> EntitlementResult<u64> {
    count(conn, "SELECT COUNT(*) FROM transactions")
}

pub(crate) fn count(conn: &Connection, sql: &str) -> EntitlementResult<u64> {
    let n: i64 = conn
        .query_row(sql, [], |row| row.get(0))
        .map_err(to_storage_err)?;
    Ok(n.max(0) as u64)
}
