//! Raw SQL operations for the report_plans and report_transactions tables.

use rusqlite::{params, Connection};

use terraview_core::errors::EntitlementResult;
use terraview_core::models::{ConsumptionDetails, ReportPlan, ReportPlanUsage, ReportTransaction};

use super::plan_ops::count;
use super::{corrupt, fmt_ts, parse_ts};
use crate::storage::to_storage_err;

pub fn insert_report_plan(conn: &Connection, plan: &ReportPlan) -> EntitlementResult<()> {
    conn.execute(
        "INSERT INTO report_plans (id, user_ref, quantity, duration_months, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            plan.id,
            plan.user_ref,
            plan.quantity,
            plan.duration_months,
            fmt_ts(plan.created_at),
        ],
    )
    .map_err(to_storage_err)?;
    Ok(())
}

/// A user's report plan pool, oldest first. This order is the FIFO debit order.
pub fn report_plans_for_user(
    conn: &Connection,
    user_ref: &str,
) -> EntitlementResult<Vec<ReportPlanUsage>> {
    let mut stmt = conn
        .prepare(
            "SELECT r.id, r.user_ref, r.quantity, r.duration_months, r.created_at,
                    (SELECT COUNT(*) FROM report_transactions t WHERE t.report_plan_id = r.id)
             FROM report_plans r
             WHERE r.user_ref = ?1
             ORDER BY r.created_at ASC, r.rowid ASC",
        )
        .map_err(to_storage_err)?;
    let rows = stmt
        .query_map(params![user_ref], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, u32>(2)?,
                row.get::<_, u32>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, u32>(5)?,
            ))
        })
        .map_err(to_storage_err)?;

    let mut pool = Vec::new();
    for row in rows {
        let (id, user_ref, quantity, duration_months, created_at, used) =
            row.map_err(to_storage_err)?;
        pool.push(ReportPlanUsage {
            plan: ReportPlan {
                created_at: parse_ts("report_plans", &created_at)?,
                id,
                user_ref,
                quantity,
                duration_months,
            },
            used,
        });
    }
    Ok(pool)
}

pub fn insert_report_transaction(conn: &Connection, tx: &ReportTransaction) -> EntitlementResult<()> {
    let details = serde_json::to_string(&tx.details)?;
    conn.execute(
        "INSERT INTO report_transactions (id, report_plan_id, details, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![tx.id, tx.report_plan_id, details, fmt_ts(tx.created_at)],
    )
    .map_err(to_storage_err)?;
    Ok(())
}

/// Every report transaction across a user's pool, oldest first.
pub fn report_transactions_for_user(
    conn: &Connection,
    user_ref: &str,
) -> EntitlementResult<Vec<ReportTransaction>> {
    let mut stmt = conn
        .prepare(
            "SELECT t.id, t.report_plan_id, t.details, t.created_at
             FROM report_transactions t
             JOIN report_plans r ON r.id = t.report_plan_id
             WHERE r.user_ref = ?1
             ORDER BY t.created_at ASC, t.rowid ASC",
        )
        .map_err(to_storage_err)?;
    let rows = stmt
        .query_map(params![user_ref], |row| {
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
        let (id, report_plan_id, details, created_at) = row.map_err(to_storage_err)?;
        let details: ConsumptionDetails = serde_json::from_str(&details)
            .map_err(|e| corrupt("report_transactions", format!("bad details for {id}: {e}")))?;
        out.push(ReportTransaction {
            created_at: parse_ts("report_transactions", &created_at)?,
            id,
            report_plan_id,
            details,
        });
    }
    Ok(out)
}

pub fn count_report_plans(conn: &Connection) -> EntitlementResult<u64> {
    count(conn, "SELECT COUNT(*) FROM report_plans")
}

pub fn count_report_transactions(conn: &Connection) -> EntitlementResult<u64> {
    count(conn, "SELECT COUNT(*) FROM report_transactions")
}
