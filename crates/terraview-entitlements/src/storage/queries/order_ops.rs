//! Raw SQL operations for the fulfilled_orders table.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use terraview_core::errors::EntitlementResult;
use terraview_core::models::{GrantedPlan, OrderKind};

use super::plan_ops::count;
use super::{corrupt, fmt_ts};
use crate::storage::to_storage_err;

/// A previously fulfilled order: who it belongs to and what it granted.
#[derive(Debug, Clone)]
pub struct FulfilledOrderRow {
    pub user_ref: String,
    pub granted: GrantedPlan,
}

pub fn get_fulfilled_order(
    conn: &Connection,
    order_payment_id: &str,
) -> EntitlementResult<Option<FulfilledOrderRow>> {
    let raw = conn
        .query_row(
            "SELECT user_ref, order_kind, plan_id FROM fulfilled_orders WHERE order_payment_id = ?1",
            params![order_payment_id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            },
        )
        .optional()
        .map_err(to_storage_err)?;

    let Some((user_ref, kind, plan_id)) = raw else {
        return Ok(None);
    };
    let kind = match kind.as_str() {
        "map_view" => OrderKind::MapView,
        "report" => OrderKind::Report,
        other => return Err(corrupt("fulfilled_orders", format!("unknown order_kind '{other}'"))),
    };
    Ok(Some(FulfilledOrderRow {
        user_ref,
        granted: GrantedPlan { kind, plan_id },
    }))
}

pub fn insert_fulfilled_order(
    conn: &Connection,
    order_payment_id: &str,
    user_ref: &str,
    granted: &GrantedPlan,
    fulfilled_at: DateTime<Utc>,
) -> EntitlementResult<()> {
    conn.execute(
        "INSERT INTO fulfilled_orders (order_payment_id, user_ref, order_kind, plan_id, fulfilled_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            order_payment_id,
            user_ref,
            granted.kind.as_str(),
            granted.plan_id,
            fmt_ts(fulfilled_at),
        ],
    )
    .map_err(to_storage_err)?;
    Ok(())
}

pub fn count_fulfilled_orders(conn: &Connection) -> EntitlementResult<u64> {
    count(conn, "SELECT COUNT(*) FROM fulfilled_orders")
}
