//! Raw SQL operations, one module per table family. Every function takes a
//! borrowed `Connection` so it can run inside the caller's transaction.

pub mod order_ops;
pub mod plan_ops;
pub mod report_ops;

use chrono::{DateTime, SecondsFormat, Utc};

use terraview_core::errors::{EntitlementError, EntitlementResult, StorageError};

/// Fixed-width RFC 3339 so text ordering equals time ordering.
pub fn fmt_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_ts(table: &str, raw: &str) -> EntitlementResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| corrupt(table, format!("bad timestamp '{raw}': {e}")))
}

pub fn corrupt(table: &str, reason: impl Into<String>) -> EntitlementError {
    EntitlementError::Storage(StorageError::CorruptRow {
        table: table.to_string(),
        reason: reason.into(),
    })
}
