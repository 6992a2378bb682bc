//! SQLite PRAGMA configuration for entitlement connections.
//! Must be called on every connection immediately after opening.

use rusqlite::Connection;

use terraview_core::errors::EntitlementResult;

use super::to_storage_err;

/// Configure a read-write connection.
///
/// - WAL so readers never block the debit writer
/// - busy_timeout so a competing `BEGIN IMMEDIATE` waits instead of failing
/// - foreign_keys so audit rows cannot point at missing plans
pub fn configure_connection(conn: &Connection, busy_timeout_ms: u32) -> EntitlementResult<()> {
    conn.execute_batch(&format!(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
        PRAGMA busy_timeout = {busy_timeout_ms};
        PRAGMA cache_size = -8000;
        PRAGMA temp_store = MEMORY;
        "
    ))
    .map_err(to_storage_err)?;
    Ok(())
}

/// Configure a reader. Same PRAGMAs plus `query_only = ON`.
pub fn configure_readonly_connection(
    conn: &Connection,
    busy_timeout_ms: u32,
) -> EntitlementResult<()> {
    conn.execute_batch(&format!(
        "
        PRAGMA foreign_keys = ON;
        PRAGMA busy_timeout = {busy_timeout_ms};
        PRAGMA cache_size = -8000;
        PRAGMA temp_store = MEMORY;
        PRAGMA query_only = ON;
        "
    ))
    .map_err(to_storage_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configure_connection_sets_busy_timeout() {
        let conn = Connection::open_in_memory().unwrap();
        configure_connection(&conn, 2500).unwrap();

        let timeout: i64 = conn
            .pragma_query_value(None, "busy_timeout", |row| row.get(0))
            .unwrap();
        assert_eq!(timeout, 2500);
    }

    #[test]
    fn test_configure_connection_sets_foreign_keys() {
        let conn = Connection::open_in_memory().unwrap();
        configure_connection(&conn, 5000).unwrap();

        let fk: i64 = conn
            .pragma_query_value(None, "foreign_keys", |row| row.get(0))
            .unwrap();
        assert_eq!(fk, 1);
    }

    #[test]
    fn test_readonly_connection_rejects_writes() {
        let conn = Connection::open_in_memory().unwrap();
        configure_readonly_connection(&conn, 5000).unwrap();

        let result = conn.execute_batch("CREATE TABLE t (x INTEGER)");
        assert!(result.is_err(), "query_only connection accepted a write");
    }
}
