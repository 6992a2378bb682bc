//! Schema versioning. Forward-only, one `BEGIN IMMEDIATE` transaction per step.

use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info, warn};

use terraview_core::errors::{EntitlementError, EntitlementResult, StorageError};

use super::schema::ENTITLEMENT_TABLES_V1;
use super::to_storage_err;

/// Current schema version. Bump this when adding new migrations.
pub const CURRENT_VERSION: u32 = 1;

const MIGRATIONS: [(u32, &str, &str); 1] = [(1, "initial entitlement tables", ENTITLEMENT_TABLES_V1)];

/// Get the schema version recorded in the database (0 for a fresh file).
pub fn get_schema_version(conn: &Connection) -> EntitlementResult<u32> {
    let exists: bool = conn
        .query_row(
            "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='schema_version'",
            [],
            |row| row.get(0),
        )
        .map_err(to_storage_err)?;
    if !exists {
        return Ok(0);
    }

    let version: Option<u32> = conn
        .query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))
        .optional()
        .map_err(to_storage_err)?
        .flatten();
    Ok(version.unwrap_or(0))
}

/// Run all pending migrations. Returns the version the database ended at.
pub fn migrate(conn: &Connection) -> EntitlementResult<u32> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        ) STRICT;",
    )
    .map_err(to_storage_err)?;

    let current = get_schema_version(conn)?;
    if current >= CURRENT_VERSION {
        debug!("entitlement schema is up to date (v{current})");
        return Ok(current);
    }

    info!(from = current, to = CURRENT_VERSION, "running entitlement migrations");

    for &(version, name, sql) in &MIGRATIONS {
        if version <= current {
            continue;
        }

        conn.execute_batch("BEGIN IMMEDIATE")
            .map_err(|e| migration_err(version, e))?;

        let applied = conn.execute_batch(sql).and_then(|_| {
            conn.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                params![version],
            )
        });

        match applied {
            Ok(_) => {
                conn.execute_batch("COMMIT")
                    .map_err(|e| migration_err(version, e))?;
                info!("applied migration v{version:03}: {name}");
            }
            Err(e) => {
                warn!("migration v{version:03} failed: {e}, rolling back");
                let _ = conn.execute_batch("ROLLBACK");
                return Err(migration_err(version, e));
            }
        }
    }

    get_schema_version(conn)
}

fn migration_err(version: u32, e: rusqlite::Error) -> EntitlementError {
    EntitlementError::Storage(StorageError::MigrationFailed {
        version,
        reason: e.to_string(),
    })
}
