//! `IMetadataSource` implementations.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection, OpenFlags};

use terraview_core::errors::{EntitlementResult, StorageError};
use terraview_core::models::HierarchyEntry;
use terraview_core::traits::IMetadataSource;

use crate::storage::{configure_readonly_connection, to_storage_err};

/// In-memory rows, filtered by state on fetch.
#[derive(Debug, Clone, Default)]
pub struct StaticMetadataSource {
    entries: Vec<HierarchyEntry>,
}

impl StaticMetadataSource {
    pub fn new(entries: Vec<HierarchyEntry>) -> Self {
        Self { entries }
    }
}

impl IMetadataSource for StaticMetadataSource {
    fn fetch_entries(&self, state: &str) -> EntitlementResult<Vec<HierarchyEntry>> {
        Ok(self
            .entries
            .iter()
            .filter(|e| e.state.trim().eq_ignore_ascii_case(state.trim()))
            .cloned()
            .collect())
    }
}

/// Read replica holding a `land_metadata` table. Never written to.
pub struct SqliteMetadataSource {
    conn: Mutex<Connection>,
}

impl SqliteMetadataSource {
    pub fn open(path: &Path, busy_timeout_ms: u32) -> EntitlementResult<Self> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(to_storage_err)?;
        configure_readonly_connection(&conn, busy_timeout_ms)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl IMetadataSource for SqliteMetadataSource {
    fn fetch_entries(&self, state: &str) -> EntitlementResult<Vec<HierarchyEntry>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StorageError::LockPoisoned(format!("metadata: {e}")))?;
        let mut stmt = conn
            .prepare(
                "SELECT state, district_code, district_name, taluka_code, taluka_name,
                        village_code, village_name
                 FROM land_metadata
                 WHERE lower(trim(state)) = lower(trim(?1))",
            )
            .map_err(to_storage_err)?;
        let rows = stmt
            .query_map(params![state], |row| {
                Ok(HierarchyEntry {
                    state: row.get(0)?,
                    district_code: row.get(1)?,
                    district_name: row.get(2)?,
                    taluka_code: row.get(3)?,
                    taluka_name: row.get(4)?,
                    village_code: row.get(5)?,
                    village_name: row.get(6)?,
                })
            })
            .map_err(to_storage_err)?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row.map_err(to_storage_err)?);
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_source_reads_replica_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metadata.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                "CREATE TABLE land_metadata (
                    state TEXT, district_code TEXT, district_name TEXT,
                    taluka_code TEXT, taluka_name TEXT, village_code TEXT, village_name TEXT
                 );
                 INSERT INTO land_metadata VALUES
                    ('Maharashtra', '19', 'Jalgaon', '1901', 'Parola', '190102', 'Mohadi'),
                    ('Gujarat', '24', 'Surat', '2401', 'Olpad', '240101', 'Kareli');",
            )
            .unwrap();
        }

        let source = SqliteMetadataSource::open(&path, 1000).unwrap();
        let rows = source.fetch_entries("maharashtra").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].village_name, "Mohadi");
    }

    #[test]
    fn static_source_filters_by_state() {
        let source = StaticMetadataSource::new(vec![HierarchyEntry {
            state: "Maharashtra".into(),
            district_code: "19".into(),
            district_name: "Jalgaon".into(),
            taluka_code: "1901".into(),
            taluka_name: "Parola".into(),
            village_code: "190102".into(),
            village_name: "Mohadi".into(),
        }]);
        assert_eq!(source.fetch_entries("maharashtra").unwrap().len(), 1);
        assert!(source.fetch_entries("goa").unwrap().is_empty());
    }
}
