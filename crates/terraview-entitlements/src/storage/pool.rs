//! ConnectionPool: one writer + N readers with round-robin selection.
//!
//! The writer is the only connection that ever writes. Every debit goes
//! through `with_immediate_transaction`, which holds the writer mutex and a
//! SQLite RESERVED lock for the whole check-then-insert, so debits serialize
//! across threads in this process and across processes sharing the file.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use rusqlite::{Connection, OpenFlags, TransactionBehavior};

use terraview_core::errors::{EntitlementResult, StorageError};

use super::{pragmas, to_storage_err};

/// Default number of reader connections.
const DEFAULT_READ_POOL_SIZE: usize = 2;

pub struct ConnectionPool {
    writer: Mutex<Connection>,
    readers: Vec<Mutex<Connection>>,
    read_index: AtomicUsize,
}

impl ConnectionPool {
    /// Open a file-backed pool. The writer is opened (and may create the file)
    /// before any reader.
    pub fn open(path: &Path, read_pool_size: usize, busy_timeout_ms: u32) -> EntitlementResult<Self> {
        let pool_size = if read_pool_size == 0 {
            DEFAULT_READ_POOL_SIZE
        } else {
            read_pool_size
        };

        let writer = Connection::open(path).map_err(to_storage_err)?;
        pragmas::configure_connection(&writer, busy_timeout_ms)?;

        let mut readers = Vec::with_capacity(pool_size);
        for _ in 0..pool_size {
            let reader = Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )
            .map_err(to_storage_err)?;
            pragmas::configure_readonly_connection(&reader, busy_timeout_ms)?;
            readers.push(Mutex::new(reader));
        }

        Ok(Self {
            writer: Mutex::new(writer),
            readers,
            read_index: AtomicUsize::new(0),
        })
    }

    /// In-memory pool. Readers fall back to the writer since a private
    /// in-memory database cannot be shared between connections.
    pub fn open_in_memory(busy_timeout_ms: u32) -> EntitlementResult<Self> {
        let writer = Connection::open_in_memory().map_err(to_storage_err)?;
        pragmas::configure_connection(&writer, busy_timeout_ms)?;

        Ok(Self {
            writer: Mutex::new(writer),
            readers: Vec::new(),
            read_index: AtomicUsize::new(0),
        })
    }

    /// Execute a closure with the writer connection.
    pub fn with_writer<F, T>(&self, f: F) -> EntitlementResult<T>
    where
        F: FnOnce(&Connection) -> EntitlementResult<T>,
    {
        let conn = self
            .writer
            .lock()
            .map_err(|e| StorageError::LockPoisoned(format!("writer: {e}")))?;
        f(&conn)
    }

    /// Execute a closure with a reader connection (round-robin).
    pub fn with_reader<F, T>(&self, f: F) -> EntitlementResult<T>
    where
        F: FnOnce(&Connection) -> EntitlementResult<T>,
    {
        if self.readers.is_empty() {
            return self.with_writer(f);
        }

        let index = self.read_index.fetch_add(1, Ordering::Relaxed) % self.readers.len();
        let conn = self.readers[index]
            .lock()
            .map_err(|e| StorageError::LockPoisoned(format!("reader {index}: {e}")))?;
        f(&conn)
    }

    /// Run `f` inside `BEGIN IMMEDIATE ... COMMIT` on the writer.
    ///
    /// Any error from `f` (or a panic, or the commit itself failing) drops the
    /// transaction, which rolls back everything `f` wrote.
    pub fn with_immediate_transaction<F, T>(&self, f: F) -> EntitlementResult<T>
    where
        F: FnOnce(&Connection) -> EntitlementResult<T>,
    {
        self.with_writer(|conn| {
            let tx = rusqlite::Transaction::new_unchecked(conn, TransactionBehavior::Immediate)
                .map_err(to_storage_err)?;
            let value = f(&tx)?;
            tx.commit().map_err(to_storage_err)?;
            Ok(value)
        })
    }

    pub fn reader_count(&self) -> usize {
        self.readers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use terraview_core::EntitlementError;

    #[test]
    fn failed_closure_rolls_back() {
        let pool = ConnectionPool::open_in_memory(5000).unwrap();
        pool.with_writer(|conn| {
            conn.execute_batch("CREATE TABLE t (x INTEGER)")
                .map_err(to_storage_err)
        })
        .unwrap();

        let result: EntitlementResult<()> = pool.with_immediate_transaction(|conn| {
            conn.execute("INSERT INTO t (x) VALUES (1)", [])
                .map_err(to_storage_err)?;
            Err(EntitlementError::InvalidInput("abort".into()))
        });
        assert!(result.is_err());

        let count: i64 = pool
            .with_reader(|conn| {
                conn.query_row("SELECT COUNT(*) FROM t", [], |row| row.get(0))
                    .map_err(to_storage_err)
            })
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn file_pool_opens_readers() {
        let dir = tempfile::tempdir().unwrap();
        let pool = ConnectionPool::open(&dir.path().join("e.db"), 3, 5000).unwrap();
        assert_eq!(pool.reader_count(), 3);
    }
}
