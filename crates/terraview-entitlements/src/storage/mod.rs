//! SQLite persistence for plans, report plans, their audit rows and fulfilled orders.

pub mod engine;
pub mod migrations;
pub mod pool;
pub mod pragmas;
pub mod queries;
pub mod schema;

pub use engine::SqliteEntitlementStorage;
pub use migrations::migrate;
pub use pool::ConnectionPool;
pub use pragmas::{configure_connection, configure_readonly_connection};
pub use schema::ENTITLEMENT_TABLE_NAMES;

use terraview_core::errors::{EntitlementError, StorageError};

/// Convert a rusqlite error into the storage variant of `EntitlementError`.
/// Lock contention maps to `StorageError::Busy` so callers can retry it.
pub fn to_storage_err(e: rusqlite::Error) -> EntitlementError {
    let busy = matches!(
        &e,
        rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: rusqlite::ffi::ErrorCode::DatabaseBusy
                    | rusqlite::ffi::ErrorCode::DatabaseLocked,
                ..
            },
            _,
        )
    );
    let message = e.to_string();
    EntitlementError::Storage(if busy {
        StorageError::Busy { message }
    } else {
        StorageError::SqliteError { message }
    })
}
