//! # terraview-core
//!
//! Shared vocabulary for the land-record entitlement engine.
//!
//! ## Modules
//! - `config`: EntitlementConfig and per-subsystem sections, TOML loading, validation
//! - `errors`: EntitlementError, StorageError, RenderError, RecoveryAction
//! - `models`: plans, report plans, audit records, hierarchy rows, access types, orders
//! - `traits`: storage, render service, metadata source and clock seams

pub mod config;
pub mod errors;
pub mod models;
pub mod traits;

pub use config::EntitlementConfig;
pub use errors::{EntitlementError, EntitlementResult};
