//! # terraview-entitlements
//!
//! Entitlement resolution and consumption accounting for land-record
//! artifacts. Decides whether a user's plans cover a village, taluka,
//! district or tile table, and records one audit row per served artifact
//! without ever overdrawing a plan.
//!
//! ## Modules
//! - `hierarchy`: district → taluka → village index, metadata sources, refresh cache
//! - `storage`: SQLite pool, PRAGMAs, migrations, `IEntitlementStorage` implementation
//! - `store`: plan creation and valid-plan views
//! - `resolver`: entity and table-key access checks, access level
//! - `ledger`: atomic debits, report pool FIFO, plan match policy, audit history
//! - `reports`: report request flow and tile authorization
//! - `fulfillment`: idempotent order → plan conversion
//! - `health`: per-subsystem checks
//! - `observability`: tracing subscriber setup

pub mod fulfillment;
pub mod health;
pub mod hierarchy;
pub mod ledger;
pub mod observability;
pub mod reports;
pub mod resolver;
pub mod storage;
pub mod store;

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use terraview_core::errors::{EntitlementError, EntitlementResult};
use terraview_core::traits::{Clock, IEntitlementStorage, IMetadataSource, IRenderService, SystemClock};
use terraview_core::EntitlementConfig;

use crate::fulfillment::OrderFulfillment;
use crate::health::EngineHealth;
use crate::hierarchy::{HierarchyCache, SqliteMetadataSource};
use crate::ledger::ConsumptionLedger;
use crate::reports::ReportService;
use crate::resolver::AccessResolver;
use crate::storage::SqliteEntitlementStorage;
use crate::store::EntitlementStore;

/// All entitlement components wired over one storage and one hierarchy.
pub struct EntitlementEngine {
    config: EntitlementConfig,
    storage: Arc<dyn IEntitlementStorage>,
    hierarchy: Arc<HierarchyCache>,
    store: Arc<EntitlementStore>,
    resolver: Arc<AccessResolver>,
    ledger: Arc<ConsumptionLedger>,
    fulfillment: OrderFulfillment,
    reports: ReportService,
}

impl EntitlementEngine {
    /// Open SQLite storage and the metadata replica named in `config`.
    pub fn open(
        config: EntitlementConfig,
        render: Arc<dyn IRenderService>,
    ) -> EntitlementResult<Self> {
        config.validate()?;
        let metadata_path = config.hierarchy.metadata_db_path.as_deref().ok_or_else(|| {
            EntitlementError::Config("hierarchy.metadata_db_path is required".to_string())
        })?;
        let metadata = SqliteMetadataSource::open(
            Path::new(metadata_path),
            config.storage.busy_timeout_ms,
        )?;
        let storage = SqliteEntitlementStorage::open(&config.storage)?;
        Self::with_parts(
            config,
            Arc::new(storage),
            Arc::new(metadata),
            render,
            Arc::new(SystemClock),
        )
    }

    /// Wire the engine over caller-supplied collaborators.
    pub fn with_parts(
        config: EntitlementConfig,
        storage: Arc<dyn IEntitlementStorage>,
        metadata: Arc<dyn IMetadataSource>,
        render: Arc<dyn IRenderService>,
        clock: Arc<dyn Clock>,
    ) -> EntitlementResult<Self> {
        config.validate()?;
        let hierarchy = Arc::new(HierarchyCache::load(
            metadata,
            &config.hierarchy,
            Arc::clone(&clock),
        )?);
        let store = Arc::new(EntitlementStore::new(
            Arc::clone(&storage),
            Arc::clone(&hierarchy),
            config.plans.clone(),
            clock,
        ));
        let resolver = Arc::new(AccessResolver::new(Arc::clone(&store)));
        let ledger = Arc::new(ConsumptionLedger::new(
            Arc::clone(&store),
            config.ledger.clone(),
        ));
        let fulfillment = OrderFulfillment::new(Arc::clone(&store), config.reports.clone());
        let reports = ReportService::new(
            Arc::clone(&resolver),
            Arc::clone(&ledger),
            render,
            config.hierarchy.default_state.clone(),
        );

        info!(
            consumption_target = ?config.ledger.consumption_target,
            plan_match = ?config.ledger.plan_match,
            "entitlement engine ready"
        );
        Ok(Self {
            config,
            storage,
            hierarchy,
            store,
            resolver,
            ledger,
            fulfillment,
            reports,
        })
    }

    pub fn config(&self) -> &EntitlementConfig {
        &self.config
    }

    pub fn storage(&self) -> &Arc<dyn IEntitlementStorage> {
        &self.storage
    }

    pub fn hierarchy(&self) -> &Arc<HierarchyCache> {
        &self.hierarchy
    }

    pub fn store(&self) -> &EntitlementStore {
        &self.store
    }

    pub fn resolver(&self) -> &AccessResolver {
        &self.resolver
    }

    pub fn ledger(&self) -> &ConsumptionLedger {
        &self.ledger
    }

    pub fn fulfillment(&self) -> &OrderFulfillment {
        &self.fulfillment
    }

    pub fn reports(&self) -> &ReportService {
        &self.reports
    }

    pub fn health_check(&self) -> EngineHealth {
        health::compute_health(vec![
            health::check_storage(self.storage.as_ref()),
            health::check_hierarchy(&self.hierarchy),
        ])
    }
}
