mod access;
mod hierarchy;
mod order;
mod plan;
mod transaction;

pub use access::{AccessGrant, AccessLevel, AccessTarget, Principal};
pub use hierarchy::{EntityRef, EntityType, HierarchyEntry, MetadataFilter};
pub use order::{CompletedOrder, FulfillmentOutcome, GrantedPlan, OrderKind, OrderProduct};
pub use plan::{
    check_duration_months, valid_till, Plan, PlanStatus, PlanType, PlanUsage, PoolSummary,
    ReportPlan, ReportPlanUsage, DAYS_PER_MONTH, MAX_DURATION_MONTHS,
};
pub use transaction::{
    ArtifactIdentifier, ConsumptionDetails, ReportTransaction, Transaction, TransactionRecord,
};
