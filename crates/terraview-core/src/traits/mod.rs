mod clock;
mod entitlement_storage;
mod metadata_source;
mod render_service;

pub use clock::{Clock, FixedClock, SystemClock};
pub use entitlement_storage::{IEntitlementStorage, PlanDebit, StorageStats};
pub use metadata_source::IMetadataSource;
pub use render_service::{ArtifactRequest, IRenderService};
