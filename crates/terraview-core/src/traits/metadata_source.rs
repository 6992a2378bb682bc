use crate::errors::EntitlementResult;
use crate::models::HierarchyEntry;

/// Read-only source of flat hierarchy rows (the metadata read replica).
pub trait IMetadataSource: Send + Sync {
    fn fetch_entries(&self, state: &str) -> EntitlementResult<Vec<HierarchyEntry>>;
}
