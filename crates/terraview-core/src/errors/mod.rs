mod entitlement_error;
mod recovery;
mod render_error;
mod storage_error;

pub use entitlement_error::{EntitlementError, EntitlementResult};
pub use recovery::RecoveryAction;
pub use render_error::RenderError;
pub use storage_error::StorageError;
