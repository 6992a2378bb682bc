//! RecoveryAction: what a caller should do with a failed entitlement operation.

use std::fmt;

use super::{EntitlementError, StorageError};

/// Recommended recovery action for a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Transient failure (lock contention). Retrying consumes fresh capacity.
    Retry,
    /// Business outcome. Report it to the user, never retry.
    Reject,
    /// Cannot be handled per request; needs operator attention.
    Escalate,
}

impl RecoveryAction {
    /// Determine the recommended recovery action for an `EntitlementError`.
    pub fn for_error(error: &EntitlementError) -> Self {
        match error {
            EntitlementError::Storage(StorageError::Busy { .. }) => Self::Retry,
            EntitlementError::GenerationFailed(crate::errors::RenderError::Unavailable(_)) => {
                Self::Retry
            }

            EntitlementError::AccessDenied { .. }
            | EntitlementError::CapacityExceeded { .. }
            | EntitlementError::InvalidEntity { .. }
            | EntitlementError::NotFound { .. }
            | EntitlementError::PlanNotFound { .. }
            | EntitlementError::InvalidInput(_)
            | EntitlementError::GenerationFailed(_) => Self::Reject,

            EntitlementError::Storage(_)
            | EntitlementError::Config(_)
            | EntitlementError::Serialization(_) => Self::Escalate,
        }
    }
}

impl fmt::Display for RecoveryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Retry => write!(f, "Retry"),
            Self::Reject => write!(f, "Reject"),
            Self::Escalate => write!(f, "Escalate"),
        }
    }
}
