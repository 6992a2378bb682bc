use super::{RenderError, StorageError};

/// Top-level error type for entitlement resolution and consumption.
/// Subsystem errors convert into this via `From` impls.
#[derive(Debug, thiserror::Error)]
pub enum EntitlementError {
    /// Plan creation referenced a geography the hierarchy does not know.
    #[error("invalid entity: '{entity_name}' does not exist for plan type '{plan_type}'")]
    InvalidEntity {
        plan_type: String,
        entity_name: String,
    },

    /// The user's entitlements do not cover the requested target.
    #[error("access denied: {reason}")]
    AccessDenied { reason: String },

    /// The user holds a covering plan, but it is exhausted or expired.
    #[error("capacity exceeded for {scope}: {detail}")]
    CapacityExceeded { scope: String, detail: String },

    /// Hierarchy lookup miss.
    #[error("{entity_type} '{name}' not found in hierarchy")]
    NotFound { entity_type: String, name: String },

    #[error("plan not found: {id}")]
    PlanNotFound { id: String },

    #[error("artifact generation failed: {0}")]
    GenerationFailed(#[from] RenderError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("config error: {0}")]
    Config(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EntitlementError {
    /// True for the per-request denials a user is expected to see:
    /// no entitlement, exhausted entitlement, or an unknown geography.
    pub fn is_business_denial(&self) -> bool {
        matches!(
            self,
            Self::AccessDenied { .. } | Self::CapacityExceeded { .. } | Self::InvalidEntity { .. }
        )
    }

    /// Re-map a hierarchy miss raised during resolution.
    pub fn into_access_denied(self) -> Self {
        match self {
            Self::NotFound { entity_type, name } => Self::AccessDenied {
                reason: format!("{entity_type} '{name}' is not a known entity"),
            },
            other => other,
        }
    }

    /// Re-map a hierarchy miss raised during plan creation.
    pub fn into_invalid_entity(self, plan_type: &str) -> Self {
        match self {
            Self::NotFound { name, .. } => Self::InvalidEntity {
                plan_type: plan_type.to_string(),
                entity_name: name,
            },
            other => other,
        }
    }
}

/// Convenience type alias.
pub type EntitlementResult<T> = Result<T, EntitlementError>;
