//! Who is asking, for what, and how broad their entitlement is.

use serde::{Deserialize, Serialize};

use super::EntityRef;

/// Coarsest summary of a user's entitlements. `Admin` short-circuits every check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessLevel {
    Admin,
    District,
    Taluka,
    Village,
    Inactive,
    None,
}

/// The authenticated caller, as handed over by the request layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_ref: String,
    pub is_active: bool,
    pub is_superuser: bool,
}

impl Principal {
    pub fn user(user_ref: impl Into<String>) -> Self {
        Self {
            user_ref: user_ref.into(),
            is_active: true,
            is_superuser: false,
        }
    }

    pub fn admin(user_ref: impl Into<String>) -> Self {
        Self {
            user_ref: user_ref.into(),
            is_active: true,
            is_superuser: true,
        }
    }

    pub fn inactive(user_ref: impl Into<String>) -> Self {
        Self {
            user_ref: user_ref.into(),
            is_active: false,
            is_superuser: false,
        }
    }
}

/// What an access check is asked about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessTarget {
    Entity(EntityRef),
    /// Tile-server table key of the form `district_taluka_layer` or `district_layer`.
    TableKey(String),
}

impl From<EntityRef> for AccessTarget {
    fn from(entity: EntityRef) -> Self {
        Self::Entity(entity)
    }
}

/// Successful access decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessGrant {
    /// Superuser bypass; no entitlement was consulted.
    Admin,
    /// Covered by at least one valid plan.
    Entitled(EntityRef),
}
