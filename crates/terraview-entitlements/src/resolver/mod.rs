//! AccessResolver: decides whether a user's valid plans cover a target.
//!
//! Coverage is the union over every valid plan, so overlapping plans need no
//! precedence. Anything that cannot be resolved to a known entity is denied.
//! A target covered only by exhausted or expired plans is reported as
//! `CapacityExceeded` rather than `AccessDenied`.

mod table_key;

pub use table_key::{resolve_table_key, ResolvedTableKey};

use std::sync::Arc;

use tracing::{debug, warn};

use terraview_core::errors::{EntitlementError, EntitlementResult};
use terraview_core::models::{
    AccessGrant, AccessLevel, AccessTarget, EntityRef, PlanStatus, PlanType, Principal,
};

use crate::hierarchy::{Coverage, HierarchyIndex};
use crate::store::EntitlementStore;

pub struct AccessResolver {
    store: Arc<EntitlementStore>,
}

impl AccessResolver {
    pub fn new(store: Arc<EntitlementStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<EntitlementStore> {
        &self.store
    }

    /// Boolean form of `check_access`. Every failure is a deny.
    pub fn has_access(&self, principal: &Principal, target: &AccessTarget) -> bool {
        match self.check_access(principal, target) {
            Ok(_) => true,
            Err(e) if e.is_business_denial() => false,
            Err(e) => {
                warn!(user = %principal.user_ref, error = %e, "access check failed, denying");
                false
            }
        }
    }

    pub fn check_access(
        &self,
        principal: &Principal,
        target: &AccessTarget,
    ) -> EntitlementResult<AccessGrant> {
        if !principal.is_active {
            return Err(EntitlementError::AccessDenied {
                reason: format!("user {} is inactive", principal.user_ref),
            });
        }
        if principal.is_superuser {
            return Ok(AccessGrant::Admin);
        }

        let index = self.store.hierarchy().index();
        let entity = resolve_target(&index, target)?;

        let now = self.store.clock().now();
        let (valid, spent): (Vec<PlanStatus>, Vec<PlanStatus>) = self
            .store
            .all_plans(&principal.user_ref)?
            .into_iter()
            .partition(|s| s.is_valid_at(now));

        if plan_coverage(&index, &valid).covers(&entity) {
            debug!(user = %principal.user_ref, entity = %entity, "access granted");
            return Ok(AccessGrant::Entitled(entity));
        }

        if plan_coverage(&index, &spent).covers(&entity) {
            debug!(user = %principal.user_ref, entity = %entity, "covering plans exhausted or expired");
            return Err(EntitlementError::CapacityExceeded {
                scope: entity.to_string(),
                detail: "every plan covering it is exhausted or expired".to_string(),
            });
        }

        debug!(user = %principal.user_ref, entity = %entity, "access denied");
        Err(EntitlementError::AccessDenied {
            reason: format!("no plan covers {entity}"),
        })
    }

    /// Coarsest summary of the user's standing. Only valid plans count.
    pub fn access_level(&self, principal: &Principal) -> EntitlementResult<AccessLevel> {
        if !principal.is_active {
            return Ok(AccessLevel::Inactive);
        }
        if principal.is_superuser {
            return Ok(AccessLevel::Admin);
        }

        let mut level = AccessLevel::None;
        for status in self.store.valid_plans(&principal.user_ref)? {
            match status.plan.plan_type {
                PlanType::District => return Ok(AccessLevel::District),
                PlanType::Taluka => level = AccessLevel::Taluka,
                PlanType::Village | PlanType::Free if level == AccessLevel::None => {
                    level = AccessLevel::Village
                }
                PlanType::Village | PlanType::Free => {}
            }
        }
        Ok(level)
    }

    /// Union of everything the user's valid plans reach.
    pub fn coverage(&self, user_ref: &str) -> EntitlementResult<Coverage> {
        let index = self.store.hierarchy().index();
        Ok(plan_coverage(&index, &self.store.valid_plans(user_ref)?))
    }
}

/// Canonical entity for a target, or `AccessDenied` if it names nothing known.
pub fn resolve_target(index: &HierarchyIndex, target: &AccessTarget) -> EntitlementResult<EntityRef> {
    match target {
        AccessTarget::Entity(entity) => index
            .canonical_name(entity.entity_type, &entity.name)
            .map(|name| EntityRef::new(entity.entity_type, name))
            .map_err(EntitlementError::into_access_denied),
        AccessTarget::TableKey(key) => resolve_table_key(index, key)
            .map(|resolved| resolved.entity)
            .ok_or_else(|| EntitlementError::AccessDenied {
                reason: format!("table key '{key}' does not name a known district or taluka"),
            }),
    }
}

fn plan_coverage(index: &HierarchyIndex, plans: &[PlanStatus]) -> Coverage {
    let mut coverage = Coverage::default();
    for status in plans {
        match index.coverage(status.plan.plan_type, &status.plan.entity_name) {
            Ok(c) => coverage.merge(c),
            Err(e) => warn!(
                plan_id = %status.plan.id,
                entity = %status.plan.entity_name,
                error = %e,
                "plan entity missing from hierarchy, ignoring"
            ),
        }
    }
    coverage
}
