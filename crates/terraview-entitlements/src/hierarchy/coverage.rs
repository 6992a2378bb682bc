//! Accumulated geographic coverage of a set of plans.

use std::collections::BTreeSet;

use terraview_core::models::{EntityRef, EntityType};

use super::normalize_name;

/// Normalized names reachable at each level. District plans fill all three
/// sets, taluka plans fill talukas and villages, village plans fill villages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Coverage {
    pub districts: BTreeSet<String>,
    pub talukas: BTreeSet<String>,
    pub villages: BTreeSet<String>,
}

impl Coverage {
    pub fn covers(&self, entity: &EntityRef) -> bool {
        let key = normalize_name(&entity.name);
        self.set(entity.entity_type).contains(&key)
    }

    pub fn merge(&mut self, other: Coverage) {
        self.districts.extend(other.districts);
        self.talukas.extend(other.talukas);
        self.villages.extend(other.villages);
    }

    pub fn is_empty(&self) -> bool {
        self.districts.is_empty() && self.talukas.is_empty() && self.villages.is_empty()
    }

    fn set(&self, entity_type: EntityType) -> &BTreeSet<String> {
        match entity_type {
            EntityType::District => &self.districts,
            EntityType::Taluka => &self.talukas,
            EntityType::Village => &self.villages,
        }
    }
}
