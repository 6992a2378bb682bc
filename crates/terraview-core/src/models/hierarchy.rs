//! Administrative geography: entity levels and flat metadata rows.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::EntitlementError;

/// Level in the district → taluka → village tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Village,
    Taluka,
    District,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Village => "village",
            Self::Taluka => "taluka",
            Self::District => "district",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = EntitlementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "village" => Ok(Self::Village),
            "taluka" | "talluka" => Ok(Self::Taluka),
            "district" => Ok(Self::District),
            _ => Err(EntitlementError::InvalidInput(format!(
                "unknown entity type '{s}'"
            ))),
        }
    }
}

/// A named node at a given level.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub entity_type: EntityType,
    pub name: String,
}

impl EntityRef {
    pub fn new(entity_type: EntityType, name: impl Into<String>) -> Self {
        Self {
            entity_type,
            name: name.into(),
        }
    }

    pub fn village(name: impl Into<String>) -> Self {
        Self::new(EntityType::Village, name)
    }

    pub fn taluka(name: impl Into<String>) -> Self {
        Self::new(EntityType::Taluka, name)
    }

    pub fn district(name: impl Into<String>) -> Self {
        Self::new(EntityType::District, name)
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}'", self.entity_type, self.name)
    }
}

/// One flat row from the metadata read replica.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyEntry {
    pub state: String,
    pub district_code: String,
    pub district_name: String,
    pub taluka_code: String,
    pub taluka_name: String,
    pub village_code: String,
    pub village_name: String,
}

/// Case-insensitive equality filter over metadata rows. `None` matches all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataFilter {
    pub state: Option<String>,
    pub district: Option<String>,
    pub taluka: Option<String>,
    pub village: Option<String>,
}

impl MetadataFilter {
    pub fn matches(&self, entry: &HierarchyEntry) -> bool {
        fn eq(filter: &Option<String>, value: &str) -> bool {
            filter
                .as_deref()
                .map_or(true, |f| f.trim().eq_ignore_ascii_case(value.trim()))
        }
        eq(&self.state, &entry.state)
            && eq(&self.district, &entry.district_name)
            && eq(&self.taluka, &entry.taluka_name)
            && eq(&self.village, &entry.village_name)
    }
}
