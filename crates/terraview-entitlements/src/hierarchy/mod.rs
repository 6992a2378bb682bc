//! HierarchyIndex: the district → taluka → village tree.
//!
//! Built once from flat metadata rows and read-only afterwards. Nodes are
//! keyed by code and deduplicated by code (first row wins). Name lookups are
//! case-insensitive; every name handed back is the canonical spelling from
//! the metadata, and every list is sorted by name.

mod cache;
mod coverage;
mod source;

pub use cache::HierarchyCache;
pub use coverage::Coverage;
pub use source::{SqliteMetadataSource, StaticMetadataSource};

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;

use terraview_core::errors::{EntitlementError, EntitlementResult};
use terraview_core::models::{EntityType, HierarchyEntry, MetadataFilter, PlanType};

/// Lookup key for entity names: trimmed and lower-cased.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Form a name takes inside a tile table key: lower-cased, whitespace as `_`.
pub fn table_slug(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}

#[derive(Debug, Clone)]
struct DistrictNode {
    name: String,
    talukas: BTreeMap<String, TalukaNode>,
}

#[derive(Debug, Clone)]
struct TalukaNode {
    name: String,
    villages: BTreeMap<String, String>,
}

/// Nested, name-sorted view of one district.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DistrictView {
    pub code: String,
    pub name: String,
    pub talukas: Vec<TalukaView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TalukaView {
    pub code: String,
    pub name: String,
    pub villages: Vec<VillageView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VillageView {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, Default)]
pub struct HierarchyIndex {
    districts: BTreeMap<String, DistrictNode>,
    /// normalized name → district codes
    district_names: HashMap<String, Vec<String>>,
    /// normalized name → (district code, taluka code)
    taluka_names: HashMap<String, Vec<(String, String)>>,
    /// normalized name → canonical name
    village_names: HashMap<String, String>,
    entries: Vec<HierarchyEntry>,
}

impl HierarchyIndex {
    pub fn build(entries: impl IntoIterator<Item = HierarchyEntry>) -> Self {
        let mut index = Self::default();
        let mut seen_villages: BTreeSet<(String, String, String)> = BTreeSet::new();

        for entry in entries {
            let district = index
                .districts
                .entry(entry.district_code.clone())
                .or_insert_with(|| DistrictNode {
                    name: entry.district_name.trim().to_string(),
                    talukas: BTreeMap::new(),
                });
            let taluka = district
                .talukas
                .entry(entry.taluka_code.clone())
                .or_insert_with(|| TalukaNode {
                    name: entry.taluka_name.trim().to_string(),
                    villages: BTreeMap::new(),
                });
            taluka
                .villages
                .entry(entry.village_code.clone())
                .or_insert_with(|| entry.village_name.trim().to_string());

            let key = (
                entry.district_code.clone(),
                entry.taluka_code.clone(),
                entry.village_code.clone(),
            );
            if seen_villages.insert(key) {
                index.entries.push(entry);
            }
        }

        for (d_code, district) in &index.districts {
            push_unique(
                index
                    .district_names
                    .entry(normalize_name(&district.name))
                    .or_default(),
                d_code.clone(),
            );
            for (t_code, taluka) in &district.talukas {
                push_unique(
                    index
                        .taluka_names
                        .entry(normalize_name(&taluka.name))
                        .or_default(),
                    (d_code.clone(), t_code.clone()),
                );
                for village in taluka.villages.values() {
                    index
                        .village_names
                        .entry(normalize_name(village))
                        .or_insert_with(|| village.clone());
                }
            }
        }

        index.entries.sort_by(|a, b| {
            (&a.district_name, &a.taluka_name, &a.village_name)
                .cmp(&(&b.district_name, &b.taluka_name, &b.village_name))
        });
        index
    }

    pub fn is_empty(&self) -> bool {
        self.districts.is_empty()
    }

    pub fn district_count(&self) -> usize {
        self.districts.len()
    }

    pub fn village_count(&self) -> usize {
        self.entries.len()
    }

    pub fn contains(&self, entity_type: EntityType, name: &str) -> bool {
        let key = normalize_name(name);
        match entity_type {
            EntityType::District => self.district_names.contains_key(&key),
            EntityType::Taluka => self.taluka_names.contains_key(&key),
            EntityType::Village => self.village_names.contains_key(&key),
        }
    }

    /// The metadata spelling of `name` at `entity_type`.
    pub fn canonical_name(&self, entity_type: EntityType, name: &str) -> EntitlementResult<String> {
        let key = normalize_name(name);
        let found = match entity_type {
            EntityType::District => self
                .district_names
                .get(&key)
                .and_then(|codes| codes.first())
                .and_then(|code| self.districts.get(code))
                .map(|d| d.name.clone()),
            EntityType::Taluka => self
                .taluka_names
                .get(&key)
                .and_then(|codes| codes.first())
                .and_then(|(d, t)| self.taluka(d, t))
                .map(|t| t.name.clone()),
            EntityType::Village => self.village_names.get(&key).cloned(),
        };
        found.ok_or_else(|| not_found(entity_type, name))
    }

    /// Villages covered by the entity `name` at `entity_type`, sorted by name,
    /// without duplicates.
    pub fn lookup(&self, entity_type: EntityType, name: &str) -> EntitlementResult<Vec<String>> {
        let key = normalize_name(name);
        let villages: BTreeSet<String> = match entity_type {
            EntityType::Village => {
                let canonical = self
                    .village_names
                    .get(&key)
                    .ok_or_else(|| not_found(entity_type, name))?;
                return Ok(vec![canonical.clone()]);
            }
            EntityType::Taluka => self
                .talukas_named(&key)
                .ok_or_else(|| not_found(entity_type, name))?
                .flat_map(|t| t.villages.values().cloned())
                .collect(),
            EntityType::District => self
                .districts_named(&key)
                .ok_or_else(|| not_found(entity_type, name))?
                .flat_map(|d| d.talukas.values())
                .flat_map(|t| t.villages.values().cloned())
                .collect(),
        };
        Ok(sorted_by_name(villages))
    }

    /// Villages a plan of `plan_type` on `entity_name` covers.
    pub fn expand(&self, plan_type: PlanType, entity_name: &str) -> EntitlementResult<Vec<String>> {
        self.lookup(plan_type.entity_type(), entity_name)
    }

    /// Every node a plan reaches, at all three levels, as normalized names.
    pub fn coverage(&self, plan_type: PlanType, entity_name: &str) -> EntitlementResult<Coverage> {
        let key = normalize_name(entity_name);
        let mut coverage = Coverage::default();
        match plan_type.entity_type() {
            EntityType::Village => {
                if !self.village_names.contains_key(&key) {
                    return Err(not_found(EntityType::Village, entity_name));
                }
                coverage.villages.insert(key);
            }
            EntityType::Taluka => {
                let talukas = self
                    .talukas_named(&key)
                    .ok_or_else(|| not_found(EntityType::Taluka, entity_name))?;
                coverage.talukas.insert(key);
                for taluka in talukas {
                    coverage
                        .villages
                        .extend(taluka.villages.values().map(|v| normalize_name(v)));
                }
            }
            EntityType::District => {
                let districts = self
                    .districts_named(&key)
                    .ok_or_else(|| not_found(EntityType::District, entity_name))?;
                coverage.districts.insert(key);
                for taluka in districts.flat_map(|d| d.talukas.values()) {
                    coverage.talukas.insert(normalize_name(&taluka.name));
                    coverage
                        .villages
                        .extend(taluka.villages.values().map(|v| normalize_name(v)));
                }
            }
        }
        Ok(coverage)
    }

    /// Whether `village` lies in `taluka` of `district`.
    pub fn contains_path(&self, district: &str, taluka: &str, village: &str) -> bool {
        let (t_key, v_key) = (normalize_name(taluka), normalize_name(village));
        self.districts_named(&normalize_name(district))
            .into_iter()
            .flatten()
            .flat_map(|d| d.talukas.values())
            .filter(|t| normalize_name(&t.name) == t_key)
            .any(|t| t.villages.values().any(|v| normalize_name(v) == v_key))
    }

    /// Taluka names of a district, sorted.
    pub fn talukas_of(&self, district: &str) -> EntitlementResult<Vec<String>> {
        let key = normalize_name(district);
        let names: BTreeSet<String> = self
            .districts_named(&key)
            .ok_or_else(|| not_found(EntityType::District, district))?
            .flat_map(|d| d.talukas.values().map(|t| t.name.clone()))
            .collect();
        Ok(sorted_by_name(names))
    }

    /// Canonical district names with their table-key slugs.
    pub(crate) fn district_slugs(&self) -> Vec<(String, String)> {
        self.districts
            .values()
            .map(|d| (table_slug(&d.name), d.name.clone()))
            .collect()
    }

    /// Canonical taluka names of a district with their table-key slugs.
    pub(crate) fn taluka_slugs(&self, district: &str) -> Vec<(String, String)> {
        let key = normalize_name(district);
        self.districts_named(&key)
            .into_iter()
            .flatten()
            .flat_map(|d| d.talukas.values())
            .map(|t| (table_slug(&t.name), t.name.clone()))
            .collect()
    }

    /// Nested district → taluka → village view, every level sorted by name.
    pub fn districts(&self) -> Vec<DistrictView> {
        let mut districts: Vec<DistrictView> = self
            .districts
            .iter()
            .map(|(code, d)| {
                let mut talukas: Vec<TalukaView> = d
                    .talukas
                    .iter()
                    .map(|(code, t)| {
                        let mut villages: Vec<VillageView> = t
                            .villages
                            .iter()
                            .map(|(code, name)| VillageView {
                                code: code.clone(),
                                name: name.clone(),
                            })
                            .collect();
                        villages.sort_by(|a, b| name_order(&a.name, &a.code, &b.name, &b.code));
                        TalukaView {
                            code: code.clone(),
                            name: t.name.clone(),
                            villages,
                        }
                    })
                    .collect();
                talukas.sort_by(|a, b| name_order(&a.name, &a.code, &b.name, &b.code));
                DistrictView {
                    code: code.clone(),
                    name: d.name.clone(),
                    talukas,
                }
            })
            .collect();
        districts.sort_by(|a, b| name_order(&a.name, &a.code, &b.name, &b.code));
        districts
    }

    /// Flat rows matching `filter`, ordered by district, taluka, village.
    pub fn search(&self, filter: &MetadataFilter) -> Vec<HierarchyEntry> {
        self.entries
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect()
    }

    fn taluka(&self, district_code: &str, taluka_code: &str) -> Option<&TalukaNode> {
        self.districts
            .get(district_code)
            .and_then(|d| d.talukas.get(taluka_code))
    }

    fn talukas_named<'a>(&'a self, key: &str) -> Option<impl Iterator<Item = &'a TalukaNode> + 'a> {
        let codes = self.taluka_names.get(key)?;
        Some(codes.iter().filter_map(move |(d, t)| self.taluka(d, t)))
    }

    fn districts_named<'a>(
        &'a self,
        key: &str,
    ) -> Option<impl Iterator<Item = &'a DistrictNode> + 'a> {
        let codes = self.district_names.get(key)?;
        Some(codes.iter().filter_map(move |code| self.districts.get(code)))
    }
}

fn push_unique<T: PartialEq>(list: &mut Vec<T>, value: T) {
    if !list.contains(&value) {
        list.push(value);
    }
}

fn sorted_by_name(names: BTreeSet<String>) -> Vec<String> {
    let mut names: Vec<String> = names.into_iter().collect();
    names.sort_by(|a, b| a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b)));
    names.dedup_by(|a, b| a.eq_ignore_ascii_case(b));
    names
}

fn name_order(a_name: &str, a_code: &str, b_name: &str, b_code: &str) -> std::cmp::Ordering {
    a_name
        .to_lowercase()
        .cmp(&b_name.to_lowercase())
        .then_with(|| a_code.cmp(b_code))
}

fn not_found(entity_type: EntityType, name: &str) -> EntitlementError {
    EntitlementError::NotFound {
        entity_type: entity_type.to_string(),
        name: name.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(d: (&str, &str), t: (&str, &str), v: (&str, &str)) -> HierarchyEntry {
        HierarchyEntry {
            state: "maharashtra".into(),
            district_code: d.0.into(),
            district_name: d.1.into(),
            taluka_code: t.0.into(),
            taluka_name: t.1.into(),
            village_code: v.0.into(),
            village_name: v.1.into(),
        }
    }

    fn index() -> HierarchyIndex {
        HierarchyIndex::build(vec![
            row(("19", "Jalgaon"), ("1901", "Parola"), ("190102", "Mohadi")),
            row(("19", "Jalgaon"), ("1901", "Parola"), ("190101", "Anturli")),
            row(("19", "Jalgaon"), ("1901", "Parola"), ("190101", "Anturli")),
            row(("19", "Jalgaon"), ("1902", "Amalner"), ("190201", "Dhar")),
        ])
    }

    #[test]
    fn village_expands_to_itself() {
        assert_eq!(index().expand(PlanType::Village, "mohadi").unwrap(), vec!["Mohadi"]);
    }

    #[test]
    fn taluka_expands_sorted_and_deduplicated() {
        assert_eq!(
            index().expand(PlanType::Taluka, "Parola").unwrap(),
            vec!["Anturli", "Mohadi"]
        );
    }

    #[test]
    fn district_expands_to_all_villages() {
        assert_eq!(
            index().expand(PlanType::District, "JALGAON").unwrap(),
            vec!["Anturli", "Dhar", "Mohadi"]
        );
    }

    #[test]
    fn unknown_name_is_not_found() {
        let err = index().expand(PlanType::Taluka, "Nowhere").unwrap_err();
        assert!(matches!(err, EntitlementError::NotFound { .. }));
    }

    #[test]
    fn free_plans_expand_like_villages() {
        assert_eq!(index().expand(PlanType::Free, "Dhar").unwrap(), vec!["Dhar"]);
        assert!(index().expand(PlanType::Free, "Parola").is_err());
    }

    #[test]
    fn district_coverage_fills_every_level() {
        let coverage = index().coverage(PlanType::District, "Jalgaon").unwrap();
        assert!(coverage.districts.contains("jalgaon"));
        assert!(coverage.talukas.contains("amalner"));
        assert!(coverage.villages.contains("mohadi"));
    }

    #[test]
    fn duplicate_rows_are_counted_once() {
        assert_eq!(index().village_count(), 3);
        assert_eq!(index().search(&MetadataFilter::default()).len(), 3);
    }

    #[test]
    fn contains_path_checks_every_level() {
        let index = index();
        assert!(index.contains_path("jalgaon", "parola", "MOHADI"));
        assert!(!index.contains_path("jalgaon", "amalner", "mohadi"));
    }

    #[test]
    fn table_slug_joins_words() {
        assert_eq!(table_slug("  Navi  Mumbai "), "navi_mumbai");
    }
}
