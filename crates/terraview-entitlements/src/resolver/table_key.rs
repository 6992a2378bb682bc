//! Tile table keys: `district_taluka_layer` or `district_layer`.
//!
//! Names inside a key are slugs (lower-case, whitespace as `_`) and may
//! themselves contain `_`, so segments are matched against the hierarchy by
//! longest prefix rather than split positionally.

use terraview_core::models::EntityRef;

use crate::hierarchy::HierarchyIndex;

/// A table key resolved to the entity whose coverage it requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTableKey {
    pub entity: EntityRef,
    pub layer: String,
}

/// Resolve `key` against `index`. `None` for anything that does not name a
/// known district followed by a non-empty layer.
pub fn resolve_table_key(index: &HierarchyIndex, key: &str) -> Option<ResolvedTableKey> {
    let key = key.trim().to_lowercase();

    let (district, rest) = longest_prefix(index.district_slugs(), &key)?;
    if let Some((taluka, layer)) = longest_prefix(index.taluka_slugs(&district), rest) {
        return Some(ResolvedTableKey {
            entity: EntityRef::taluka(taluka),
            layer: layer.to_string(),
        });
    }
    Some(ResolvedTableKey {
        entity: EntityRef::district(district),
        layer: rest.to_string(),
    })
}

/// Pick the longest `slug` such that `key` is `slug_<non-empty rest>`.
fn longest_prefix(candidates: Vec<(String, String)>, key: &str) -> Option<(String, &str)> {
    candidates
        .into_iter()
        .filter_map(|(slug, name)| {
            let rest = key.strip_prefix(slug.as_str())?.strip_prefix('_')?;
            (!rest.is_empty()).then_some((slug.len(), name, rest))
        })
        .max_by_key(|(len, _, _)| *len)
        .map(|(_, name, rest)| (name, rest))
}
