//! Translation of raw codes into meanings while a document is flattened.

use entsoe_shared::ParameterType;

use crate::{AREA_TYPE, Resolution, Resolver};

/// Tag fragment that identifies area codes in response documents.
const AREA_TAG_ALIAS: &str = "domain";

/// Maps a leaf's raw code to its catalog meaning, selected by tag name.
///
/// A parameter type applies to a leaf when its folded name (lower-case with
/// `.`, `_` and spaces removed) occurs in the leaf tag. Area codes appear under
/// `*domain*` tags, so the area type also applies there. When several types
/// resolve the value, the last one in catalog order wins.
#[derive(Debug, Clone)]
pub struct Remapper<'c> {
    resolver: Resolver<'c>,
    keys: Vec<(String, &'c ParameterType)>,
}

impl<'c> Remapper<'c> {
    pub fn new(resolver: Resolver<'c>) -> Self {
        let mut keys = Vec::new();
        for table in resolver.catalog().parameters.types() {
            keys.push((fold_type_name(&table.name), table));
            if table.name == AREA_TYPE {
                keys.push((AREA_TAG_ALIAS.to_string(), table));
            }
        }
        Self { resolver, keys }
    }

    /// Meaning of `value` found under `tag`, or `None` to keep the raw value.
    pub fn remap(&self, tag: &str, value: &str) -> Option<String> {
        if value.trim().is_empty() {
            return None;
        }
        let tag = tag.to_lowercase();

        let mut meaning = None;
        for (key, table) in &self.keys {
            if key.is_empty() || !tag.contains(key.as_str()) {
                continue;
            }
            if let Resolution::Resolved { meaning: m, .. } = self.resolver.resolve_in(table, value)
            {
                meaning = Some(m);
            }
        }
        meaning
    }
}

fn fold_type_name(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .filter(|c| !matches!(c, '.' | '_' | ' '))
        .collect()
}
