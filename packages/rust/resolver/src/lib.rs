//! Fuzzy identifier resolution against a [`Catalog`].
//!
//! Lookups are pure functions of `(text, parameter type, catalog)`: the
//! resolver only borrows the catalog and keeps no state between calls.
//!
//! Parameter-type names and dataset names form small closed vocabularies, so
//! they are matched loosely. Codes and meanings come from large tables of
//! look-alike entries and are matched strictly, with a whole-token fallback
//! for multi-word meanings.

mod fuzzy;
mod remap;

use entsoe_shared::{Catalog, CatalogEntry, MatchConfig, ParameterType};
use tracing::debug;

pub use fuzzy::{FuzzyMatch, Normalize, close_matches, similarity};
pub use remap::Remapper;

/// Canonical name of the area code table.
pub const AREA_TYPE: &str = "Areas";

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Outcome of resolving a value within a parameter type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Exactly one catalog entry matched.
    Resolved { meaning: String, code: String },
    /// Zero matches, or several without a single winner.
    Unresolved,
}

impl Resolution {
    fn from_entry(entry: &CatalogEntry) -> Self {
        Self::Resolved {
            meaning: entry.meaning.clone(),
            code: entry.code.clone(),
        }
    }

    /// `(meaning, code)`, with `(None, None)` for an unresolved lookup.
    pub fn into_pair(self) -> (Option<String>, Option<String>) {
        match self {
            Self::Resolved { meaning, code } => (Some(meaning), Some(code)),
            Self::Unresolved => (None, None),
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Resolved { code, .. } => Some(code),
            Self::Unresolved => None,
        }
    }

    pub fn meaning(&self) -> Option<&str> {
        match self {
            Self::Resolved { meaning, .. } => Some(meaning),
            Self::Unresolved => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved { .. })
    }
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Resolves free text against a borrowed catalog.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'c> {
    catalog: &'c Catalog,
    config: MatchConfig,
}

impl<'c> Resolver<'c> {
    pub fn new(catalog: &'c Catalog, config: MatchConfig) -> Self {
        Self { catalog, config }
    }

    pub fn catalog(&self) -> &'c Catalog {
        self.catalog
    }

    pub fn config(&self) -> MatchConfig {
        self.config
    }

    /// Match a parameter-type name against the catalog's type names.
    pub fn resolve_type(&self, type_query: &str) -> FuzzyMatch<'c> {
        close_matches(
            type_query,
            self.catalog.parameters.type_names(),
            self.config.type_cutoff,
            self.config.max_matches,
            Normalize::Key,
        )
    }

    /// Match a dataset name against the catalog's dataset names.
    pub fn resolve_dataset(&self, query: &str) -> FuzzyMatch<'c> {
        close_matches(
            query,
            self.catalog.dataset_names(),
            self.config.dataset_cutoff,
            self.config.max_matches,
            Normalize::Key,
        )
    }

    /// Resolve `text` to `(meaning, code)` within the type best matching
    /// `type_query`. An ambiguous or unknown type resolves nothing.
    pub fn resolve(&self, text: &str, type_query: &str) -> Resolution {
        let type_name = match self.resolve_type(type_query) {
            FuzzyMatch::Single(name) => name,
            FuzzyMatch::Ambiguous(names) => {
                debug!(type_query, ?names, "parameter type is ambiguous");
                return Resolution::Unresolved;
            }
            FuzzyMatch::NotFound => {
                debug!(type_query, "no such parameter type");
                return Resolution::Unresolved;
            }
        };

        match self.catalog.parameters.get(type_name) {
            Some(table) => self.resolve_in(table, text),
            None => Resolution::Unresolved,
        }
    }

    /// Resolve `text` within a known code table.
    ///
    /// 1. fuzzy match against meanings;
    /// 2. if nothing clears the cutoff, accept a meaning having `text` as one
    ///    of its whitespace-separated tokens (commas stripped);
    /// 3. otherwise fuzzy match against codes.
    pub fn resolve_in(&self, table: &ParameterType, text: &str) -> Resolution {
        let cutoff = self.config.value_cutoff;
        let limit = self.config.max_matches;

        let by_meaning = match close_matches(
            text,
            table.meanings(),
            cutoff,
            limit,
            Normalize::Lowercase,
        ) {
            FuzzyMatch::Single(meaning) => table.entries.iter().find(|e| e.meaning == meaning),
            FuzzyMatch::Ambiguous(_) => None,
            FuzzyMatch::NotFound => token_match(table, text),
        };

        if let Some(entry) = by_meaning {
            return Resolution::from_entry(entry);
        }

        match close_matches(text, table.codes(), cutoff, limit, Normalize::Lowercase) {
            FuzzyMatch::Single(code) => table
                .entries
                .iter()
                .find(|e| e.code == code)
                .map_or(Resolution::Unresolved, Resolution::from_entry),
            _ => {
                debug!(text, parameter_type = %table.name, "value not resolved");
                Resolution::Unresolved
            }
        }
    }

    /// Resolve an area by free text or code.
    pub fn resolve_area(&self, text: &str) -> Resolution {
        self.resolve(text, AREA_TYPE)
    }

    /// The area code table, if the catalog has one.
    pub fn area_table(&self) -> Option<&'c ParameterType> {
        self.resolve_type(AREA_TYPE)
            .single()
            .and_then(|name| self.catalog.parameters.get(name))
    }
}

/// The single entry whose meaning contains `text` as a whole token.
fn token_match<'t>(table: &'t ParameterType, text: &str) -> Option<&'t CatalogEntry> {
    let needle = Normalize::Lowercase.apply(text);
    let mut hits = table.entries.iter().filter(|e| {
        e.meaning
            .to_lowercase()
            .replace(',', "")
            .split(' ')
            .any(|token| token == needle)
    });

    match (hits.next(), hits.next()) {
        (Some(entry), None) => Some(entry),
        _ => None,
    }
}
