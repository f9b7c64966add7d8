//! Static reference data: parameter code tables and dataset request shapes.
//!
//! A [`Catalog`] is built once by a collaborator (the guide scraper or a JSON
//! snapshot) and is read-only afterwards.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EntsoeError, Result};

/// Parameter name in example requests that stands for a start/end pair.
const INTERVAL_FIELD: &str = "TimeInterval";

/// Fields an interval parameter expands into.
const INTERVAL_START_FIELD: &str = "periodStart";
const INTERVAL_END_FIELD: &str = "periodEnd";

/// Query key carrying the security token; never part of a dataset shape.
const TOKEN_FIELD: &str = "securityToken";

// ---------------------------------------------------------------------------
// Parameter catalog
// ---------------------------------------------------------------------------

/// One code → meaning pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub code: String,
    pub meaning: String,
}

/// A named code table, e.g. `Areas` or `BusinessType`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterType {
    pub name: String,
    pub entries: Vec<CatalogEntry>,
}

impl ParameterType {
    /// Build from `(code, meaning)` pairs, keeping their order.
    pub fn new<I, C, M>(name: impl Into<String>, pairs: I) -> Self
    where
        I: IntoIterator<Item = (C, M)>,
        C: Into<String>,
        M: Into<String>,
    {
        Self {
            name: name.into(),
            entries: pairs
                .into_iter()
                .map(|(code, meaning)| CatalogEntry {
                    code: code.into(),
                    meaning: meaning.into(),
                })
                .collect(),
        }
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.code.as_str())
    }

    pub fn meanings(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.meaning.as_str())
    }

    /// Meaning for an exact code.
    pub fn meaning_of(&self, code: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.code == code)
            .map(|e| e.meaning.as_str())
    }
}

/// Parameter-type name → code table, in catalog order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterCatalog {
    types: Vec<ParameterType>,
}

impl ParameterCatalog {
    /// Build from code tables. A later table with an existing name replaces it.
    pub fn new(types: impl IntoIterator<Item = ParameterType>) -> Self {
        let mut catalog = Self::default();
        for t in types {
            catalog.insert(t);
        }
        catalog
    }

    fn insert(&mut self, table: ParameterType) {
        match self.types.iter_mut().find(|t| t.name == table.name) {
            Some(existing) => *existing = table,
            None => self.types.push(table),
        }
    }

    pub fn types(&self) -> &[ParameterType] {
        &self.types
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.iter().map(|t| t.name.as_str())
    }

    /// Exact lookup by type name.
    pub fn get(&self, name: &str) -> Option<&ParameterType> {
        self.types.iter().find(|t| t.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Dataset descriptors
// ---------------------------------------------------------------------------

/// A `key=value` pair fixed by a dataset's example request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstantField {
    pub key: String,
    pub value: String,
}

/// Request shape of one dataset.
///
/// Invariant: `mandatory_fields` never contains the unexpanded interval field.
/// Deserialization goes through [`DatasetDescriptor::new`] so snapshots keep it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawDatasetDescriptor")]
pub struct DatasetDescriptor {
    name: String,
    mandatory_fields: Vec<String>,
    constants: Vec<ConstantField>,
}

/// Serialized shape of a [`DatasetDescriptor`].
#[derive(Deserialize)]
struct RawDatasetDescriptor {
    name: String,
    mandatory_fields: Vec<String>,
    #[serde(default)]
    constants: Vec<ConstantField>,
}

impl From<RawDatasetDescriptor> for DatasetDescriptor {
    fn from(raw: RawDatasetDescriptor) -> Self {
        Self::new(raw.name, raw.mandatory_fields, raw.constants)
    }
}

impl DatasetDescriptor {
    /// Build a descriptor, expanding any interval field into start/end fields.
    pub fn new(
        name: impl Into<String>,
        mandatory_fields: impl IntoIterator<Item = impl Into<String>>,
        constants: Vec<ConstantField>,
    ) -> Self {
        let mut fields = Vec::new();
        for field in mandatory_fields.into_iter().map(Into::into) {
            if field == INTERVAL_FIELD {
                fields.push(INTERVAL_START_FIELD.to_string());
                fields.push(INTERVAL_END_FIELD.to_string());
            } else if !fields.contains(&field) {
                fields.push(field);
            }
        }
        Self {
            name: name.into(),
            mandatory_fields: fields,
            constants,
        }
    }

    /// Derive a descriptor from the dataset's example request.
    ///
    /// Everything after the first `?` is read as `&`-separated `key=value`
    /// pairs. Pairs whose key contains `Type` (but not `psr`) are constants;
    /// every key except `psr*`, `classification*` and the token is mandatory.
    pub fn from_example_request(name: impl Into<String>, example: &str) -> Self {
        let query = example.split_once('?').map_or(example, |(_, q)| q);

        let mut mandatory = Vec::new();
        let mut constants = Vec::new();

        for pair in query.split('&').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let key = key.trim();
            if key == TOKEN_FIELD {
                continue;
            }
            let value = value.split_whitespace().next().unwrap_or("");

            if key.contains("Type") && !key.contains("psr") {
                constants.push(ConstantField {
                    key: key.to_string(),
                    value: value.to_string(),
                });
            }
            if !key.contains("psr") && !key.contains("classification") {
                mandatory.push(key.to_string());
            }
        }

        Self::new(name, mandatory, constants)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mandatory_fields(&self) -> &[String] {
        &self.mandatory_fields
    }

    pub fn constants(&self) -> &[ConstantField] {
        &self.constants
    }

    /// Whether a destination area must be supplied with each request.
    pub fn requires_destination(&self) -> bool {
        self.mandatory_fields.iter().any(|f| is_destination_field(f))
    }
}

/// Whether a request field names the destination side of an area pair.
pub fn is_destination_field(field: &str) -> bool {
    let k = field.to_lowercase();
    k.contains("out_domain") || k.contains("acquiring")
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Parameter tables plus dataset descriptors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub parameters: ParameterCatalog,
    pub datasets: Vec<DatasetDescriptor>,
}

impl Catalog {
    pub fn new(parameters: ParameterCatalog, datasets: Vec<DatasetDescriptor>) -> Self {
        Self {
            parameters,
            datasets,
        }
    }

    /// Exact lookup by dataset name.
    pub fn dataset(&self, name: &str) -> Option<&DatasetDescriptor> {
        self.datasets.iter().find(|d| d.name == name)
    }

    pub fn dataset_names(&self) -> impl Iterator<Item = &str> {
        self.datasets.iter().map(|d| d.name.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty() && self.datasets.is_empty()
    }

    /// Parse a JSON snapshot.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| EntsoeError::parse(format!("invalid catalog JSON: {e}")))
    }

    /// Load a JSON snapshot from disk.
    pub fn from_json_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| EntsoeError::io(path, e))?;
        let catalog = Self::from_json_str(&content)?;
        tracing::debug!(
            ?path,
            parameter_types = catalog.parameters.types().len(),
            datasets = catalog.datasets.len(),
            "loaded catalog snapshot"
        );
        Ok(catalog)
    }

    /// Pretty JSON snapshot.
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| EntsoeError::validation(format!("catalog not serializable: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_field_is_expanded() {
        let d = DatasetDescriptor::new(
            "Test",
            ["documentType", "TimeInterval", "in_Domain"],
            vec![],
        );
        assert_eq!(
            d.mandatory_fields(),
            ["documentType", "periodStart", "periodEnd", "in_Domain"]
        );
        assert!(!d.mandatory_fields().iter().any(|f| f == "TimeInterval"));
    }

    #[test]
    fn descriptor_from_example_request() {
        let d = DatasetDescriptor::from_example_request(
            "Actual Total Load",
            "GET /api?documentType=A65&processType=A16&outBiddingZone_Domain=10YCZ-CEPS-----N&periodStart=201512312300&periodEnd=201612312300",
        );
        assert_eq!(
            d.mandatory_fields(),
            [
                "documentType",
                "processType",
                "outBiddingZone_Domain",
                "periodStart",
                "periodEnd"
            ]
        );
        assert_eq!(d.constants().len(), 2);
        assert_eq!(d.constants()[0].key, "documentType");
        assert_eq!(d.constants()[0].value, "A65");
        assert!(!d.requires_destination());
    }

    #[test]
    fn psr_and_classification_are_optional() {
        let d = DatasetDescriptor::from_example_request(
            "Generation",
            "documentType=A75&processType=A16&psrType=B02&in_Domain=X&classificationSequence_AttributeInstanceComponent.position=1&TimeInterval=2016-01-01T00:00Z/2016-01-02T00:00Z",
        );
        assert!(!d.mandatory_fields().iter().any(|f| f.contains("psr")));
        assert!(!d.mandatory_fields().iter().any(|f| f.contains("classification")));
        assert!(!d.constants().iter().any(|c| c.key == "psrType"));
        assert!(d.mandatory_fields().contains(&"periodEnd".to_string()));
    }

    #[test]
    fn destination_detection() {
        let d = DatasetDescriptor::new(
            "Cross-Border Physical Flow",
            ["documentType", "in_Domain", "out_Domain", "periodStart", "periodEnd"],
            vec![],
        );
        assert!(d.requires_destination());
    }

    #[test]
    fn later_parameter_table_replaces_earlier() {
        let catalog = ParameterCatalog::new([
            ParameterType::new("Areas", [("A", "first")]),
            ParameterType::new("Areas", [("A", "second")]),
        ]);
        assert_eq!(catalog.types().len(), 1);
        assert_eq!(catalog.get("Areas").unwrap().meaning_of("A"), Some("second"));
    }

    #[test]
    fn snapshot_descriptor_expands_interval() {
        let json = r#"{
            "parameters": [],
            "datasets": [
                {"name": "Margin", "mandatory_fields": ["documentType", "TimeInterval"]}
            ]
        }"#;
        let catalog = Catalog::from_json_str(json).unwrap();
        assert_eq!(
            catalog.dataset("Margin").unwrap().mandatory_fields(),
            ["documentType", "periodStart", "periodEnd"]
        );
    }

    #[test]
    fn catalog_fixture_loads() {
        let path = Path::new("../../../fixtures/json/catalog.fixture.json");
        let catalog = Catalog::from_json_path(path).expect("load catalog fixture");
        assert!(catalog.parameters.get("Areas").is_some());
        assert!(catalog.dataset("Actual Total Load").is_some());

        let json = catalog.to_json_pretty().expect("serialize");
        let parsed = Catalog::from_json_str(&json).expect("reparse");
        assert_eq!(parsed, catalog);
    }
}
