//! Guide page parser.
//!
//! The guide lists datasets as `h4` headers, each followed somewhere below by
//! an example `GET` request, and parameter code tables in appendix A as
//! `h3` headers (`A.n Name`) each followed by a two-column table.

use std::sync::LazyLock;

use entsoe_shared::{
    Catalog, DatasetDescriptor, EntsoeError, ParameterCatalog, ParameterType, Result,
};
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

/// Marker of an example request.
const EXAMPLE_MARKER: &str = "documentType=";

/// Marker of an appendix-A parameter header.
const APPENDIX_MARKER: &str = "A.";

/// Tables with this many rows or fewer (header included) are prose tables.
const MIN_TABLE_ROWS: usize = 3;

static CONTENT_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("#content").expect("content selector"));
static ROW_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tr").expect("row selector"));
static CELL_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td, th").expect("cell selector"));

/// Parse the guide page into a catalog.
///
/// Errors if the page yields neither datasets nor parameter tables.
pub fn parse_guide(html: &str) -> Result<Catalog> {
    let doc = Html::parse_document(html);
    let root = doc
        .select(&CONTENT_SEL)
        .next()
        .unwrap_or_else(|| doc.root_element());

    let mut datasets: Vec<DatasetDescriptor> = Vec::new();
    let mut tables: Vec<ParameterType> = Vec::new();

    // Dataset headers waiting for their example request.
    let mut pending: Vec<String> = Vec::new();
    // Names of the appendix header the next code table belongs to.
    let mut header: Option<Vec<String>> = None;

    for node in root.descendants() {
        if let Some(text) = node.value().as_text() {
            let text: &str = text;
            if text.contains(EXAMPLE_MARKER) {
                for name in pending.drain(..) {
                    debug!(dataset = %name, "dataset example found");
                    datasets.push(DatasetDescriptor::from_example_request(name, text.trim()));
                }
            }
            continue;
        }

        let Some(element) = ElementRef::wrap(node) else {
            continue;
        };
        match element.value().name() {
            "h4" => {
                let name = clean(&element_text(element));
                if is_dataset_header(&name) {
                    pending.push(name);
                }
            }
            "h3" => {
                let title = clean(&element_text(element));
                if title.contains(APPENDIX_MARKER) {
                    header = parameter_names(&title);
                }
            }
            "table" => {
                let Some(names) = header.as_ref() else {
                    continue;
                };
                let Some(entries) = code_table(element) else {
                    continue;
                };
                for name in names {
                    debug!(parameter_type = %name, entries = entries.len(), "code table found");
                    tables.push(ParameterType::new(name.clone(), entries.clone()));
                }
                header = None;
            }
            _ => {}
        }
    }

    for name in &pending {
        debug!(dataset = %name, "dataset header without example request");
    }

    if datasets.is_empty() && tables.is_empty() {
        return Err(EntsoeError::parse(
            "guide page contains no datasets and no parameter tables",
        ));
    }
    Ok(Catalog::new(ParameterCatalog::new(tables), datasets))
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect()
}

/// Non-breaking spaces become spaces, thin spaces go, then trim.
fn clean(text: &str) -> String {
    text.replace('\u{a0}', " ")
        .replace('\u{2009}', "")
        .trim()
        .to_string()
}

fn is_dataset_header(name: &str) -> bool {
    !name.is_empty() && !name.contains("A.") && !name.contains("B.")
}

/// `A.13. X, Y` → `["X", "Y"]`. The leading section number is dropped.
fn parameter_names(title: &str) -> Option<Vec<String>> {
    let (_, names) = title.split_once(' ')?;
    let names: Vec<String> = names
        .split(", ")
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .collect();
    (!names.is_empty()).then_some(names)
}

/// `(code, meaning)` rows of a code table, header row dropped.
fn code_table(table: ElementRef<'_>) -> Option<Vec<(String, String)>> {
    let rows: Vec<ElementRef<'_>> = table.select(&ROW_SEL).collect();
    if rows.len() < MIN_TABLE_ROWS {
        return None;
    }

    let entries: Vec<(String, String)> = rows
        .iter()
        .skip(1)
        .filter_map(|row| {
            let mut cells = row.select(&CELL_SEL).map(|c| clean(&element_text(c)));
            let code = cells.next()?;
            let meaning = cells.next()?;
            (!code.is_empty()).then_some((code, meaning))
        })
        .collect();

    (!entries.is_empty()).then_some(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guide() -> Catalog {
        let html = std::fs::read_to_string("../../../fixtures/html/guide.fixture.html")
            .expect("read guide fixture");
        parse_guide(&html).unwrap()
    }

    #[test]
    fn datasets_come_from_example_requests() {
        let catalog = guide();
        let names: Vec<&str> = catalog.dataset_names().collect();
        assert_eq!(
            names,
            [
                "Actual Total Load",
                "Year-ahead ForecastMargin",
                "Cross-Border Physical Flow",
                "Actual Generation per Production Type",
            ]
        );

        let load = catalog.dataset("Actual Total Load").unwrap();
        assert_eq!(
            load.mandatory_fields(),
            [
                "documentType",
                "processType",
                "outBiddingZone_Domain",
                "periodStart",
                "periodEnd"
            ]
        );
        assert_eq!(load.constants().len(), 2);
        assert_eq!(load.constants()[0].value, "A65");
        assert!(!load.requires_destination());
    }

    #[test]
    fn interval_field_is_expanded() {
        let catalog = guide();
        let margin = catalog.dataset("Year-ahead ForecastMargin").unwrap();
        assert_eq!(
            &margin.mandatory_fields()[3..],
            ["periodStart", "periodEnd"]
        );
    }

    #[test]
    fn psr_fields_are_not_mandatory() {
        let catalog = guide();
        let generation = catalog
            .dataset("Actual Generation per Production Type")
            .unwrap();
        assert!(!generation.mandatory_fields().iter().any(|f| f.contains("psr")));
        assert!(!generation.constants().iter().any(|c| c.key.contains("psr")));
    }

    #[test]
    fn flow_dataset_needs_destination() {
        let catalog = guide();
        assert!(
            catalog
                .dataset("Cross-Border Physical Flow")
                .unwrap()
                .requires_destination()
        );
    }

    #[test]
    fn code_tables_are_registered_by_header() {
        let catalog = guide();
        let types: Vec<&str> = catalog.parameters.type_names().collect();
        assert_eq!(
            types,
            [
                "DocumentType",
                "ProcessType",
                "Contract_MarketAgreement.Type",
                "Type_MarketAgreement.Type",
                "Areas",
            ]
        );

        let process = catalog.parameters.get("ProcessType").unwrap();
        assert_eq!(process.meaning_of("A01"), Some("Day ahead"));
        assert_eq!(process.entries.len(), 3);

        let areas = catalog.parameters.get("Areas").unwrap();
        assert_eq!(areas.meaning_of("10YDK-1--------W"), Some("DK1 BZ / MBA"));
    }

    #[test]
    fn shared_header_registers_each_name() {
        let catalog = guide();
        let a = catalog.parameters.get("Contract_MarketAgreement.Type").unwrap();
        let b = catalog.parameters.get("Type_MarketAgreement.Type").unwrap();
        assert_eq!(a.entries, b.entries);
    }

    #[test]
    fn small_tables_are_skipped() {
        let catalog = guide();
        assert!(catalog.parameters.get("Note").is_none());
    }

    #[test]
    fn header_without_example_is_dropped() {
        let html = r#"<div id="content">
            <h4>Orphan Dataset</h4><p>No example here.</p>
            <h3>A.1. DocumentType</h3>
            <table><tr><th>Code</th><th>Meaning</th></tr>
            <tr><td>A44</td><td>Price Document</td></tr>
            <tr><td>A65</td><td>System total load</td></tr></table>
        </div>"#;
        let catalog = parse_guide(html).unwrap();
        assert!(catalog.datasets.is_empty());
        assert_eq!(catalog.parameters.types().len(), 1);
    }

    #[test]
    fn page_without_content_is_an_error() {
        let err = parse_guide("<html><body><p>maintenance</p></body></html>").unwrap_err();
        assert!(matches!(err, EntsoeError::Parse { .. }));
    }

    #[test]
    fn parameter_names_split_on_comma() {
        assert_eq!(
            parameter_names("A.13. X.Type, Y.Type"),
            Some(vec!["X.Type".to_string(), "Y.Type".to_string()])
        );
        assert_eq!(parameter_names("A.1."), None);
    }
}
