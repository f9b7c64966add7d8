//! Tree flattening: one response document → one [`Table`].
//!
//! Leaves become columns named `<parent>-<leaf>`, where the parent is the
//! nearest enclosing element. A repeated leaf starts a new record that carries
//! forward the previous record's cells to the left of the repeating column,
//! so shared header values reach every repeated unit.
//!
//! ```text
//! <doc>
//!   <series><start>..</start><quantity>5</quantity></series>
//! </doc>
//! ```
//! flattens to columns `series-start`, `series-quantity` with one record.

mod infer;
mod tree;

use entsoe_resolver::Remapper;
use entsoe_shared::{Cell, Record, Result, Scalar, Table};
use tracing::{debug, instrument};

pub use infer::infer_column_types;
pub use tree::{Document, Node, NodeId};

/// Tag of the element holding a rejection reason in acknowledgement documents.
const REASON_TAG: &str = "reason";
const REASON_TEXT_TAG: &str = "text";

// ---------------------------------------------------------------------------
// Flattener
// ---------------------------------------------------------------------------

/// Configurable document flattener.
#[derive(Debug, Clone, Default)]
pub struct Flattener<'a> {
    start_tag: Option<String>,
    remapper: Option<&'a Remapper<'a>>,
}

impl<'a> Flattener<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from the first element with this tag instead of the root.
    pub fn with_start_tag(mut self, tag: impl Into<String>) -> Self {
        self.start_tag = Some(tag.into().to_lowercase());
        self
    }

    /// Translate codes into meanings while flattening.
    pub fn with_remapper(mut self, remapper: &'a Remapper<'a>) -> Self {
        self.remapper = Some(remapper);
        self
    }

    /// Parse and flatten markup text.
    pub fn flatten_str(&self, input: &str) -> Result<Table> {
        let doc = Document::parse(input)?;
        Ok(self.flatten(&doc))
    }

    /// Parse and flatten raw response bytes.
    pub fn flatten_bytes(&self, input: &[u8]) -> Result<Table> {
        let doc = Document::parse_bytes(input)?;
        Ok(self.flatten(&doc))
    }

    /// Flatten a parsed document.
    ///
    /// A document without a start node gives an empty table; a start node
    /// that is itself a leaf gives a single one-column record.
    #[instrument(skip_all, fields(start_tag = ?self.start_tag, nodes = doc.len()))]
    pub fn flatten(&self, doc: &Document) -> Table {
        let start = match &self.start_tag {
            Some(tag) => doc.find(tag),
            None => doc.content_root(),
        };

        let mut table = Table::new();
        let Some(start) = start else {
            debug!("no start node, empty table");
            return table;
        };

        if doc.is_leaf(start) {
            let name = doc.name(start);
            let value = self.leaf_value(name, doc.text(start).unwrap_or_default());
            table.push(Record::new().with(name, value));
        } else {
            self.walk(doc, start, &mut table);
        }

        finalize(&mut table);
        debug!(
            rows = table.len(),
            columns = table.columns().len(),
            "document flattened"
        );
        table
    }

    fn walk(&self, doc: &Document, parent: NodeId, table: &mut Table) {
        let parent_name = doc.name(parent);
        for &child in doc.children(parent) {
            if !doc.is_leaf(child) {
                self.walk(doc, child, table);
                continue;
            }
            let leaf_name = doc.name(child);
            let column = format!("{parent_name}-{leaf_name}");
            let value = self.leaf_value(leaf_name, doc.text(child).unwrap_or_default());
            place(table, column, value);
        }
    }

    fn leaf_value(&self, tag: &str, raw: &str) -> Cell {
        match self.remapper.and_then(|r| r.remap(tag, raw)) {
            Some(meaning) => Cell::text(meaning),
            None => Cell::text(raw),
        }
    }
}

/// Put one leaf value into the table.
///
/// An occupied cell in the last record marks the start of a new repeated
/// unit: the new record copies the last record's cells for every column
/// before `column` in column order.
fn place(table: &mut Table, column: String, value: Cell) {
    table.add_column(column.as_str());

    let occupied = match table.last() {
        None => {
            table.push(Record::new().with(column, value));
            return;
        }
        Some(last) => !last.get(&column).is_empty(),
    };

    if !occupied {
        if let Some(last) = table.last_mut() {
            last.set(column, value);
        }
        return;
    }

    let mut record = Record::new();
    if let Some(last) = table.last() {
        for name in table.columns().iter().take_while(|c| **c != column) {
            record.set(name.as_str(), last.get(name).clone());
        }
    }
    table.push(record.with(column, value));
}

/// Blank cells become empty, duplicates go, numeric columns are typed.
fn finalize(table: &mut Table) {
    table.map_cells(|cell| match cell {
        Cell::Scalar(Scalar::Text(s)) if s.is_empty() => Cell::Empty,
        other => other,
    });
    table.dedup();
    infer_column_types(table);
}

/// Convenience wrapper: flatten with default options.
pub fn flatten(doc: &Document) -> Table {
    Flattener::new().flatten(doc)
}

// ---------------------------------------------------------------------------
// Reason documents
// ---------------------------------------------------------------------------

/// The rejection text of an acknowledgement document.
///
/// Such documents carry a `reason` element with a `text` child; any other
/// document yields `None`.
pub fn extract_reason(doc: &Document) -> Option<String> {
    let reason = doc.find(REASON_TAG)?;
    let text = doc.child(reason, REASON_TEXT_TAG)?;
    doc.text(text).map(str::to_string)
}
