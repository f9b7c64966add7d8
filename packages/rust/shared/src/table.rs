//! Tabular output model: [`Table`], [`Record`], [`Cell`].
//!
//! A missing cell is [`Cell::Empty`], which is distinct from an empty string so
//! column type inference can skip blanks. Records never store `Empty`
//! explicitly, so two records compare equal exactly when their populated
//! cells do.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

// ---------------------------------------------------------------------------
// Scalar
// ---------------------------------------------------------------------------

/// A single typed value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    /// Borrow the text payload, if this is a text scalar.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

// ---------------------------------------------------------------------------
// Cell
// ---------------------------------------------------------------------------

/// One cell of a record: empty, a scalar, or a sequence of scalars for
/// repeatable columns (e.g. measured quantities).
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(untagged)]
pub enum Cell {
    #[default]
    Empty,
    Scalar(Scalar),
    Sequence(Vec<Scalar>),
}

impl Cell {
    /// Text cell shorthand.
    pub fn text(s: impl Into<String>) -> Self {
        Self::Scalar(Scalar::Text(s.into()))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Borrow the text of a text scalar.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Scalar(s) => s.as_str(),
            _ => None,
        }
    }

    /// Coerce into a list: empty becomes `[]`, a scalar becomes `[scalar]`.
    pub fn into_sequence(self) -> Vec<Scalar> {
        match self {
            Self::Empty => Vec::new(),
            Self::Scalar(s) => vec![s],
            Self::Sequence(v) => v,
        }
    }

    /// A scalar, or the only element of a one-element sequence.
    pub fn first_scalar(&self) -> Option<&Scalar> {
        match self {
            Self::Scalar(s) => Some(s),
            Self::Sequence(v) if v.len() == 1 => v.first(),
            _ => None,
        }
    }

    /// Replace a one-element sequence by its element.
    pub fn unwrap_singleton(self) -> Self {
        match self {
            Self::Sequence(mut v) if v.len() == 1 => match v.pop() {
                Some(s) => Self::Scalar(s),
                None => Self::Empty,
            },
            other => other,
        }
    }
}

impl From<Scalar> for Cell {
    fn from(s: Scalar) -> Self {
        Self::Scalar(s)
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Self::text(s)
    }
}

impl From<bool> for Cell {
    fn from(b: bool) -> Self {
        Self::Scalar(Scalar::Bool(b))
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => Ok(()),
            Self::Scalar(s) => write!(f, "{s}"),
            Self::Sequence(v) => {
                f.write_str("[")?;
                for (i, s) in v.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{s}")?;
                }
                f.write_str("]")
            }
        }
    }
}

static EMPTY: Cell = Cell::Empty;

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// One logical output row: column name → cell.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct Record {
    cells: HashMap<String, Cell>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cell for `column`, or [`Cell::Empty`] when unset.
    pub fn get(&self, column: &str) -> &Cell {
        self.cells.get(column).unwrap_or(&EMPTY)
    }

    /// Set a cell. Setting [`Cell::Empty`] clears it.
    pub fn set(&mut self, column: impl Into<String>, cell: impl Into<Cell>) {
        let column = column.into();
        match cell.into() {
            Cell::Empty => {
                self.cells.remove(&column);
            }
            cell => {
                self.cells.insert(column, cell);
            }
        }
    }

    /// Remove and return a cell.
    pub fn take(&mut self, column: &str) -> Cell {
        self.cells.remove(column).unwrap_or_default()
    }

    /// Builder-style [`Record::set`].
    pub fn with(mut self, column: impl Into<String>, cell: impl Into<Cell>) -> Self {
        self.set(column, cell);
        self
    }

    /// Column names holding a value, in no particular order.
    pub fn populated(&self) -> impl Iterator<Item = &str> {
        self.cells.keys().map(String::as_str)
    }

    /// True when no cell holds a value.
    pub fn is_blank(&self) -> bool {
        self.cells.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// Ordered records plus an ordered, unique set of column names.
///
/// Columns are appended on first appearance and never reordered implicitly.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Table {
    columns: Vec<String>,
    records: Vec<Record>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty table with a fixed column order.
    pub fn with_columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = Self::new();
        for column in columns {
            table.add_column(column);
        }
        table
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut [Record] {
        &mut self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when there are no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Register a column. Returns `false` if it already existed.
    pub fn add_column(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if self.has_column(&name) {
            return false;
        }
        self.columns.push(name);
        true
    }

    /// Insert a column at `index`, giving every record `value`.
    ///
    /// An existing column keeps its position and values.
    pub fn insert_column(&mut self, index: usize, name: &str, value: Cell) {
        if self.has_column(name) {
            return;
        }
        let index = index.min(self.columns.len());
        self.columns.insert(index, name.to_string());
        for record in &mut self.records {
            record.set(name, value.clone());
        }
    }

    /// Append a record. Columns it populates that the table has not seen yet
    /// are registered in sorted order.
    pub fn push(&mut self, record: Record) {
        let mut unseen: Vec<String> = record
            .populated()
            .filter(|c| !self.has_column(c))
            .map(String::from)
            .collect();
        unseen.sort();
        self.columns.extend(unseen);
        self.records.push(record);
    }

    pub fn last(&self) -> Option<&Record> {
        self.records.last()
    }

    pub fn last_mut(&mut self) -> Option<&mut Record> {
        self.records.last_mut()
    }

    /// Union another table into this one: its unseen columns are appended in
    /// its own order, then its records follow ours.
    pub fn extend(&mut self, other: Table) {
        for column in other.columns {
            self.add_column(column);
        }
        self.records.extend(other.records);
    }

    /// Cells of one column in record order.
    pub fn column_cells<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Cell> + 'a {
        self.records.iter().map(move |r| r.get(name))
    }

    /// Drop records that exactly duplicate an earlier one.
    pub fn dedup(&mut self) {
        let mut kept: Vec<Record> = Vec::with_capacity(self.records.len());
        for record in self.records.drain(..) {
            if !kept.contains(&record) {
                kept.push(record);
            }
        }
        self.records = kept;
    }

    /// Apply `f` to every cell of every record.
    pub fn map_cells(&mut self, f: impl Fn(Cell) -> Cell) {
        for record in &mut self.records {
            for column in &self.columns {
                let cell = record.take(column);
                record.set(column.as_str(), f(cell));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_cell_is_not_stored() {
        let mut record = Record::new().with("a", "x");
        record.set("a", Cell::Empty);
        assert!(record.is_blank());
        assert_eq!(record, Record::new());
    }

    #[test]
    fn push_registers_unseen_columns() {
        let mut table = Table::with_columns(["b"]);
        table.push(Record::new().with("b", "1").with("d", "2").with("c", "3"));
        assert_eq!(table.columns(), ["b", "c", "d"]);
    }

    #[test]
    fn insert_column_fills_every_record() {
        let mut table = Table::new();
        table.push(Record::new().with("x", "1"));
        table.push(Record::new().with("x", "2"));
        table.insert_column(0, "dataset", Cell::text("Actual Total Load"));
        assert_eq!(table.columns(), ["dataset", "x"]);
        assert!(
            table
                .column_cells("dataset")
                .all(|c| c.as_str() == Some("Actual Total Load"))
        );
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let mut table = Table::new();
        table.push(Record::new().with("x", "1"));
        table.push(Record::new().with("x", "2"));
        table.push(Record::new().with("x", "1"));
        table.dedup();
        assert_eq!(table.len(), 2);
        assert_eq!(table.records()[1].get("x").as_str(), Some("2"));
    }

    #[test]
    fn extend_unions_columns_in_order() {
        let mut a = Table::with_columns(["x", "y"]);
        a.push(Record::new().with("x", "1"));
        let mut b = Table::with_columns(["y", "z"]);
        b.push(Record::new().with("z", "2"));
        a.extend(b);
        assert_eq!(a.columns(), ["x", "y", "z"]);
        assert_eq!(a.len(), 2);
    }

    #[test]
    fn singleton_sequence_unwraps() {
        let cell = Cell::Sequence(vec![Scalar::Int(5)]);
        assert_eq!(cell.unwrap_singleton(), Cell::Scalar(Scalar::Int(5)));

        let cell = Cell::Sequence(vec![Scalar::Int(5), Scalar::Int(6)]);
        assert!(matches!(cell.unwrap_singleton(), Cell::Sequence(v) if v.len() == 2));
    }

    #[test]
    fn cell_serializes_untagged() {
        let record = Record::new()
            .with("n", Cell::Scalar(Scalar::Int(3)))
            .with("q", Cell::Sequence(vec![Scalar::Float(1.5), Scalar::Float(2.0)]));
        let json = serde_json::to_value(&record).expect("serialize");
        assert_eq!(json["n"], 3);
        assert_eq!(json["q"][0], 1.5);
    }
}
