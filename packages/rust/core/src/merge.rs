//! Row merging: coalesce records that differ only in extend columns.
//!
//! The flattener emits one record per repeated unit (e.g. per measurement
//! point). Records of one series agree on every other column, so merging them
//! restores one row per series with the divergent values accumulated.

use std::cmp::Ordering;

use entsoe_shared::{Cell, Record, Table, parse_timestamp};
use tracing::debug;

/// Extend columns used when aggregating query results.
pub const DEFAULT_EXTENDS: &[&str] = &[
    "parameters",
    "createddatetime",
    "position",
    "quantity",
    "start",
    "end",
];

/// How an extend column combines two values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExtendRule {
    /// Interval start: keep the earlier timestamp.
    Earliest,
    /// Interval end: keep the later timestamp.
    Latest,
    /// Anything else: concatenate as lists.
    Concat,
}

impl ExtendRule {
    fn for_pattern(pattern: &str) -> Self {
        if pattern.contains("start") {
            Self::Earliest
        } else if pattern.contains("end") {
            Self::Latest
        } else {
            Self::Concat
        }
    }
}

/// Whether `column` is covered by the extend name `pattern`.
///
/// Flattened columns carry their parent as prefix, so `start` covers both
/// `start` and `timeinterval-start`.
pub(crate) fn column_matches(column: &str, pattern: &str) -> bool {
    column == pattern
        || column
            .strip_suffix(pattern)
            .is_some_and(|prefix| prefix.ends_with('-'))
}

/// Merge records equal on every non-extend column.
///
/// Extend names with no matching column are ignored; with none left the
/// table is returned unchanged. The source table is not modified.
pub fn merge_rows(table: &Table, extends: &[&str]) -> Table {
    let rules: Vec<(&str, ExtendRule)> = table
        .columns()
        .iter()
        .filter_map(|column| {
            extends
                .iter()
                .find(|pattern| column_matches(column, pattern))
                .map(|pattern| (column.as_str(), ExtendRule::for_pattern(pattern)))
        })
        .collect();

    if rules.is_empty() {
        return table.clone();
    }

    let keys: Vec<&str> = table
        .columns()
        .iter()
        .map(String::as_str)
        .filter(|c| !rules.iter().any(|(r, _)| r == c))
        .collect();

    let mut merged: Vec<Record> = Vec::new();
    for record in table.records() {
        let target = merged
            .iter_mut()
            .find(|m| keys.iter().all(|k| m.get(k) == record.get(k)));
        match target {
            Some(existing) => absorb(existing, record, &rules),
            None => merged.push(record.clone()),
        }
    }

    debug!(
        before = table.len(),
        after = merged.len(),
        extends = rules.len(),
        "rows merged"
    );

    let mut out = Table::with_columns(table.columns().iter().cloned());
    for record in merged {
        out.push(record);
    }
    out
}

fn absorb(existing: &mut Record, incoming: &Record, rules: &[(&str, ExtendRule)]) {
    for &(column, rule) in rules {
        let current = existing.take(column);
        let other = incoming.get(column).clone();
        let combined = match rule {
            ExtendRule::Earliest => pick_timestamp(current, other, Ordering::Less),
            ExtendRule::Latest => pick_timestamp(current, other, Ordering::Greater),
            ExtendRule::Concat => {
                let mut values = current.into_sequence();
                values.extend(other.into_sequence());
                if values.is_empty() {
                    Cell::Empty
                } else {
                    Cell::Sequence(values)
                }
            }
        };
        existing.set(column, combined);
    }
}

/// Keep `other` only if it parses and compares as `wanted` against `current`.
fn pick_timestamp(current: Cell, other: Cell, wanted: Ordering) -> Cell {
    let current = current.unwrap_singleton();
    let other = other.unwrap_singleton();

    if current.is_empty() {
        return other;
    }
    let (Some(a), Some(b)) = (cell_timestamp(&current), cell_timestamp(&other)) else {
        return current;
    };
    if b.cmp(&a) == wanted { other } else { current }
}

fn cell_timestamp(cell: &Cell) -> Option<chrono::NaiveDateTime> {
    cell.first_scalar()
        .and_then(|s| s.as_str())
        .and_then(parse_timestamp)
}
