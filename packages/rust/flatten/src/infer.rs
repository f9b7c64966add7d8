//! Column type inference.
//!
//! Each column's first-row value is the sample. A column whose sample is
//! numeric is cast as a whole when every populated cell parses: to `Int` if
//! they all parse as integers, otherwise to `Float`. A blank sample can only
//! yield `Float`.

use entsoe_shared::{Cell, Scalar, Table};

enum ColumnType {
    Int,
    Float,
}

/// Cast numeric-looking text columns in place.
pub fn infer_column_types(table: &mut Table) {
    let columns = table.columns().to_vec();
    for column in &columns {
        if let Some(kind) = detect(table, column) {
            cast(table, column, kind);
        }
    }
}

fn detect(table: &Table, column: &str) -> Option<ColumnType> {
    // `None` for a blank sample.
    let sample = match table.records().first()?.get(column) {
        Cell::Empty => None,
        Cell::Scalar(Scalar::Text(s)) => Some(s.as_str()),
        _ => return None,
    };

    let mut texts = Vec::new();
    for cell in table.column_cells(column) {
        match cell {
            Cell::Empty => {}
            Cell::Scalar(Scalar::Text(s)) => texts.push(s.as_str()),
            // Already typed or list-valued: leave alone.
            _ => return None,
        }
    }

    if texts.is_empty() {
        return None;
    }
    let all = |ok: fn(&str) -> bool| texts.iter().all(|s| ok(s));
    let is_int: fn(&str) -> bool = |s| s.parse::<i64>().is_ok();
    let is_float: fn(&str) -> bool = |s| s.parse::<f64>().is_ok();

    match sample {
        Some(s) if is_int(s) && all(is_int) => Some(ColumnType::Int),
        Some(s) if is_float(s) && all(is_float) => Some(ColumnType::Float),
        None if all(is_float) => Some(ColumnType::Float),
        _ => None,
    }
}

fn cast(table: &mut Table, column: &str, kind: ColumnType) {
    for record in table.records_mut() {
        let Some(text) = record.get(column).as_str() else {
            continue;
        };
        let scalar = match kind {
            ColumnType::Int => text.parse().ok().map(Scalar::Int),
            ColumnType::Float => text.parse().ok().map(Scalar::Float),
        };
        if let Some(scalar) = scalar {
            record.set(column, scalar);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entsoe_shared::Record;

    fn table(values: &[Option<&str>]) -> Table {
        let mut t = Table::with_columns(["v"]);
        for v in values {
            let mut r = Record::new().with("k", "x");
            if let Some(v) = v {
                r.set("v", *v);
            }
            t.push(r);
        }
        t
    }

    #[test]
    fn integer_column_is_cast() {
        let mut t = table(&[Some("1"), Some("2"), None]);
        infer_column_types(&mut t);
        assert_eq!(t.records()[0].get("v"), &Cell::Scalar(Scalar::Int(1)));
        assert!(t.records()[2].get("v").is_empty());
    }

    #[test]
    fn mixed_numeric_column_is_float() {
        let mut t = table(&[Some("1"), Some("2.5")]);
        infer_column_types(&mut t);
        assert_eq!(t.records()[0].get("v"), &Cell::Scalar(Scalar::Float(1.0)));
        assert_eq!(t.records()[1].get("v"), &Cell::Scalar(Scalar::Float(2.5)));
    }

    #[test]
    fn unparseable_cell_keeps_column_as_text() {
        let mut t = table(&[Some("1"), Some("n/a")]);
        infer_column_types(&mut t);
        assert_eq!(t.records()[0].get("v").as_str(), Some("1"));
    }

    #[test]
    fn only_first_row_is_sampled() {
        // A blank first row can still cast, but only to Float.
        let mut t = table(&[None, Some("3")]);
        infer_column_types(&mut t);
        assert_eq!(t.records()[1].get("v"), &Cell::Scalar(Scalar::Float(3.0)));
        assert!(t.records()[0].get("v").is_empty());

        let mut t = table(&[None, Some("3"), Some("x")]);
        infer_column_types(&mut t);
        assert_eq!(t.records()[1].get("v").as_str(), Some("3"));

        let mut t = table(&[Some("abc"), Some("3")]);
        infer_column_types(&mut t);
        assert_eq!(t.records()[1].get("v").as_str(), Some("3"));
    }

    #[test]
    fn text_columns_untouched() {
        let mut t = table(&[Some("2021-01-01T00:00Z")]);
        infer_column_types(&mut t);
        assert_eq!(t.records()[0].get("v").as_str(), Some("2021-01-01T00:00Z"));
        assert_eq!(t.records()[0].get("k").as_str(), Some("x"));
    }
}
