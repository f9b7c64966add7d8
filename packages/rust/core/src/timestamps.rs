//! Per-sample timestamps for merged series.

use chrono::NaiveDateTime;
use entsoe_shared::{Cell, DOCUMENT_FORMAT, Scalar, Table, parse_timestamp};

use crate::merge::column_matches;

/// Column added by [`add_sample_timestamps`].
pub const TIMESTAMP_COLUMN: &str = "timestamp";

/// Add a `timestamp` list spacing one timestamp per quantity evenly from the
/// series start.
///
/// The last start, end and quantity columns in column order are used. Tables
/// lacking any of them are left as they are; rows whose bounds do not parse
/// get no timestamps.
pub fn add_sample_timestamps(table: &mut Table) {
    let last_matching = |pattern: &str| {
        table
            .columns()
            .iter()
            .rev()
            .find(|c| column_matches(c, pattern))
            .cloned()
    };
    let (Some(start_col), Some(end_col), Some(quantity_col)) = (
        last_matching("start"),
        last_matching("end"),
        last_matching("quantity"),
    ) else {
        return;
    };

    table.add_column(TIMESTAMP_COLUMN);
    for record in table.records_mut() {
        let samples = match record.get(&quantity_col) {
            Cell::Empty => 0,
            Cell::Scalar(_) => 1,
            Cell::Sequence(v) => v.len(),
        };
        let bounds = (
            timestamp_of(record.get(&start_col)),
            timestamp_of(record.get(&end_col)),
        );
        let (Some(start), Some(end)) = bounds else {
            continue;
        };
        if samples == 0 || end <= start {
            continue;
        }
        let Ok(count) = i32::try_from(samples) else {
            continue;
        };

        let step = (end - start) / count;
        let stamps = (0..count)
            .map(|i| Scalar::Text((start + step * i).format(DOCUMENT_FORMAT).to_string()))
            .collect();
        record.set(TIMESTAMP_COLUMN, Cell::Sequence(stamps));
    }
}

fn timestamp_of(cell: &Cell) -> Option<NaiveDateTime> {
    cell.first_scalar()
        .and_then(Scalar::as_str)
        .and_then(parse_timestamp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use entsoe_shared::Record;

    #[test]
    fn timestamps_are_evenly_spaced() {
        let mut table = Table::new();
        table.push(
            Record::new()
                .with("timeinterval-start", "2021-01-01T00:00Z")
                .with("timeinterval-end", "2021-01-01T12:00Z")
                .with(
                    "point-quantity",
                    Cell::Sequence(vec![Scalar::Int(1), Scalar::Int(2), Scalar::Int(3)]),
                ),
        );
        add_sample_timestamps(&mut table);

        assert_eq!(
            table.records()[0].get(TIMESTAMP_COLUMN),
            &Cell::Sequence(vec![
                Scalar::from("2021-01-01T00:00Z"),
                Scalar::from("2021-01-01T04:00Z"),
                Scalar::from("2021-01-01T08:00Z"),
            ])
        );
    }

    #[test]
    fn scalar_quantity_gets_one_timestamp() {
        let mut table = Table::new();
        table.push(
            Record::new()
                .with("start", "2021-01-01T00:00Z")
                .with("end", "2021-01-01T01:00Z")
                .with("quantity", Scalar::Int(7)),
        );
        add_sample_timestamps(&mut table);
        assert_eq!(
            table.records()[0].get(TIMESTAMP_COLUMN),
            &Cell::Sequence(vec![Scalar::from("2021-01-01T00:00Z")])
        );
    }

    #[test]
    fn latest_start_column_wins() {
        let mut table = Table::with_columns([
            "time_period.timeinterval-start",
            "time_period.timeinterval-end",
            "timeinterval-start",
            "timeinterval-end",
            "point-quantity",
        ]);
        table.push(
            Record::new()
                .with("time_period.timeinterval-start", "2021-01-01T00:00Z")
                .with("time_period.timeinterval-end", "2021-01-02T00:00Z")
                .with("timeinterval-start", "2021-01-01T12:00Z")
                .with("timeinterval-end", "2021-01-01T14:00Z")
                .with("point-quantity", Cell::Sequence(vec![Scalar::Int(1), Scalar::Int(2)])),
        );
        add_sample_timestamps(&mut table);
        assert_eq!(
            table.records()[0].get(TIMESTAMP_COLUMN),
            &Cell::Sequence(vec![
                Scalar::from("2021-01-01T12:00Z"),
                Scalar::from("2021-01-01T13:00Z"),
            ])
        );
    }

    #[test]
    fn tables_without_series_columns_are_untouched() {
        let mut table = Table::new();
        table.push(Record::new().with("reason", "x"));
        add_sample_timestamps(&mut table);
        assert!(!table.has_column(TIMESTAMP_COLUMN));
    }
}
