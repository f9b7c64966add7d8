//! Timestamps and [`TimeInterval`].
//!
//! Requests carry minute-resolution timestamps in the canonical
//! `YYYYMMDDHHMM` form; response documents use `YYYY-MM-DDTHH:MMZ`.

use std::fmt;

use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::{EntsoeError, Result};

/// Canonical request timestamp format.
pub const CANONICAL_FORMAT: &str = "%Y%m%d%H%M";

/// Timestamp format used inside response documents.
pub const DOCUMENT_FORMAT: &str = "%Y-%m-%dT%H:%MZ";

/// Day-only format used by date-typed request parameters.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

// ---------------------------------------------------------------------------
// TimeInterval
// ---------------------------------------------------------------------------

/// A half-open `[start, end)` interval. Invariant: `start < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeInterval {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl TimeInterval {
    /// Build an interval at minute resolution, rejecting empty or inverted
    /// ranges. Seconds are dropped before the bounds are compared.
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self> {
        let (start, end) = (truncate_to_minute(start), truncate_to_minute(end));
        if start >= end {
            return Err(EntsoeError::validation(format!(
                "interval start {} is not before end {}",
                start.format(CANONICAL_FORMAT),
                end.format(CANONICAL_FORMAT)
            )));
        }
        Ok(Self { start, end })
    }

    /// Parse both bounds from canonical timestamps.
    pub fn parse_canonical(start: &str, end: &str) -> Result<Self> {
        Self::new(parse_canonical(start)?, parse_canonical(end)?)
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn end(&self) -> NaiveDateTime {
        self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Start in canonical form.
    pub fn start_canonical(&self) -> String {
        self.start.format(CANONICAL_FORMAT).to_string()
    }

    /// End in canonical form.
    pub fn end_canonical(&self) -> String {
        self.end.format(CANONICAL_FORMAT).to_string()
    }
}

impl fmt::Display for TimeInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.start_canonical(), self.end_canonical())
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse a canonical `YYYYMMDDHHMM` timestamp.
pub fn parse_canonical(s: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, CANONICAL_FORMAT)
        .map_err(|e| EntsoeError::validation(format!("invalid timestamp '{s}': {e}")))
}

/// Parse a timestamp as found in documents or requests.
///
/// Accepts the document form (with or without seconds) and the canonical form.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    [DOCUMENT_FORMAT, "%Y-%m-%dT%H:%M:%SZ", CANONICAL_FORMAT]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

/// Normalize a loosely formatted timestamp such as `2021-01-01 13:00`.
///
/// Spaces, `-`, `:`, `T` and `Z` are dropped; the remaining digits select the
/// precision by length: 8 (day), 10 (hour), 12 (minute) or 14 (second).
/// Seconds are validated and then dropped.
pub fn parse_human_timestamp(input: &str) -> Result<NaiveDateTime> {
    let digits: String = input
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | ':' | 'T' | 'Z'))
        .collect();

    let invalid = || EntsoeError::validation(format!("unrecognized timestamp '{input}'"));

    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }

    let field = |range: std::ops::Range<usize>| -> Result<u32> {
        digits
            .get(range)
            .and_then(|s| s.parse().ok())
            .ok_or_else(invalid)
    };

    let (hour, minute, second) = match digits.len() {
        8 => (0, 0, 0),
        10 => (field(8..10)?, 0, 0),
        12 => (field(8..10)?, field(10..12)?, 0),
        14 => (field(8..10)?, field(10..12)?, field(12..14)?),
        _ => return Err(invalid()),
    };

    let year = digits
        .get(0..4)
        .and_then(|s| s.parse::<i32>().ok())
        .ok_or_else(invalid)?;

    NaiveDate::from_ymd_opt(year, field(4..6)?, field(6..8)?)
        .and_then(|d| d.and_hms_opt(hour, minute, second))
        .map(truncate_to_minute)
        .ok_or_else(invalid)
}

fn truncate_to_minute(ts: NaiveDateTime) -> NaiveDateTime {
    ts.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(ts)
}

/// Drop minutes and seconds.
pub fn truncate_to_hour(ts: NaiveDateTime) -> NaiveDateTime {
    ts.with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(ts)
}
