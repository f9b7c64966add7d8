//! Time-window input normalization.

use chrono::{Duration, NaiveDateTime};
use entsoe_shared::{Result, TimeInterval, parse_human_timestamp, truncate_to_hour};

/// A requested window as typed by the caller. Omitted bounds take defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: Option<String>,
    pub end: Option<String>,
}

impl TimeWindow {
    pub fn new(start: Option<&str>, end: Option<&str>) -> Self {
        Self {
            start: start.map(str::to_string),
            end: end.map(str::to_string),
        }
    }

    /// Resolve against `now`: an omitted start is two days ago and an omitted
    /// end one day ago, both truncated to the hour.
    pub fn resolve(&self, now: NaiveDateTime) -> Result<TimeInterval> {
        let start = match self.start.as_deref() {
            Some(s) => parse_human_timestamp(s)?,
            None => truncate_to_hour(now - Duration::days(2)),
        };
        let end = match self.end.as_deref() {
            Some(s) => parse_human_timestamp(s)?,
            None => truncate_to_hour(now - Duration::days(1)),
        };
        TimeInterval::new(start, end)
    }
}
