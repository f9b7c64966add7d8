//! Oversized-range detection and interval splitting.

use std::sync::LazyLock;

use chrono::Duration;
use entsoe_shared::TimeInterval;
use regex::Regex;

/// Matches the service's `allowed: N unit` clause.
static ALLOWED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)allowed:\s*(\d+)\s*([a-z]+)").expect("allowed-limit regex")
});

/// Unit of an advertised range limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitUnit {
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl LimitUnit {
    fn parse(s: &str) -> Option<Self> {
        let s = s.to_lowercase();
        let s = s.strip_suffix('s').unwrap_or(s.as_str());
        match s {
            "minute" | "min" => Some(Self::Minute),
            "hour" | "h" => Some(Self::Hour),
            "day" | "d" => Some(Self::Day),
            "week" => Some(Self::Week),
            "month" => Some(Self::Month),
            "year" => Some(Self::Year),
            _ => None,
        }
    }

    /// Whole days guaranteed to fit in one unit.
    fn days(self) -> i64 {
        match self {
            Self::Minute | Self::Hour => 0,
            Self::Day => 1,
            Self::Week => 7,
            Self::Month => 28,
            Self::Year => 365,
        }
    }
}

/// The largest time range the service accepts per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeLimit {
    pub amount: u32,
    pub unit: LimitUnit,
}

impl RangeLimit {
    /// Read the limit from a rejection reason, if it advertises one.
    ///
    /// An unrecognized unit is read as days.
    pub fn from_reason(reason: &str) -> Option<Self> {
        let caps = ALLOWED_RE.captures(reason)?;
        let amount = caps.get(1)?.as_str().parse().ok()?;
        let unit = LimitUnit::parse(caps.get(2)?.as_str()).unwrap_or(LimitUnit::Day);
        Some(Self { amount, unit })
    }

    /// Sub-request length: the limit in whole days, at least one day.
    pub fn step(&self) -> Duration {
        let days = i64::from(self.amount).saturating_mul(self.unit.days());
        Duration::try_days(days.max(1)).unwrap_or(Duration::MAX)
    }
}

/// Cut `interval` into consecutive pieces of at most `step`.
///
/// The pieces cover the interval exactly: each starts where the previous one
/// ended and the last is clipped to the interval's end. A step longer than the
/// interval yields the interval itself.
pub fn split_interval(interval: &TimeInterval, step: Duration) -> Vec<TimeInterval> {
    let step = if step <= Duration::zero() {
        Duration::days(1)
    } else {
        step.min(interval.duration())
    };

    let mut pieces = Vec::new();
    let mut cursor = interval.start();
    while cursor < interval.end() {
        let next = cursor
            .checked_add_signed(step)
            .map_or(interval.end(), |t| t.min(interval.end()));
        // cursor < next holds, so construction cannot fail.
        if let Ok(piece) = TimeInterval::new(cursor, next) {
            pieces.push(piece);
        }
        cursor = next;
    }
    pieces
}
