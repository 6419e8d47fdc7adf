#![forbid(unsafe_code)]

//! Filter parameters and the time range they select.
//!
//! A [`FilterConfig`] is owned by the surrounding UI. The paging controller
//! treats it as opaque: any change discards the loaded collection and starts
//! over from offset 0.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};

/// Magnitude floors offered by the filter bar.
pub const MAGNITUDE_PRESETS: [f64; 5] = [2.5, 3.0, 4.0, 5.0, 6.0];

/// Longest time window a configuration may ask for (about a century).
pub const MAX_WINDOW_DAYS: u32 = 36_500;

/// Client-side filter applied to every fetched page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Events below this magnitude are dropped after fetch.
    pub min_magnitude: f64,
    /// Length of the time window ending now, in days.
    pub window_days: u32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_magnitude: 2.5,
            window_days: 30,
        }
    }
}

impl FilterConfig {
    #[must_use]
    pub fn new(min_magnitude: f64, window_days: u32) -> Self {
        Self {
            min_magnitude,
            window_days,
        }
    }

    #[must_use]
    pub fn with_min_magnitude(mut self, min_magnitude: f64) -> Self {
        self.min_magnitude = min_magnitude;
        self
    }

    #[must_use]
    pub fn with_window_days(mut self, window_days: u32) -> Self {
        self.window_days = window_days;
        self
    }

    /// The `[now - window_days, now]` range queried for one filter session.
    ///
    /// A window reaching past the earliest representable instant starts there.
    #[must_use]
    pub fn time_range(&self, now: DateTime<Utc>) -> TimeRange {
        let start = ChronoDuration::try_days(i64::from(self.window_days))
            .and_then(|window| now.checked_sub_signed(window))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        TimeRange {
            start_ms: start.timestamp_millis(),
            end_ms: now.timestamp_millis(),
        }
    }
}

/// Fixed query window in epoch milliseconds, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    pub start_ms: i64,
    pub end_ms: i64,
}

impl TimeRange {
    #[must_use]
    pub fn new(start_ms: i64, end_ms: i64) -> Self {
        Self { start_ms, end_ms }
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, timestamp_ms: i64) -> bool {
        timestamp_ms >= self.start_ms && timestamp_ms <= self.end_ms
    }

    /// Start of the range as a UTC datetime, if representable.
    #[must_use]
    pub fn start(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.start_ms)
    }

    /// End of the range as a UTC datetime, if representable.
    #[must_use]
    pub fn end(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.end_ms)
    }
}
