#![forbid(unsafe_code)]

//! Display labels for timeline rows.
//!
//! Everything here is pure: relative times take `now` explicitly and all
//! absolute times are rendered in UTC.

use chrono::{DateTime, Utc};

const MINUTE_MS: i64 = 60 * 1000;
const HOUR_MS: i64 = 60 * MINUTE_MS;
const DAY_MS: i64 = 24 * HOUR_MS;

/// Absolute date label, e.g. `Mar 5, 2024, 02:30 PM`.
#[must_use]
pub fn format_date(timestamp_ms: i64) -> String {
    match DateTime::<Utc>::from_timestamp_millis(timestamp_ms) {
        Some(dt) => dt.format("%b %-d, %Y, %I:%M %p").to_string(),
        None => String::from("Invalid date"),
    }
}

/// Age label relative to `now_ms`: minutes, hours and days up to 30 days,
/// then the absolute date. Future timestamps count as zero minutes old.
#[must_use]
pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms).max(0);
    if diff < HOUR_MS {
        format!("{}m ago", diff / MINUTE_MS)
    } else if diff < DAY_MS {
        format!("{}h ago", diff / HOUR_MS)
    } else if diff < 30 * DAY_MS {
        format!("{}d ago", diff / DAY_MS)
    } else {
        format_date(timestamp_ms)
    }
}

/// Cut `text` to `max_chars` characters, appending `...` when shortened.
#[must_use]
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        None => text.to_string(),
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
    }
}

#[must_use]
pub fn format_magnitude(magnitude: f64) -> String {
    format!("{magnitude:.1}")
}

#[must_use]
pub fn format_depth(depth_km: f64) -> String {
    format!("{} km deep", depth_km.round() as i64)
}

/// `lat°, lon°` with three decimals.
#[must_use]
pub fn format_coordinates(longitude: f64, latitude: f64) -> String {
    format!("{latitude:.3}°, {longitude:.3}°")
}

/// Severity class of a magnitude, shown as a row label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MagnitudeClass {
    Micro,
    Minor,
    Light,
    Moderate,
    Strong,
    Major,
    Great,
}

impl MagnitudeClass {
    #[must_use]
    pub fn from_magnitude(magnitude: f64) -> Self {
        match magnitude {
            m if m >= 8.0 => Self::Great,
            m if m >= 7.0 => Self::Major,
            m if m >= 6.0 => Self::Strong,
            m if m >= 5.0 => Self::Moderate,
            m if m >= 4.0 => Self::Light,
            m if m >= 3.0 => Self::Minor,
            _ => Self::Micro,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Micro => "Micro",
            Self::Minor => "Minor",
            Self::Light => "Light",
            Self::Moderate => "Moderate",
            Self::Strong => "Strong",
            Self::Major => "Major",
            Self::Great => "Great",
        }
    }
}

impl std::fmt::Display for MagnitudeClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2024-03-05T14:30:00Z
    const T: i64 = 1_709_649_000_000;

    #[test]
    fn date_is_rendered_in_utc() {
        assert_eq!(format_date(T), "Mar 5, 2024, 02:30 PM");
    }

    #[test]
    fn relative_time_buckets() {
        assert_eq!(format_relative_time(T, T + 5 * MINUTE_MS), "5m ago");
        assert_eq!(format_relative_time(T, T + 59 * MINUTE_MS), "59m ago");
        assert_eq!(format_relative_time(T, T + HOUR_MS), "1h ago");
        assert_eq!(format_relative_time(T, T + 23 * HOUR_MS), "23h ago");
        assert_eq!(format_relative_time(T, T + 3 * DAY_MS), "3d ago");
        assert_eq!(format_relative_time(T, T + 45 * DAY_MS), format_date(T));
    }

    #[test]
    fn future_timestamps_are_fresh() {
        assert_eq!(format_relative_time(T + HOUR_MS, T), "0m ago");
    }

    #[test]
    fn truncate_counts_characters_not_bytes() {
        assert_eq!(truncate_text("Tōkyō, Japan", 5), "Tōkyō...");
        assert_eq!(truncate_text("Peru", 4), "Peru");
        assert_eq!(truncate_text("Peru", 10), "Peru");
    }

    #[test]
    fn numeric_labels() {
        assert_eq!(format_magnitude(4.26), "4.3");
        assert_eq!(format_magnitude(6.0), "6.0");
        assert_eq!(format_depth(10.6), "11 km deep");
        assert_eq!(format_coordinates(-122.4194, 37.7749), "37.775°, -122.419°");
    }

    #[test]
    fn magnitude_classes() {
        assert_eq!(MagnitudeClass::from_magnitude(2.5), MagnitudeClass::Micro);
        assert_eq!(MagnitudeClass::from_magnitude(3.0), MagnitudeClass::Minor);
        assert_eq!(MagnitudeClass::from_magnitude(5.9), MagnitudeClass::Moderate);
        assert_eq!(MagnitudeClass::from_magnitude(7.2), MagnitudeClass::Major);
        assert_eq!(MagnitudeClass::from_magnitude(9.1).to_string(), "Great");
    }
}
