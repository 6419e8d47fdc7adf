#![forbid(unsafe_code)]

//! Earthquake event record.

use serde::{Deserialize, Serialize};

/// Label used when the upstream record carries no place name.
pub const UNKNOWN_LOCATION: &str = "Unknown location";

/// A single earthquake as rendered in one timeline row.
///
/// Events are created when a page arrives, appended once, and never mutated.
/// Collections of events are kept most-recent-first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Upstream identifier, unique within a filter session.
    pub id: String,
    /// Origin time in milliseconds since the Unix epoch.
    pub timestamp_ms: i64,
    pub magnitude: f64,
    pub location_label: String,
    pub depth_km: f64,
    pub longitude: f64,
    pub latitude: f64,
    /// Event page on the upstream catalog. May be empty.
    pub detail_url: String,
}

impl Event {
    /// Create an event with display-safe defaults for everything but the
    /// identity and origin time.
    #[must_use]
    pub fn new(id: impl Into<String>, timestamp_ms: i64) -> Self {
        Self {
            id: id.into(),
            timestamp_ms,
            magnitude: 0.0,
            location_label: UNKNOWN_LOCATION.to_string(),
            depth_km: 0.0,
            longitude: 0.0,
            latitude: 0.0,
            detail_url: String::new(),
        }
    }

    #[must_use]
    pub fn with_magnitude(mut self, magnitude: f64) -> Self {
        self.magnitude = magnitude;
        self
    }

    #[must_use]
    pub fn with_location(mut self, label: impl Into<String>) -> Self {
        self.location_label = label.into();
        self
    }

    /// Set longitude, latitude and depth, in GeoJSON coordinate order.
    #[must_use]
    pub fn with_coordinates(mut self, longitude: f64, latitude: f64, depth_km: f64) -> Self {
        self.longitude = longitude;
        self.latitude = latitude;
        self.depth_km = depth_km;
        self
    }

    #[must_use]
    pub fn with_detail_url(mut self, url: impl Into<String>) -> Self {
        self.detail_url = url.into();
        self
    }

    /// Whether the event passes a magnitude floor (inclusive).
    #[inline]
    #[must_use]
    pub fn meets_magnitude(&self, min_magnitude: f64) -> bool {
        self.magnitude >= min_magnitude
    }
}
