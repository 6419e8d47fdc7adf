#![forbid(unsafe_code)]

//! Tolerant decoding of USGS GeoJSON feature collections.
//!
//! Every field is optional on the wire and every feature becomes an event, so
//! a decoded page is as long as the upstream page. A missing `id` is replaced
//! by a synthetic one, a missing `time` takes the time of the feature before
//! it, and every other missing or `null` field falls back to the
//! display-safe defaults of [`Event::new`].

use quakeline_core::Event;
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FeatureCollection {
    pub metadata: Option<Metadata>,
    pub features: Vec<Feature>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Metadata {
    pub generated: Option<i64>,
    pub url: Option<String>,
    pub title: Option<String>,
    pub status: Option<u16>,
    pub count: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Feature {
    pub id: Option<String>,
    pub properties: Properties,
    pub geometry: Option<Geometry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Properties {
    pub mag: Option<f64>,
    pub place: Option<String>,
    pub time: Option<i64>,
    pub url: Option<String>,
    pub title: Option<String>,
}

/// `[longitude, latitude, depth_km]`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Geometry {
    pub coordinates: Vec<Option<f64>>,
}

impl Geometry {
    fn coordinate(&self, idx: usize) -> f64 {
        self.coordinates
            .get(idx)
            .copied()
            .flatten()
            .filter(|v| v.is_finite())
            .unwrap_or(0.0)
    }
}

impl Feature {
    /// Whether the feature lacks the id or origin time it should carry.
    #[must_use]
    pub fn is_incomplete(&self) -> bool {
        self.id.as_deref().is_none_or(str::is_empty) || self.properties.time.is_none()
    }

    /// Convert to an [`Event`].
    ///
    /// `fallback_time` stands in for a missing origin time; `position` is the
    /// feature's index in its page and keys the synthetic id of a feature
    /// without one.
    #[must_use]
    pub fn into_event(self, fallback_time: i64, position: usize) -> Event {
        let time = self.properties.time.unwrap_or(fallback_time);
        let id = self
            .id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| format!("unidentified-{time}-{position}"));
        let mut event = Event::new(id, time);

        if let Some(mag) = self.properties.mag.filter(|m| m.is_finite()) {
            event = event.with_magnitude(mag);
        }
        if let Some(place) = self.properties.place.filter(|p| !p.trim().is_empty()) {
            event = event.with_location(place);
        }
        if let Some(url) = self.properties.url {
            event = event.with_detail_url(url);
        }
        if let Some(geometry) = &self.geometry {
            event = event.with_coordinates(
                geometry.coordinate(0),
                geometry.coordinate(1),
                geometry.coordinate(2),
            );
        }
        event
    }
}

/// Decode a feature collection body into events, newest first.
///
/// The result has one event per feature. A feature without a time is dated
/// like its predecessor in the upstream (time-descending) order, or like the
/// first dated feature when it leads the page.
pub fn parse_events(body: &str) -> Result<Vec<Event>, serde_json::Error> {
    let collection: FeatureCollection = serde_json::from_str(body)?;
    let total = collection.features.len();
    let mut last_time = collection
        .features
        .iter()
        .find_map(|f| f.properties.time)
        .unwrap_or(0);

    let mut incomplete = 0;
    let mut events = Vec::with_capacity(total);
    for (position, feature) in collection.features.into_iter().enumerate() {
        if feature.is_incomplete() {
            incomplete += 1;
        }
        if let Some(time) = feature.properties.time {
            last_time = time;
        }
        events.push(feature.into_event(last_time, position));
    }
    if incomplete > 0 {
        debug!(incomplete, total, "features without id or time kept with defaults");
    }
    events.sort_by(|a, b| b.timestamp_ms.cmp(&a.timestamp_ms));
    Ok(events)
}
