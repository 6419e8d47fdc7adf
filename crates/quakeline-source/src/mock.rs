#![forbid(unsafe_code)]

//! Offline catalog of generated earthquakes.
//!
//! [`MockSource`] serves pages out of a seeded, deterministic dataset held in
//! a [`MockCache`]. The cache is stamped with the instant it was generated
//! and rebuilt once it is older than its max age, so a long-running demo
//! keeps producing "recent" events.

use std::cell::RefCell;

use chrono::Utc;
use quakeline_core::{DataSource, Event, FetchError, PageQuery};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::debug;
use web_time::{Duration, Instant};

pub const DEFAULT_EVENT_COUNT: usize = 2000;
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(60);
pub const DEFAULT_SEED: u64 = 0x5eed_ea27;

const HOUR_MS: i64 = 3_600_000;

const LOCATIONS: [&str; 31] = [
    "Northern California",
    "Southern California",
    "Central California",
    "Alaska Peninsula",
    "Aleutian Islands",
    "South Central Alaska",
    "Japan region",
    "Tokyo, Japan",
    "Hokkaido, Japan",
    "Central Chile",
    "Northern Chile",
    "Southern Chile",
    "Turkey-Syria border",
    "Eastern Turkey",
    "Western Turkey",
    "Indonesia",
    "Papua New Guinea",
    "Philippines",
    "Mexico",
    "Central Mexico",
    "Baja California",
    "Nevada",
    "Utah",
    "Idaho",
    "Montana",
    "Wyoming",
    "Greece",
    "Italy",
    "Peru",
    "Ecuador",
    "Colombia",
];

/// Generate `count` events, roughly one per hour going back from
/// `anchor_ms`, newest first. The same seed and anchor give the same data.
#[must_use]
pub fn generate_events(count: usize, seed: u64, anchor_ms: i64) -> Vec<Event> {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut events: Vec<Event> = (0..count)
        .map(|i| {
            let jitter = rng.random_range(0..HOUR_MS);
            let timestamp_ms = anchor_ms - i as i64 * HOUR_MS - jitter;
            let magnitude = ((2.5 + rng.random::<f64>() * 5.0) * 10.0).round() / 10.0;
            let location = LOCATIONS[rng.random_range(0..LOCATIONS.len())];
            let latitude = (rng.random::<f64>() - 0.5) * 180.0;
            let longitude = (rng.random::<f64>() - 0.5) * 360.0;
            let depth_km = rng.random::<f64>() * 100.0;
            Event::new(format!("mock{i}"), timestamp_ms)
                .with_magnitude(magnitude)
                .with_location(location)
                .with_coordinates(longitude, latitude, depth_km)
                .with_detail_url(format!(
                    "https://earthquake.usgs.gov/earthquakes/eventpage/mock{i}"
                ))
        })
        .collect();
    events.sort_by(|a, b| b.timestamp_ms.cmp(&a.timestamp_ms));
    events
}

/// A generated dataset and the instant it was built.
#[derive(Debug, Clone)]
pub struct MockCache {
    events: Vec<Event>,
    generated_at: Instant,
    max_age: Duration,
}

impl MockCache {
    #[must_use]
    pub fn new(events: Vec<Event>, generated_at: Instant, max_age: Duration) -> Self {
        Self {
            events,
            generated_at,
            max_age,
        }
    }

    /// Whether the dataset is younger than its max age at `now`.
    #[must_use]
    pub fn is_fresh(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.generated_at) < self.max_age
    }

    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    #[must_use]
    pub fn generated_at(&self) -> Instant {
        self.generated_at
    }
}

/// Where generated timestamps are anchored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// Wall clock at generation time.
    Now,
    /// Fixed epoch milliseconds; regeneration reproduces identical data.
    Fixed(i64),
}

/// Deterministic in-memory catalog.
#[derive(Debug)]
pub struct MockSource {
    count: usize,
    seed: u64,
    anchor: Anchor,
    max_age: Duration,
    cache: RefCell<Option<MockCache>>,
}

impl Default for MockSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSource {
    /// 2000 events anchored at the wall clock, rebuilt every 60s.
    #[must_use]
    pub fn new() -> Self {
        Self {
            count: DEFAULT_EVENT_COUNT,
            seed: DEFAULT_SEED,
            anchor: Anchor::Now,
            max_age: DEFAULT_MAX_AGE,
            cache: RefCell::new(None),
        }
    }

    #[must_use]
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn with_anchor(mut self, anchor: Anchor) -> Self {
        self.anchor = anchor;
        self
    }

    #[must_use]
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// Whether a fresh dataset is cached at `now`.
    #[must_use]
    pub fn is_cached(&self, now: Instant) -> bool {
        self.cache
            .borrow()
            .as_ref()
            .is_some_and(|cache| cache.is_fresh(now))
    }

    /// Serve one page as of `now`, rebuilding the dataset if it is stale.
    pub fn page_at(&self, query: &PageQuery, now: Instant) -> Vec<Event> {
        self.refresh(now);
        let cache = self.cache.borrow();
        let Some(cache) = cache.as_ref() else {
            return Vec::new();
        };
        cache
            .events()
            .iter()
            .filter(|event| query.range.contains(event.timestamp_ms))
            .skip(query.offset)
            .take(query.limit)
            .cloned()
            .collect()
    }

    fn refresh(&self, now: Instant) {
        if self.is_cached(now) {
            return;
        }
        let anchor_ms = match self.anchor {
            Anchor::Now => Utc::now().timestamp_millis(),
            Anchor::Fixed(ms) => ms,
        };
        let events = generate_events(self.count, self.seed, anchor_ms);
        debug!(count = events.len(), anchor_ms, "mock dataset generated");
        *self.cache.borrow_mut() = Some(MockCache::new(events, now, self.max_age));
    }
}

impl DataSource for MockSource {
    fn fetch_page(&self, query: &PageQuery) -> Result<Vec<Event>, FetchError> {
        Ok(self.page_at(query, Instant::now()))
    }
}
