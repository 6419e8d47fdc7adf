#![forbid(unsafe_code)]

//! USGS FDSN event web service client.

use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use quakeline_core::{DataSource, Event, FetchError, PageQuery, TimeRange};
use reqwest::Url;
use reqwest::blocking::Client;
use tracing::{debug, info};

use crate::error::{Result, SourceError};
use crate::geojson::parse_events;

pub const USGS_BASE_URL: &str = "https://earthquake.usgs.gov/fdsnws/event/1/query";

/// Blocking client for the USGS event query endpoint.
#[derive(Debug, Clone)]
pub struct UsgsSource {
    client: Client,
    base_url: String,
}

impl UsgsSource {
    pub fn new() -> Result<Self> {
        Self::with_base_url(USGS_BASE_URL)
    }

    /// Client against another FDSN-compatible endpoint.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(20))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// Full request URL for one page.
    pub fn page_url(&self, query: &PageQuery) -> Result<Url> {
        let params = query_params(query);
        Url::parse_with_params(&self.base_url, &params).map_err(|err| SourceError::InvalidUrl {
            message: err.to_string(),
        })
    }

    /// Fetch and decode one page, newest first.
    pub fn fetch(&self, query: &PageQuery) -> Result<Vec<Event>> {
        let url = self.page_url(query)?;
        debug!(%url, "requesting USGS page");

        let response = self.client.get(url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("").to_string(),
            });
        }
        let body = response.text()?;
        let events = parse_events(&body)?;
        info!(
            offset = query.offset,
            limit = query.limit,
            received = events.len(),
            "USGS page received"
        );
        Ok(events)
    }
}

impl DataSource for UsgsSource {
    fn fetch_page(&self, query: &PageQuery) -> std::result::Result<Vec<Event>, FetchError> {
        self.fetch(query).map_err(FetchError::from)
    }
}

/// Query parameters for one page. USGS offsets are 1-based.
#[must_use]
pub fn query_params(query: &PageQuery) -> Vec<(&'static str, String)> {
    let (start, end) = format_range(&query.range);
    vec![
        ("format", "geojson".to_string()),
        ("starttime", start),
        ("endtime", end),
        ("limit", query.limit.to_string()),
        ("offset", (query.offset + 1).to_string()),
        ("orderby", "time".to_string()),
    ]
}

fn format_range(range: &TimeRange) -> (String, String) {
    let fmt = |dt: Option<DateTime<Utc>>| {
        dt.unwrap_or(DateTime::UNIX_EPOCH)
            .to_rfc3339_opts(SecondsFormat::Secs, true)
    };
    (fmt(range.start()), fmt(range.end()))
}
