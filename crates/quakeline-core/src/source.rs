#![forbid(unsafe_code)]

//! Page-fetching contract between the paging controller and a catalog.
//!
//! A [`DataSource`] returns one page of events for a fixed time range,
//! ordered by `timestamp_ms` descending. The controller appends pages
//! without re-sorting, so successive pages must not regress in time:
//! every event of page `n + 1` must be no newer than the oldest event of
//! page `n`. [`check_page_order`] validates that assumption.

use thiserror::Error;

use crate::event::Event;
use crate::filter::TimeRange;

/// One page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageQuery {
    pub range: TimeRange,
    /// Requested page size.
    pub limit: usize,
    /// Zero-based index of the first record, in unfiltered upstream order.
    pub offset: usize,
}

impl PageQuery {
    #[must_use]
    pub fn new(range: TimeRange, limit: usize, offset: usize) -> Self {
        Self {
            range,
            limit,
            offset,
        }
    }
}

/// Failure to obtain a page.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "fetch failed{}: {message}",
    .status.map(|code| format!(" with status {code}")).unwrap_or_default()
)]
pub struct FetchError {
    /// HTTP status when the failure came from a response.
    pub status: Option<u16>,
    pub message: String,
}

impl FetchError {
    /// A transport or decoding failure with no response status.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }
}

/// A source of event pages.
///
/// Implementations block until the page is available. The runtime issues at
/// most one request per filter session at a time.
pub trait DataSource {
    fn fetch_page(&self, query: &PageQuery) -> Result<Vec<Event>, FetchError>;
}

impl<S: DataSource + ?Sized> DataSource for &S {
    fn fetch_page(&self, query: &PageQuery) -> Result<Vec<Event>, FetchError> {
        (**self).fetch_page(query)
    }
}

impl<S: DataSource + ?Sized> DataSource for Box<S> {
    fn fetch_page(&self, query: &PageQuery) -> Result<Vec<Event>, FetchError> {
        (**self).fetch_page(query)
    }
}

impl<S: DataSource + ?Sized> DataSource for std::rc::Rc<S> {
    fn fetch_page(&self, query: &PageQuery) -> Result<Vec<Event>, FetchError> {
        (**self).fetch_page(query)
    }
}

/// Where a page broke the most-recent-first ordering contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderViolation {
    /// Event `index` within the page is newer than its predecessor.
    #[error("event {index} ({id}) is newer than the event before it")]
    UnsortedPage { index: usize, id: String },
    /// The page's newest event is newer than the previously loaded tail.
    #[error("page starts at {page_newest_ms}, after the loaded tail at {previous_oldest_ms}")]
    Regression {
        previous_oldest_ms: i64,
        page_newest_ms: i64,
    },
}

/// Validate that `page` can be appended after a collection whose oldest
/// event has timestamp `previous_oldest_ms`.
///
/// Returns the first violation found. An empty page is always valid.
pub fn check_page_order(
    previous_oldest_ms: Option<i64>,
    page: &[Event],
) -> Result<(), OrderViolation> {
    if let Some(index) = page
        .windows(2)
        .position(|pair| pair[1].timestamp_ms > pair[0].timestamp_ms)
    {
        return Err(OrderViolation::UnsortedPage {
            index: index + 1,
            id: page[index + 1].id.clone(),
        });
    }
    match (previous_oldest_ms, page.first()) {
        (Some(previous), Some(first)) if first.timestamp_ms > previous => {
            Err(OrderViolation::Regression {
                previous_oldest_ms: previous,
                page_newest_ms: first.timestamp_ms,
            })
        }
        _ => Ok(()),
    }
}
