#![forbid(unsafe_code)]

//! Paging state machine for the event collection.
//!
//! [`PagingController`] owns the loaded events and the [`LoadState`]. It does
//! no I/O: every operation that needs a page returns a [`FetchRequest`], the
//! host performs the fetch, and hands the outcome back through
//! [`PagingController::complete`].
//!
//! # State machine
//!
//! ```text
//!            reset                 complete(Ok)
//!   Idle ───────────▶ Loading ──────────────────▶ Idle (has_more?)
//!    ▲                  │  ▲                          │
//!    │  complete(Err)   │  │ maybe_load_more / retry  │
//!    └──── Error ◀──────┘  └──────────────────────────┘
//! ```
//!
//! # Invariants
//!
//! 1. At most one request per generation is outstanding (`is_loading`).
//! 2. `reset` bumps the generation; completions from older generations are
//!    returned as [`Completion::Stale`] and leave all state untouched.
//! 3. The offset advances by the requested page size, not by the number of
//!    events that survived the magnitude filter.
//! 4. `has_more` is decided by the unfiltered page length.
//! 5. A failed fetch never changes the collection or `has_more`.

use chrono::{DateTime, Utc};
use quakeline_core::{Event, FetchError, FilterConfig, PageQuery, TimeRange, check_page_order};
use tracing::{debug, info, warn};

/// Loading flags exposed to the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadState {
    pub is_loading: bool,
    pub error: Option<String>,
    pub has_more: bool,
}

impl Default for LoadState {
    fn default() -> Self {
        Self {
            is_loading: false,
            error: None,
            has_more: true,
        }
    }
}

/// A page fetch issued by the controller, tagged with its session generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FetchRequest {
    pub generation: u64,
    pub query: PageQuery,
}

/// What [`PagingController::complete`] did with a fetch outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// The page was appended.
    Applied { appended: usize, has_more: bool },
    /// The fetch failed; the error is stored in the load state.
    Failed,
    /// The request belongs to a superseded session or was already settled.
    Stale,
}

/// What the renderer should show for the current collection and load state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewState {
    /// First page in flight, nothing to show yet.
    Loading,
    /// First page failed; show a full error with a retry action.
    Failed { message: String },
    /// Upstream exhausted without a single matching event.
    Empty,
    /// Rows are available. `notice` carries a failed follow-up page.
    Ready {
        loading_more: bool,
        notice: Option<String>,
    },
}

#[derive(Debug, Clone, Copy)]
struct Session {
    filter: FilterConfig,
    range: TimeRange,
}

/// Owns the event collection and decides when and what to fetch.
#[derive(Debug)]
pub struct PagingController {
    page_size: usize,
    session: Option<Session>,
    events: Vec<Event>,
    state: LoadState,
    next_offset: usize,
    generation: u64,
    /// Last request issued in the current generation.
    last_request: Option<FetchRequest>,
}

impl PagingController {
    /// Create an idle controller. Nothing is fetched until [`reset`](Self::reset).
    #[must_use]
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            session: None,
            events: Vec::new(),
            state: LoadState::default(),
            next_offset: 0,
            generation: 0,
            last_request: None,
        }
    }

    /// Start a new filter session and return its first request.
    ///
    /// Clears the collection and error, marks the controller as loading, and
    /// makes any outstanding request stale.
    pub fn reset(&mut self, filter: FilterConfig, now: DateTime<Utc>) -> FetchRequest {
        let range = filter.time_range(now);
        self.generation += 1;
        self.session = Some(Session { filter, range });
        self.events.clear();
        self.next_offset = 0;
        self.state = LoadState {
            is_loading: true,
            error: None,
            has_more: true,
        };
        info!(
            generation = self.generation,
            min_magnitude = filter.min_magnitude,
            window_days = filter.window_days,
            "paging reset"
        );
        self.issue()
    }

    /// Request the next page unless a fetch is in flight or the upstream is
    /// exhausted.
    ///
    /// After a failure the next page is still at the failed offset, so a
    /// later trigger repeats it. A stored error stays visible until that
    /// request settles.
    ///
    /// O(1); safe to call on every window recomputation.
    pub fn maybe_load_more(&mut self) -> Option<FetchRequest> {
        if self.session.is_none() || self.state.is_loading || !self.state.has_more {
            return None;
        }
        self.state.is_loading = true;
        Some(self.issue())
    }

    /// Repeat the last failed request at the same offset.
    pub fn retry(&mut self) -> Option<FetchRequest> {
        if self.state.is_loading || self.state.error.is_none() {
            return None;
        }
        let request = self.last_request?;
        self.state.error = None;
        self.state.is_loading = true;
        debug!(
            generation = request.generation,
            offset = request.query.offset,
            "retrying page"
        );
        Some(request)
    }

    /// Apply the outcome of `request`.
    pub fn complete(
        &mut self,
        request: &FetchRequest,
        result: Result<Vec<Event>, FetchError>,
    ) -> Completion {
        if request.generation != self.generation
            || !self.state.is_loading
            || self.last_request.as_ref() != Some(request)
        {
            debug!(
                generation = request.generation,
                current = self.generation,
                offset = request.query.offset,
                "discarding stale page"
            );
            return Completion::Stale;
        }
        self.state.is_loading = false;

        let page = match result {
            Ok(page) => page,
            Err(err) => {
                warn!(
                    offset = request.query.offset,
                    status = err.status,
                    error = %err,
                    "page fetch failed"
                );
                self.state.error = Some(err.to_string());
                return Completion::Failed;
            }
        };

        let previous_oldest = self.events.last().map(|e| e.timestamp_ms);
        if let Err(violation) = check_page_order(previous_oldest, &page) {
            warn!(offset = request.query.offset, %violation, "page breaks time ordering");
        }

        let unfiltered = page.len();
        let min_magnitude = self.filter().min_magnitude;
        let before = self.events.len();
        self.events
            .extend(page.into_iter().filter(|e| e.meets_magnitude(min_magnitude)));
        let appended = self.events.len() - before;

        self.next_offset = request.query.offset + request.query.limit;
        self.state.error = None;
        self.state.has_more = unfiltered >= request.query.limit;
        info!(
            offset = request.query.offset,
            unfiltered,
            appended,
            total = self.events.len(),
            has_more = self.state.has_more,
            "page applied"
        );
        Completion::Applied {
            appended,
            has_more: self.state.has_more,
        }
    }

    fn issue(&mut self) -> FetchRequest {
        let range = self.session.map(|s| s.range).unwrap_or(TimeRange::new(0, 0));
        let request = FetchRequest {
            generation: self.generation,
            query: PageQuery::new(range, self.page_size, self.next_offset),
        };
        debug!(
            generation = request.generation,
            offset = request.query.offset,
            limit = request.query.limit,
            "page requested"
        );
        self.last_request = Some(request);
        request
    }

    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    #[must_use]
    pub fn load_state(&self) -> &LoadState {
        &self.state
    }

    /// Filter of the current session, or the default before the first reset.
    #[must_use]
    pub fn filter(&self) -> FilterConfig {
        self.session.map(|s| s.filter).unwrap_or_default()
    }

    #[must_use]
    pub fn time_range(&self) -> Option<TimeRange> {
        self.session.map(|s| s.range)
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Unfiltered upstream offset of the next page.
    #[must_use]
    pub fn next_offset(&self) -> usize {
        self.next_offset
    }

    #[must_use]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    #[must_use]
    pub fn view_state(&self) -> ViewState {
        let state = &self.state;
        if self.events.is_empty() {
            if let Some(message) = &state.error {
                return ViewState::Failed {
                    message: message.clone(),
                };
            }
            if state.is_loading || (self.session.is_some() && state.has_more) {
                return ViewState::Loading;
            }
            return ViewState::Empty;
        }
        ViewState::Ready {
            loading_more: state.is_loading,
            notice: state.error.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    fn page(start: usize, len: usize, magnitude: f64) -> Vec<Event> {
        (start..start + len)
            .map(|i| Event::new(format!("ev{i}"), 1_000_000 - i as i64).with_magnitude(magnitude))
            .collect()
    }

    fn loaded(page_size: usize) -> PagingController {
        let mut paging = PagingController::new(page_size);
        let first = paging.reset(FilterConfig::default(), now());
        paging.complete(&first, Ok(page(0, page_size, 3.0)));
        paging
    }

    #[test]
    fn reset_issues_first_page() {
        let mut paging = PagingController::new(50);
        let request = paging.reset(FilterConfig::default(), now());
        assert_eq!(request.query.offset, 0);
        assert_eq!(request.query.limit, 50);
        assert_eq!(request.generation, 1);
        assert!(paging.load_state().is_loading);
        assert!(paging.load_state().has_more);
        assert_eq!(paging.view_state(), ViewState::Loading);
        assert_eq!(
            paging.time_range(),
            Some(FilterConfig::default().time_range(now()))
        );
    }

    #[test]
    fn reset_with_oversized_window_starts_at_earliest_instant() {
        let mut paging = PagingController::new(50);
        let request = paging.reset(FilterConfig::new(2.5, 4_000_000_000), now());
        assert_eq!(
            request.query.range.start_ms,
            DateTime::<Utc>::MIN_UTC.timestamp_millis()
        );
        assert_eq!(request.query.range.end_ms, now().timestamp_millis());
    }

    #[test]
    fn nothing_happens_before_reset() {
        let mut paging = PagingController::new(50);
        assert_eq!(paging.maybe_load_more(), None);
        assert_eq!(paging.retry(), None);
        assert_eq!(paging.view_state(), ViewState::Empty);
    }

    #[test]
    fn duplicate_triggers_issue_one_fetch() {
        let mut paging = loaded(50);
        assert!(paging.maybe_load_more().is_some());
        assert_eq!(paging.maybe_load_more(), None);
        assert_eq!(paging.maybe_load_more(), None);
    }

    #[test]
    fn offset_advances_by_page_size_not_filtered_count() {
        let mut paging = PagingController::new(50);
        let first = paging.reset(FilterConfig::new(4.0, 30), now());
        let mut events = page(0, 25, 3.0);
        events.extend(page(25, 25, 5.0));

        let completion = paging.complete(&first, Ok(events));
        assert_eq!(
            completion,
            Completion::Applied {
                appended: 25,
                has_more: true
            }
        );
        assert_eq!(paging.len(), 25);
        assert_eq!(paging.next_offset(), 50);
        assert_eq!(paging.maybe_load_more().unwrap().query.offset, 50);
    }

    #[test]
    fn fully_filtered_full_page_keeps_loading() {
        let mut paging = PagingController::new(10);
        let first = paging.reset(FilterConfig::new(6.0, 30), now());
        paging.complete(&first, Ok(page(0, 10, 2.5)));
        assert!(paging.is_empty());
        assert!(paging.load_state().has_more);
        assert_eq!(paging.view_state(), ViewState::Loading);
        assert!(paging.maybe_load_more().is_some());
    }

    #[test]
    fn short_page_ends_pagination() {
        let mut paging = loaded(50);
        let next = paging.maybe_load_more().unwrap();
        paging.complete(&next, Ok(page(50, 12, 3.0)));

        assert!(!paging.load_state().has_more);
        assert_eq!(paging.len(), 62);
        for _ in 0..5 {
            assert_eq!(paging.maybe_load_more(), None);
        }
    }

    #[test]
    fn empty_first_page_is_empty_state_not_error() {
        let mut paging = PagingController::new(50);
        let first = paging.reset(FilterConfig::default(), now());
        paging.complete(&first, Ok(Vec::new()));
        assert_eq!(paging.view_state(), ViewState::Empty);
        assert_eq!(paging.load_state().error, None);
    }

    #[test]
    fn stale_result_after_reset_is_ignored() {
        let mut paging = loaded(50);
        let outstanding = paging.maybe_load_more().unwrap();

        let fresh = paging.reset(FilterConfig::new(5.0, 7), now());
        assert_eq!(
            paging.complete(&outstanding, Ok(page(50, 50, 6.0))),
            Completion::Stale
        );
        assert!(paging.is_empty());
        assert!(paging.load_state().is_loading);

        paging.complete(&fresh, Ok(page(0, 3, 6.0)));
        assert_eq!(paging.len(), 3);
    }

    #[test]
    fn duplicate_completion_is_stale() {
        let mut paging = PagingController::new(50);
        let first = paging.reset(FilterConfig::default(), now());
        paging.complete(&first, Ok(page(0, 50, 3.0)));
        assert_eq!(
            paging.complete(&first, Ok(page(0, 50, 3.0))),
            Completion::Stale
        );
        assert_eq!(paging.len(), 50);
    }

    #[test]
    fn failure_preserves_collection_and_has_more() {
        let mut paging = loaded(50);
        let next = paging.maybe_load_more().unwrap();
        let completion = paging.complete(&next, Err(FetchError::with_status(502, "Bad Gateway")));

        assert_eq!(completion, Completion::Failed);
        assert_eq!(paging.len(), 50);
        let state = paging.load_state();
        assert!(!state.is_loading);
        assert!(state.has_more);
        assert_eq!(
            state.error.as_deref(),
            Some("fetch failed with status 502: Bad Gateway")
        );
        assert_eq!(
            paging.view_state(),
            ViewState::Ready {
                loading_more: false,
                notice: state.error.clone()
            }
        );
    }

    #[test]
    fn next_trigger_after_failure_repeats_the_offset() {
        let mut paging = loaded(50);
        let next = paging.maybe_load_more().unwrap();
        paging.complete(&next, Err(FetchError::new("timeout")));
        let state = paging.load_state();
        assert!(!state.is_loading);
        assert!(state.has_more);
        assert!(state.error.is_some());

        let again = paging.maybe_load_more().unwrap();
        assert_eq!(again, next);
        assert!(paging.load_state().is_loading);
        assert_eq!(paging.maybe_load_more(), None);
        assert_eq!(paging.retry(), None);
        assert_eq!(
            paging.view_state(),
            ViewState::Ready {
                loading_more: true,
                notice: Some("fetch failed: timeout".to_string())
            }
        );

        paging.complete(&again, Ok(page(50, 50, 3.0)));
        assert_eq!(paging.len(), 100);
        assert_eq!(paging.next_offset(), 100);
        assert_eq!(paging.load_state().error, None);
    }

    #[test]
    fn retry_repeats_the_failed_request() {
        let mut paging = loaded(50);
        let next = paging.maybe_load_more().unwrap();
        paging.complete(&next, Err(FetchError::new("timeout")));

        let again = paging.retry().unwrap();
        assert_eq!(again, next);
        assert!(paging.load_state().is_loading);
        assert_eq!(paging.load_state().error, None);
        assert_eq!(paging.retry(), None);
        assert_eq!(paging.maybe_load_more(), None);

        paging.complete(&again, Ok(page(50, 50, 3.0)));
        assert_eq!(paging.len(), 100);
    }

    #[test]
    fn initial_failure_is_full_state_error() {
        let mut paging = PagingController::new(50);
        let first = paging.reset(FilterConfig::default(), now());
        paging.complete(&first, Err(FetchError::new("offline")));
        assert_eq!(
            paging.view_state(),
            ViewState::Failed {
                message: "fetch failed: offline".to_string()
            }
        );
        let retry = paging.retry().unwrap();
        assert_eq!(retry.query.offset, 0);
        assert_eq!(paging.view_state(), ViewState::Loading);
    }

    #[test]
    fn appended_events_keep_arrival_order() {
        let mut paging = loaded(3);
        let next = paging.maybe_load_more().unwrap();
        paging.complete(&next, Ok(page(3, 3, 3.0)));
        let ids: Vec<&str> = paging.events().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["ev0", "ev1", "ev2", "ev3", "ev4", "ev5"]);
    }

    #[test]
    fn out_of_order_page_is_appended_as_is() {
        let mut paging = loaded(2);
        let next = paging.maybe_load_more().unwrap();
        let newer = vec![Event::new("late", 2_000_000).with_magnitude(3.0)];
        paging.complete(&next, Ok(newer));
        assert_eq!(paging.events().last().unwrap().id, "late");
    }
}
