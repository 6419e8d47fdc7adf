#![forbid(unsafe_code)]

//! The virtual timeline: scroll coordination plus paging over a data source.
//!
//! [`Timeline`] wires a [`ScrollCoordinator`] to a [`PagingController`]:
//!
//! - every published window is checked against the load-more threshold and,
//!   when near the end, may enqueue the next [`FetchRequest`];
//! - every applied page updates the coordinator's item count.
//!
//! Fetches are queued rather than performed inline, so a window callback
//! never blocks on I/O. The host drains the queue with [`Timeline::pump`]
//! (fetch through the owned [`DataSource`]) or with
//! [`Timeline::take_request`] + [`Timeline::deliver`] when it performs the
//! fetch itself. Requests from a superseded filter session are discarded on
//! delivery.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use chrono::{DateTime, Utc};
use quakeline_core::{DataSource, Event, FetchError, FilterConfig, WindowState};
use tracing::{debug, info};

use crate::config::TimelineConfig;
use crate::frame::FrameScheduler;
use crate::paging::{Completion, FetchRequest, LoadState, PagingController, ViewState};
use crate::reactive::Subscription;
use crate::scroll::{Attachment, ScrollCoordinator};
use crate::viewport::Viewport;

/// Everything a renderer needs for one paint.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSnapshot {
    pub window: WindowState,
    /// Events in `window.start_index..=window.end_index`.
    pub visible: Vec<Event>,
    pub load_state: LoadState,
    pub view: ViewState,
}

struct TimelineShared {
    paging: RefCell<PagingController>,
    queue: RefCell<VecDeque<FetchRequest>>,
    threshold: usize,
}

impl TimelineShared {
    fn check_near_end(&self, window: &WindowState) {
        if !window.is_near_end(self.threshold) {
            return;
        }
        let request = match self.paging.try_borrow_mut() {
            Ok(mut paging) => paging.maybe_load_more(),
            Err(_) => return,
        };
        if let Some(request) = request {
            debug!(
                offset = request.query.offset,
                end = window.end_index,
                items = window.item_count,
                "near end, next page queued"
            );
            self.queue.borrow_mut().push_back(request);
        }
    }
}

/// Scroll-driven, paged view over a [`DataSource`].
pub struct Timeline<S> {
    source: S,
    coordinator: ScrollCoordinator,
    shared: Rc<TimelineShared>,
    initial_filter: FilterConfig,
    _window_sub: Subscription,
}

impl<S> std::fmt::Debug for Timeline<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Timeline")
            .field("coordinator", &self.coordinator)
            .field("loaded", &self.shared.paging.borrow().len())
            .field("queued", &self.shared.queue.borrow().len())
            .finish_non_exhaustive()
    }
}

impl<S: DataSource> Timeline<S> {
    /// Build an idle timeline. Call [`start`](Self::start) or
    /// [`reset`](Self::reset) to issue the first fetch.
    #[must_use]
    pub fn new(config: &TimelineConfig, source: S, scheduler: Rc<dyn FrameScheduler>) -> Self {
        let coordinator = ScrollCoordinator::new(config.geometry(), scheduler);
        let shared = Rc::new(TimelineShared {
            paging: RefCell::new(PagingController::new(config.page_size)),
            queue: RefCell::new(VecDeque::new()),
            threshold: config.load_more_threshold,
        });
        let hook = Rc::clone(&shared);
        let window_sub = coordinator.subscribe(move |window| hook.check_near_end(window));
        Self {
            source,
            coordinator,
            shared,
            initial_filter: config.filter,
            _window_sub: window_sub,
        }
    }

    /// Observe `viewport`; see [`ScrollCoordinator::attach`].
    pub fn attach(&self, viewport: Rc<dyn Viewport>) -> Attachment {
        self.coordinator.attach(viewport)
    }

    #[must_use]
    pub fn coordinator(&self) -> &ScrollCoordinator {
        &self.coordinator
    }

    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Begin the first session with the configured filter.
    pub fn start(&self) {
        self.reset(self.initial_filter);
    }

    /// Replace the filter, discarding loaded events and queued requests.
    pub fn reset(&self, filter: FilterConfig) {
        self.reset_at(filter, Utc::now());
    }

    /// [`reset`](Self::reset) with an explicit clock, for deterministic hosts.
    pub fn reset_at(&self, filter: FilterConfig, now: DateTime<Utc>) {
        let request = self.shared.paging.borrow_mut().reset(filter, now);
        {
            let mut queue = self.shared.queue.borrow_mut();
            let dropped = queue.len();
            queue.clear();
            queue.push_back(request);
            if dropped > 0 {
                debug!(dropped, "queued requests superseded by reset");
            }
        }
        self.coordinator.set_item_count(0);
        info!(
            generation = request.generation,
            min_magnitude = filter.min_magnitude,
            window_days = filter.window_days,
            "timeline reset"
        );
    }

    /// Pop the oldest queued request for a host that fetches on its own.
    pub fn take_request(&self) -> Option<FetchRequest> {
        self.shared.queue.borrow_mut().pop_front()
    }

    /// Hand a fetch outcome back. Stale outcomes change nothing.
    pub fn deliver(
        &self,
        request: &FetchRequest,
        result: Result<Vec<Event>, FetchError>,
    ) -> Completion {
        let (completion, len) = {
            let mut paging = self.shared.paging.borrow_mut();
            let completion = paging.complete(request, result);
            (completion, paging.len())
        };
        if let Completion::Applied { .. } = completion {
            self.coordinator.set_item_count(len);
            // A page that filtered down to nothing leaves the window as it
            // was, so no subscriber fires.
            self.shared
                .check_near_end(&self.coordinator.current_window());
        }
        completion
    }

    /// Fetch and deliver the oldest queued request.
    ///
    /// Returns `None` when nothing is queued.
    pub fn pump(&self) -> Option<Completion> {
        let request = self.take_request()?;
        let result = self.source.fetch_page(&request.query);
        Some(self.deliver(&request, result))
    }

    /// Pump until the queue is empty or `max_fetches` fetches ran.
    /// Returns the number of fetches performed.
    pub fn run_until_idle(&self, max_fetches: usize) -> usize {
        let mut fetches = 0;
        while fetches < max_fetches && self.pump().is_some() {
            fetches += 1;
        }
        fetches
    }

    /// Re-issue the failed request. Returns whether a request was queued.
    pub fn retry(&self) -> bool {
        let request = self.shared.paging.borrow_mut().retry();
        match request {
            Some(request) => {
                self.shared.queue.borrow_mut().push_back(request);
                true
            }
            None => false,
        }
    }

    /// Requests waiting to be fetched.
    #[must_use]
    pub fn pending_fetches(&self) -> usize {
        self.shared.queue.borrow().len()
    }

    #[must_use]
    pub fn snapshot(&self) -> RenderSnapshot {
        let window = self.coordinator.current_window();
        let paging = self.shared.paging.borrow();
        RenderSnapshot {
            window,
            visible: window.visible_slice(paging.events()).to_vec(),
            load_state: paging.load_state().clone(),
            view: paging.view_state(),
        }
    }

    #[must_use]
    pub fn load_state(&self) -> LoadState {
        self.shared.paging.borrow().load_state().clone()
    }

    #[must_use]
    pub fn filter(&self) -> FilterConfig {
        self.shared.paging.borrow().filter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.paging.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clone of every loaded event, in arrival order.
    #[must_use]
    pub fn events(&self) -> Vec<Event> {
        self.shared.paging.borrow().events().to_vec()
    }
}
