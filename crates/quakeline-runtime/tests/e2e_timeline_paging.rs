#![forbid(unsafe_code)]

//! End-to-end: viewport signals, window publication, paging, and teardown.
//!
//! Run:
//!   cargo test -p quakeline-runtime --test e2e_timeline_paging

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};
use quakeline_core::{DataSource, Event, FetchError, FilterConfig, PageQuery};
use quakeline_runtime::{
    Completion, HeadlessViewport, ManualFrameScheduler, Timeline, TimelineConfig, ViewState,
};
use tracing_subscriber::layer::SubscriberExt;

// ============================================================================
// Fixtures
// ============================================================================

type Page = Result<Vec<Event>, FetchError>;

/// Serves scripted pages in order and records every query.
#[derive(Default)]
struct ScriptedSource {
    pages: RefCell<VecDeque<Page>>,
    queries: RefCell<Vec<PageQuery>>,
}

impl ScriptedSource {
    fn with_pages(pages: impl IntoIterator<Item = Page>) -> Self {
        Self {
            pages: RefCell::new(pages.into_iter().collect()),
            queries: RefCell::new(Vec::new()),
        }
    }

    fn offsets(&self) -> Vec<usize> {
        self.queries.borrow().iter().map(|q| q.offset).collect()
    }
}

impl DataSource for ScriptedSource {
    fn fetch_page(&self, query: &PageQuery) -> Page {
        self.queries.borrow_mut().push(*query);
        self.pages
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

fn events(prefix: &str, start: usize, len: usize, magnitude: f64) -> Vec<Event> {
    (start..start + len)
        .map(|i| {
            Event::new(format!("{prefix}{i}"), 1_700_000_000_000 - i as i64 * 1000)
                .with_magnitude(magnitude)
        })
        .collect()
}

fn config(page_size: usize) -> TimelineConfig {
    TimelineConfig {
        page_size,
        load_more_threshold: 10,
        ..TimelineConfig::default()
    }
}

fn build(
    page_size: usize,
    source: ScriptedSource,
) -> (
    Timeline<ScriptedSource>,
    Rc<ManualFrameScheduler>,
    Rc<HeadlessViewport>,
) {
    let scheduler = Rc::new(ManualFrameScheduler::new());
    let timeline = Timeline::new(&config(page_size), source, scheduler.clone());
    let viewport = Rc::new(HeadlessViewport::new(600.0));
    (timeline, scheduler, viewport)
}

// ============================================================================
// Tracing capture
// ============================================================================

#[derive(Clone, Default)]
struct EventCapture {
    messages: Arc<Mutex<Vec<(tracing::Level, String)>>>,
}

struct MessageVisitor(Option<String>);

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.0 = Some(format!("{value:?}"));
        }
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for EventCapture {
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let mut visitor = MessageVisitor(None);
        event.record(&mut visitor);
        self.messages.lock().unwrap().push((
            *event.metadata().level(),
            visitor.0.unwrap_or_default(),
        ));
    }
}

fn capture<R>(f: impl FnOnce() -> R) -> (R, Vec<(tracing::Level, String)>) {
    let layer = EventCapture::default();
    let messages = Arc::clone(&layer.messages);
    let subscriber = tracing_subscriber::registry().with(layer);
    let result = tracing::subscriber::with_default(subscriber, f);
    let captured = messages.lock().unwrap().clone();
    (result, captured)
}

// ── 1. Window and paging ───────────────────────────────────────────────

#[test]
fn concrete_window_after_scroll() {
    let source = ScriptedSource::with_pages([Ok(events("a", 0, 1000, 3.0))]);
    let (timeline, scheduler, viewport) = build(1000, source);
    let _attachment = timeline.attach(viewport.clone());
    timeline.reset_at(FilterConfig::default(), now());
    timeline.pump();

    viewport.scroll_to(960.0);
    scheduler.run_frame();
    let snapshot = timeline.snapshot();
    assert_eq!(snapshot.window.start_index, 5);
    assert_eq!(snapshot.window.end_index, 21);
    assert_eq!(snapshot.window.total_height_px, 96_000);
    assert_eq!(snapshot.window.offset_y_px, 480);
    assert_eq!(snapshot.visible.len(), 17);
    assert_eq!(snapshot.visible[0].id, "a5");
}

#[test]
fn near_end_triggers_exactly_one_fetch() {
    let source = ScriptedSource::with_pages([
        Ok(events("a", 0, 50, 3.0)),
        Ok(events("a", 50, 50, 3.0)),
    ]);
    let (timeline, scheduler, viewport) = build(50, source);
    let _attachment = timeline.attach(viewport.clone());
    timeline.reset_at(FilterConfig::default(), now());
    timeline.pump();
    assert_eq!(timeline.pending_fetches(), 0);

    // end = floor((3500 + 600) / 96) + 5 = 47, 2 rows remain.
    for offset in [3400.0, 3450.0, 3500.0] {
        viewport.scroll_to(offset);
    }
    scheduler.run_frame();
    assert_eq!(timeline.pending_fetches(), 1);

    // Further scrolling while the fetch is queued adds nothing.
    viewport.scroll_to(3600.0);
    scheduler.run_frame();
    assert_eq!(timeline.pending_fetches(), 1);

    timeline.run_until_idle(5);
    assert_eq!(timeline.len(), 100);
    assert_eq!(timeline.source().offsets(), vec![0, 50]);
}

#[test]
fn filtered_pages_advance_by_page_size() {
    let mut mixed = events("lo", 0, 40, 2.6);
    mixed.extend(events("hi", 40, 10, 5.5));
    let source = ScriptedSource::with_pages([
        Ok(mixed),
        Ok(events("lo", 50, 50, 2.6)),
        Ok(events("hi", 100, 20, 5.1)),
    ]);
    let (timeline, _scheduler, _viewport) = build(50, source);
    timeline.reset_at(FilterConfig::new(5.0, 30), now());
    timeline.run_until_idle(10);

    assert_eq!(timeline.source().offsets(), vec![0, 50, 100]);
    assert_eq!(timeline.len(), 30);
    assert!(
        timeline
            .events()
            .iter()
            .all(|event| event.magnitude >= 5.0)
    );
    assert!(!timeline.load_state().has_more);
}

#[test]
fn exhausted_source_stops_requesting() {
    let source = ScriptedSource::with_pages([Ok(events("a", 0, 12, 3.0))]);
    let (timeline, scheduler, viewport) = build(50, source);
    let _attachment = timeline.attach(viewport.clone());
    timeline.reset_at(FilterConfig::default(), now());
    timeline.run_until_idle(10);

    for step in 0..30 {
        viewport.scroll_to(f64::from(step) * 100.0);
        scheduler.run_frame();
    }
    assert_eq!(timeline.pending_fetches(), 0);
    assert_eq!(timeline.source().offsets(), vec![0]);
}

#[test]
fn empty_collection_has_empty_slice_and_state() {
    let (timeline, scheduler, viewport) = build(50, ScriptedSource::default());
    let _attachment = timeline.attach(viewport.clone());
    timeline.reset_at(FilterConfig::default(), now());
    assert_eq!(timeline.snapshot().view, ViewState::Loading);
    timeline.run_until_idle(10);

    viewport.scroll_to(500.0);
    scheduler.run_frame();
    let snapshot = timeline.snapshot();
    assert!(snapshot.visible.is_empty());
    assert_eq!(snapshot.window.total_height_px, 0);
    assert_eq!(snapshot.view, ViewState::Empty);
}

// ── 2. Filter changes ──────────────────────────────────────────────────

#[test]
fn reset_during_outstanding_fetch_discards_late_result() {
    let source = ScriptedSource::default();
    let (timeline, _scheduler, _viewport) = build(50, source);
    timeline.reset_at(FilterConfig::new(2.5, 30), now());
    let outstanding = timeline.take_request().unwrap();

    timeline.reset_at(FilterConfig::new(5.0, 7), now());
    let fresh = timeline.take_request().unwrap();
    assert!(fresh.generation > outstanding.generation);

    let late = timeline.deliver(&outstanding, Ok(events("old", 0, 50, 6.0)));
    assert_eq!(late, Completion::Stale);
    assert!(timeline.is_empty());
    assert!(timeline.load_state().is_loading);

    timeline.deliver(&fresh, Ok(events("new", 0, 5, 6.0)));
    let ids: Vec<String> = timeline.events().into_iter().map(|e| e.id).collect();
    assert_eq!(ids, vec!["new0", "new1", "new2", "new3", "new4"]);
}

#[test]
fn reset_scrolls_window_back_to_fresh_collection() {
    let source = ScriptedSource::with_pages([
        Ok(events("a", 0, 50, 3.0)),
        Ok(events("b", 0, 3, 6.0)),
    ]);
    let (timeline, _scheduler, _viewport) = build(50, source);
    timeline.reset_at(FilterConfig::default(), now());
    timeline.pump();
    assert_eq!(timeline.coordinator().item_count(), 50);

    timeline.reset_at(FilterConfig::new(6.0, 1), now());
    assert_eq!(timeline.coordinator().item_count(), 0);
    timeline.pump();
    assert_eq!(timeline.coordinator().item_count(), 3);
    assert_eq!(timeline.snapshot().visible.len(), 3);
}

// ── 3. Errors ──────────────────────────────────────────────────────────

#[test]
fn initial_error_then_retry() {
    let source = ScriptedSource::with_pages([
        Err(FetchError::with_status(503, "Service Unavailable")),
        Ok(events("a", 0, 20, 3.0)),
    ]);
    let (timeline, _scheduler, _viewport) = build(50, source);
    timeline.reset_at(FilterConfig::default(), now());
    assert_eq!(timeline.pump(), Some(Completion::Failed));
    assert_eq!(
        timeline.snapshot().view,
        ViewState::Failed {
            message: "fetch failed with status 503: Service Unavailable".to_string()
        }
    );
    assert_eq!(timeline.pending_fetches(), 0);

    assert!(timeline.retry());
    assert!(!timeline.retry());
    timeline.run_until_idle(5);
    assert_eq!(timeline.len(), 20);
    assert_eq!(timeline.source().offsets(), vec![0, 0]);
}

#[test]
fn page_error_keeps_rows_and_shows_notice() {
    let source = ScriptedSource::with_pages([
        Ok(events("a", 0, 50, 3.0)),
        Err(FetchError::new("connection reset")),
        Ok(events("a", 50, 50, 3.0)),
    ]);
    let (timeline, scheduler, viewport) = build(50, source);
    let _attachment = timeline.attach(viewport.clone());
    timeline.reset_at(FilterConfig::default(), now());
    timeline.pump();

    viewport.scroll_to(4000.0);
    scheduler.run_frame();
    assert_eq!(timeline.pump(), Some(Completion::Failed));
    assert_eq!(timeline.len(), 50);
    assert_eq!(
        timeline.snapshot().view,
        ViewState::Ready {
            loading_more: false,
            notice: Some("fetch failed: connection reset".to_string()),
        }
    );

    // Nothing is re-requested until the window moves again.
    assert_eq!(timeline.pending_fetches(), 0);
    viewport.scroll_to(4100.0);
    scheduler.run_frame();
    assert_eq!(timeline.pending_fetches(), 1);
    assert!(!timeline.retry());

    timeline.pump();
    assert_eq!(timeline.len(), 100);
    assert_eq!(timeline.load_state().error, None);
    assert_eq!(timeline.source().offsets(), vec![0, 50, 50]);
}

#[test]
fn explicit_retry_after_page_error() {
    let source = ScriptedSource::with_pages([
        Ok(events("a", 0, 50, 3.0)),
        Err(FetchError::new("connection reset")),
        Ok(events("a", 50, 50, 3.0)),
    ]);
    let (timeline, scheduler, viewport) = build(50, source);
    let _attachment = timeline.attach(viewport.clone());
    timeline.reset_at(FilterConfig::default(), now());
    timeline.pump();

    viewport.scroll_to(4000.0);
    scheduler.run_frame();
    assert_eq!(timeline.pump(), Some(Completion::Failed));

    assert!(timeline.retry());
    timeline.pump();
    assert_eq!(timeline.len(), 100);
    assert_eq!(timeline.source().offsets(), vec![0, 50, 50]);
}

// ── 4. Teardown ────────────────────────────────────────────────────────

#[test]
fn frame_after_unmount_is_silent() {
    let source = ScriptedSource::with_pages([Ok(events("a", 0, 200, 3.0))]);
    let (timeline, scheduler, viewport) = build(200, source);
    let attachment = timeline.attach(viewport.clone());
    timeline.reset_at(FilterConfig::default(), now());
    timeline.pump();
    viewport.scroll_to(960.0);
    let version = timeline.coordinator().window_version();

    let (ran, captured) = capture(|| {
        viewport.unmount();
        scheduler.run_frame()
    });
    assert!(ran);
    assert!(captured.is_empty(), "unexpected events: {captured:?}");
    assert_eq!(timeline.coordinator().window_version(), version);

    drop(attachment);
    assert_eq!(viewport.listener_count(), 0);
}

#[test]
fn detach_then_scroll_schedules_nothing() {
    let (timeline, scheduler, viewport) = build(50, ScriptedSource::default());
    let attachment = timeline.attach(viewport.clone());
    viewport.scroll_to(300.0);
    attachment.detach();

    assert!(!scheduler.has_pending());
    viewport.scroll_to(600.0);
    assert!(!scheduler.has_pending());
    assert!(!timeline.coordinator().is_attached());
}

#[test]
fn stale_completion_is_logged_not_applied() {
    let (timeline, _scheduler, _viewport) = build(50, ScriptedSource::default());
    timeline.reset_at(FilterConfig::default(), now());
    let outstanding = timeline.take_request().unwrap();
    timeline.reset_at(FilterConfig::new(4.0, 30), now());

    let (completion, captured) =
        capture(|| timeline.deliver(&outstanding, Ok(events("x", 0, 10, 5.0))));
    assert_eq!(completion, Completion::Stale);
    assert!(
        captured
            .iter()
            .any(|(level, message)| *level == tracing::Level::DEBUG
                && message.contains("stale"))
    );
    assert!(timeline.is_empty());
}
