#![forbid(unsafe_code)]

//! Scroll coordination for the virtual timeline.
//!
//! [`ScrollCoordinator`] bridges a high-frequency [`Viewport`] to the pure
//! window math in [`quakeline_core::window`]. It owns the live scroll offset
//! and the current [`WindowState`], and republishes the window whenever the
//! offset, the viewport height, or the item count changes.
//!
//! # Coalescing
//!
//! Scroll and resize signals do not recompute anything by themselves. Each
//! signal (re)schedules a single frame task on the [`FrameScheduler`]; a
//! pending task is cancelled and replaced, never queued twice. When the task
//! runs it reads the viewport's *current* offset and height, so the published
//! window always reflects the newest position.
//!
//! # Teardown
//!
//! [`ScrollCoordinator::attach`] returns an [`Attachment`] that owns the
//! listener registration. Detaching (explicitly or by drop) unsubscribes the
//! listener and cancels the pending frame. A frame that still fires after the
//! viewport is gone is dropped without error or log output.
//!
//! # Invariants
//!
//! 1. At most one frame task is pending per coordinator.
//! 2. `current_window()` is always `compute(offset, geometry, item_count)`
//!    for the last observed offset and height.
//! 3. Subscribers are notified only when the window actually changes.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use quakeline_core::{WindowGeometry, WindowState};
use tracing::{debug, trace};

use crate::frame::{FrameScheduler, FrameTicket};
use crate::reactive::{Observable, Subscription};
use crate::viewport::{ListenerId, Viewport, ViewportSignal};

/// Owns the scroll position and the derived window.
///
/// Cloning produces another handle to the same coordinator.
#[derive(Clone)]
pub struct ScrollCoordinator {
    shared: Rc<Shared>,
}

struct Shared {
    state: RefCell<CoordinatorState>,
    window: Observable<WindowState>,
    scheduler: Rc<dyn FrameScheduler>,
}

struct CoordinatorState {
    geometry: WindowGeometry,
    scroll_offset: f64,
    item_count: usize,
    /// Viewport of the live attachment, if any.
    viewport: Option<Rc<dyn Viewport>>,
    /// Bumped on every attach and detach; frames and listeners carry the
    /// epoch they were created under and go inert once it moves on.
    epoch: u64,
    pending: Option<FrameTicket>,
    recomputes: u64,
    superseded: u64,
}

impl std::fmt::Debug for ScrollCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.borrow();
        f.debug_struct("ScrollCoordinator")
            .field("geometry", &state.geometry)
            .field("scroll_offset", &state.scroll_offset)
            .field("item_count", &state.item_count)
            .field("attached", &state.viewport.is_some())
            .field("pending", &state.pending)
            .field("window", &self.shared.window.get())
            .finish()
    }
}

impl ScrollCoordinator {
    /// Create a detached coordinator with an empty collection.
    ///
    /// The scheduler should be dedicated to this coordinator when it is a
    /// single-slot implementation such as
    /// [`ManualFrameScheduler`](crate::frame::ManualFrameScheduler).
    #[must_use]
    pub fn new(geometry: WindowGeometry, scheduler: Rc<dyn FrameScheduler>) -> Self {
        let window = Observable::new(geometry.compute(0.0, 0));
        Self {
            shared: Rc::new(Shared {
                state: RefCell::new(CoordinatorState {
                    geometry,
                    scroll_offset: 0.0,
                    item_count: 0,
                    viewport: None,
                    epoch: 0,
                    pending: None,
                    recomputes: 0,
                    superseded: 0,
                }),
                window,
                scheduler,
            }),
        }
    }

    /// Start observing `viewport`.
    ///
    /// Reads the viewport once synchronously so [`current_window`] is valid on
    /// return. Attaching while already attached makes the previous
    /// [`Attachment`] inert; its listener is removed when that guard goes.
    ///
    /// [`current_window`]: Self::current_window
    pub fn attach(&self, viewport: Rc<dyn Viewport>) -> Attachment {
        let (epoch, stale) = {
            let mut state = self.shared.state.borrow_mut();
            state.epoch += 1;
            state.viewport = Some(Rc::clone(&viewport));
            (state.epoch, state.pending.take())
        };
        if let Some(ticket) = stale {
            self.shared.scheduler.cancel_frame(ticket);
        }

        let weak = Rc::downgrade(&self.shared);
        let listener = viewport.subscribe(Rc::new(move |signal: ViewportSignal| {
            if let Some(shared) = weak.upgrade() {
                Shared::schedule_frame(&shared, epoch, signal);
            }
        }));
        debug!(listener = listener.0, epoch, "viewport attached");

        if let (Some(offset), Some(height)) = (viewport.scroll_offset(), viewport.viewport_height())
        {
            self.shared.observe(offset, height);
        }

        Attachment {
            shared: Rc::downgrade(&self.shared),
            viewport: Some(viewport),
            listener,
            epoch,
        }
    }

    /// Latest published window.
    #[must_use]
    pub fn current_window(&self) -> WindowState {
        self.shared.window.get()
    }

    /// Fewer than `threshold_items` loaded items remain past the window.
    #[must_use]
    pub fn on_near_end(&self, threshold_items: usize) -> bool {
        self.shared
            .window
            .with(|window| window.is_near_end(threshold_items))
    }

    /// Recompute against a new collection length.
    pub fn set_item_count(&self, item_count: usize) {
        {
            let mut state = self.shared.state.borrow_mut();
            if state.item_count == item_count {
                return;
            }
            state.item_count = item_count;
        }
        self.shared.recompute();
    }

    /// Call `callback` with every new window.
    pub fn subscribe(&self, callback: impl Fn(&WindowState) + 'static) -> Subscription {
        self.shared.window.subscribe(callback)
    }

    #[must_use]
    pub fn scroll_offset(&self) -> f64 {
        self.shared.state.borrow().scroll_offset
    }

    #[must_use]
    pub fn item_count(&self) -> usize {
        self.shared.state.borrow().item_count
    }

    #[must_use]
    pub fn geometry(&self) -> WindowGeometry {
        self.shared.state.borrow().geometry
    }

    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.shared.state.borrow().viewport.is_some()
    }

    #[must_use]
    pub fn has_pending_frame(&self) -> bool {
        self.shared.state.borrow().pending.is_some()
    }

    /// Window computations performed so far.
    #[must_use]
    pub fn recompute_count(&self) -> u64 {
        self.shared.state.borrow().recomputes
    }

    /// Scheduled frames replaced by a newer signal before they ran.
    #[must_use]
    pub fn superseded_count(&self) -> u64 {
        self.shared.state.borrow().superseded
    }

    /// Number of window changes published.
    #[must_use]
    pub fn window_version(&self) -> u64 {
        self.shared.window.version()
    }
}

impl Shared {
    fn schedule_frame(shared: &Rc<Self>, epoch: u64, signal: ViewportSignal) {
        let previous = {
            let mut state = shared.state.borrow_mut();
            if state.epoch != epoch || state.viewport.is_none() {
                return;
            }
            let previous = state.pending.take();
            if previous.is_some() {
                state.superseded += 1;
            }
            previous
        };
        if let Some(ticket) = previous {
            shared.scheduler.cancel_frame(ticket);
        }

        let weak = Rc::downgrade(shared);
        let ticket = shared.scheduler.request_frame(Box::new(move || {
            if let Some(shared) = weak.upgrade() {
                shared.run_frame(epoch);
            }
        }));
        trace!(?signal, ticket = ticket.id(), "frame scheduled");
        shared.state.borrow_mut().pending = Some(ticket);
    }

    fn run_frame(&self, epoch: u64) {
        let viewport = {
            let mut state = self.state.borrow_mut();
            if state.epoch != epoch {
                return;
            }
            state.pending = None;
            match &state.viewport {
                Some(viewport) => Rc::clone(viewport),
                None => return,
            }
        };
        let (Some(offset), Some(height)) = (viewport.scroll_offset(), viewport.viewport_height())
        else {
            return;
        };
        self.observe(offset, height);
    }

    fn observe(&self, offset: f64, height: f64) {
        {
            let mut state = self.state.borrow_mut();
            state.scroll_offset = if offset.is_finite() { offset.max(0.0) } else { 0.0 };
            if height.is_finite() && height >= 1.0 {
                state.geometry = state
                    .geometry
                    .with_viewport_height(height.round().min(f64::from(u32::MAX)) as u32);
            }
        }
        self.recompute();
    }

    fn recompute(&self) {
        let window = {
            let mut state = self.state.borrow_mut();
            state.recomputes += 1;
            state.geometry.compute(state.scroll_offset, state.item_count)
        };
        trace!(
            start = window.start_index,
            end = window.end_index,
            items = window.item_count,
            "window recomputed"
        );
        self.window.set(window);
    }
}

/// Live registration of a coordinator on a viewport.
///
/// [`detach`](Self::detach) consumes the guard, so the release runs exactly
/// once; dropping the guard releases as well.
#[must_use = "dropping an Attachment detaches the viewport immediately"]
pub struct Attachment {
    shared: Weak<Shared>,
    viewport: Option<Rc<dyn Viewport>>,
    listener: ListenerId,
    epoch: u64,
}

impl std::fmt::Debug for Attachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attachment")
            .field("listener", &self.listener)
            .field("epoch", &self.epoch)
            .field("released", &self.viewport.is_none())
            .finish()
    }
}

impl Attachment {
    /// Unsubscribe from the viewport and cancel any pending frame.
    pub fn detach(mut self) {
        self.release();
    }

    /// Whether this attachment is still the coordinator's current one.
    #[must_use]
    pub fn is_current(&self) -> bool {
        self.viewport.is_some()
            && self
                .shared
                .upgrade()
                .is_some_and(|shared| shared.state.borrow().epoch == self.epoch)
    }

    fn release(&mut self) {
        let Some(viewport) = self.viewport.take() else {
            return;
        };
        viewport.unsubscribe(self.listener);

        let Some(shared) = self.shared.upgrade() else {
            return;
        };
        let pending = {
            let mut state = shared.state.borrow_mut();
            if state.epoch != self.epoch {
                return;
            }
            state.epoch += 1;
            state.viewport = None;
            state.pending.take()
        };
        if let Some(ticket) = pending {
            shared.scheduler.cancel_frame(ticket);
        }
        debug!(listener = self.listener.0, "viewport detached");
    }
}

impl Drop for Attachment {
    fn drop(&mut self) {
        self.release();
    }
}
