#![forbid(unsafe_code)]

//! Scrollable viewport capability.
//!
//! The scroll coordinator never touches a concrete rendering surface. It is
//! handed a [`Viewport`] that can report its scroll offset and height and
//! notify registered listeners when either changes. Reads return `None` once
//! the viewport has been torn down.
//!
//! [`HeadlessViewport`] is an in-memory implementation for hosts without a
//! rendering surface (the demo binary, tests).

use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// What changed on the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewportSignal {
    Scrolled,
    Resized,
}

/// Listener registered on a viewport.
pub type ViewportListener = Rc<dyn Fn(ViewportSignal)>;

/// Registration handle returned by [`Viewport::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Observation capability over a scrollable surface.
pub trait Viewport {
    /// Current vertical scroll offset in pixels, or `None` if unmounted.
    fn scroll_offset(&self) -> Option<f64>;

    /// Current visible height in pixels, or `None` if unmounted.
    fn viewport_height(&self) -> Option<f64>;

    /// Register a listener for scroll and resize notifications.
    fn subscribe(&self, listener: ViewportListener) -> ListenerId;

    /// Remove a listener. Unknown ids are ignored.
    fn unsubscribe(&self, id: ListenerId);
}

/// In-memory viewport.
///
/// Setters notify listeners synchronously, in registration order.
pub struct HeadlessViewport {
    offset: Cell<f64>,
    height: Cell<f64>,
    mounted: Cell<bool>,
    listeners: RefCell<Vec<(ListenerId, ViewportListener)>>,
    next_id: Cell<u64>,
}

impl std::fmt::Debug for HeadlessViewport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeadlessViewport")
            .field("offset", &self.offset.get())
            .field("height", &self.height.get())
            .field("mounted", &self.mounted.get())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl HeadlessViewport {
    #[must_use]
    pub fn new(height: f64) -> Self {
        Self {
            offset: Cell::new(0.0),
            height: Cell::new(height),
            mounted: Cell::new(true),
            listeners: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
        }
    }

    /// Scroll to `offset` and notify listeners.
    pub fn scroll_to(&self, offset: f64) {
        self.offset.set(offset.max(0.0));
        self.emit(ViewportSignal::Scrolled);
    }

    /// Scroll by `delta` pixels and notify listeners.
    pub fn scroll_by(&self, delta: f64) {
        self.scroll_to(self.offset.get() + delta);
    }

    /// Change the visible height and notify listeners.
    pub fn resize(&self, height: f64) {
        self.height.set(height);
        self.emit(ViewportSignal::Resized);
    }

    /// Tear the viewport down. Later reads return `None`; registered
    /// listeners are kept until their owners unsubscribe.
    pub fn unmount(&self) {
        self.mounted.set(false);
    }

    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.mounted.get()
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    fn emit(&self, signal: ViewportSignal) {
        if !self.mounted.get() {
            return;
        }
        let listeners: Vec<ViewportListener> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, l)| Rc::clone(l))
            .collect();
        for listener in listeners {
            listener(signal);
        }
    }
}

impl Viewport for HeadlessViewport {
    fn scroll_offset(&self) -> Option<f64> {
        self.mounted.get().then(|| self.offset.get())
    }

    fn viewport_height(&self) -> Option<f64> {
        self.mounted.get().then(|| self.height.get())
    }

    fn subscribe(&self, listener: ViewportListener) -> ListenerId {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.listeners.borrow_mut().push((id, listener));
        id
    }

    fn unsubscribe(&self, id: ListenerId) {
        self.listeners.borrow_mut().retain(|(lid, _)| *lid != id);
    }
}
