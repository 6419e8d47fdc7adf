#![forbid(unsafe_code)]

//! Display-refresh scheduling.
//!
//! A [`FrameScheduler`] runs a task on the next refresh tick. The scroll
//! coordinator keeps at most one task scheduled: a newer request cancels the
//! older one, so a burst of scroll signals costs one recomputation per tick.
//!
//! [`ManualFrameScheduler`] is a single-slot implementation driven by the
//! host loop (or a test) calling [`ManualFrameScheduler::run_frame`].

use std::cell::{Cell, RefCell};

/// Work deferred to the next refresh tick.
pub type FrameTask = Box<dyn FnOnce()>;

/// Handle for cancelling a scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameTicket(u64);

impl FrameTicket {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn id(self) -> u64 {
        self.0
    }
}

/// Source of refresh ticks.
pub trait FrameScheduler {
    /// Schedule `task` for the next tick.
    fn request_frame(&self, task: FrameTask) -> FrameTicket;

    /// Cancel a task that has not run yet. Unknown or already-run tickets
    /// are ignored.
    fn cancel_frame(&self, ticket: FrameTicket);
}

/// Single-slot scheduler: a new request replaces whatever is pending.
#[derive(Default)]
pub struct ManualFrameScheduler {
    slot: RefCell<Option<(FrameTicket, FrameTask)>>,
    next_id: Cell<u64>,
    frames_run: Cell<u64>,
}

impl std::fmt::Debug for ManualFrameScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualFrameScheduler")
            .field("pending", &self.has_pending())
            .field("frames_run", &self.frames_run.get())
            .finish()
    }
}

impl ManualFrameScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.slot.borrow().is_some()
    }

    /// Tasks executed so far.
    #[must_use]
    pub fn frames_run(&self) -> u64 {
        self.frames_run.get()
    }

    /// Run the pending task, if any. Returns whether a task ran.
    ///
    /// The slot is emptied before the task runs, so the task may schedule
    /// the next frame.
    pub fn run_frame(&self) -> bool {
        let Some((_, task)) = self.slot.borrow_mut().take() else {
            return false;
        };
        task();
        self.frames_run.set(self.frames_run.get() + 1);
        true
    }
}

impl FrameScheduler for ManualFrameScheduler {
    fn request_frame(&self, task: FrameTask) -> FrameTicket {
        let ticket = FrameTicket(self.next_id.get());
        self.next_id.set(ticket.0 + 1);
        *self.slot.borrow_mut() = Some((ticket, task));
        ticket
    }

    fn cancel_frame(&self, ticket: FrameTicket) {
        let mut slot = self.slot.borrow_mut();
        if slot.as_ref().is_some_and(|(pending, _)| *pending == ticket) {
            *slot = None;
        }
    }
}
