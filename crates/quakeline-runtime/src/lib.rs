#![forbid(unsafe_code)]

//! Quakeline Runtime
//!
//! Stateful half of the quakeline virtual timeline.
//!
//! # Key Components
//!
//! - [`ScrollCoordinator`] - Coalesces viewport signals into one window
//!   recomputation per frame
//! - [`PagingController`] - I/O-free paging state machine with stale-result
//!   rejection
//! - [`Timeline`] - Wires the two together over a [`DataSource`]
//! - [`TimelineConfig`] - TOML/JSON configuration
//!
//! # Threading
//!
//! Everything here is single-threaded (`Rc`/`RefCell`). Viewport callbacks,
//! frame tasks and fetch deliveries all run on the host's loop.
//!
//! [`DataSource`]: quakeline_core::DataSource

pub mod config;
pub mod frame;
pub mod paging;
pub mod reactive;
pub mod scroll;
pub mod timeline;
pub mod viewport;

pub use config::{ConfigError, TimelineConfig};
pub use frame::{FrameScheduler, FrameTask, FrameTicket, ManualFrameScheduler};
pub use paging::{Completion, FetchRequest, LoadState, PagingController, ViewState};
pub use reactive::{Observable, Subscription};
pub use scroll::{Attachment, ScrollCoordinator};
pub use timeline::{RenderSnapshot, Timeline};
pub use viewport::{HeadlessViewport, ListenerId, Viewport, ViewportListener, ViewportSignal};
