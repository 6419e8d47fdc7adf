#![forbid(unsafe_code)]

//! Quakeline Core
//!
//! Shared building blocks for the quakeline virtual timeline.
//!
//! # Key Components
//!
//! - [`Event`] - Immutable earthquake record as handed to the renderer
//! - [`FilterConfig`] - User-selected magnitude floor and time window
//! - [`window::compute`] - Pure index-range math for fixed-height virtualization
//! - [`DataSource`] - Page-fetching contract implemented by `quakeline-source`
//! - [`format`] - Stateless labels for dates, magnitudes and coordinates
//!
//! # Role in quakeline
//! `quakeline-core` has no I/O and no shared state. The runtime crate drives
//! these types from scroll signals and fetch completions; the source crate
//! produces [`Event`] pages.

pub mod event;
pub mod filter;
pub mod format;
pub mod source;
pub mod window;

pub use event::Event;
pub use filter::{FilterConfig, MAGNITUDE_PRESETS, MAX_WINDOW_DAYS, TimeRange};
pub use format::MagnitudeClass;
pub use source::{DataSource, FetchError, OrderViolation, PageQuery, check_page_order};
pub use window::{WindowGeometry, WindowState};
