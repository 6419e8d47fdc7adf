#![forbid(unsafe_code)]

//! Quakeline Source
//!
//! [`DataSource`](quakeline_core::DataSource) implementations:
//!
//! - [`UsgsSource`] - blocking client for the USGS FDSN event service
//! - [`MockSource`] - seeded offline catalog with a time-stamped cache
//! - [`FallbackSource`] - primary source with a fallback on failure
//!
//! All of them return pages newest first; see
//! [`check_page_order`](quakeline_core::check_page_order) for the contract.

pub mod error;
pub mod fallback;
pub mod geojson;
pub mod mock;
pub mod usgs;

pub use error::{Result, SourceError};
pub use fallback::FallbackSource;
pub use geojson::parse_events;
pub use mock::{Anchor, MockCache, MockSource, generate_events};
pub use usgs::{USGS_BASE_URL, UsgsSource};
