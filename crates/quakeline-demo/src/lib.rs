#![forbid(unsafe_code)]

//! Headless driver for the quakeline timeline.
//!
//! Simulates a user scrolling through the catalog: scroll signals go to a
//! [`HeadlessViewport`](quakeline_runtime::HeadlessViewport), frames are run
//! by hand, and every frame's visible rows are printed.

pub mod cli;
pub mod error;
pub mod render;

pub use cli::{Cli, RunSummary, SourceKind, run, run_from_env, run_with_source};
pub use error::{DemoError, Result};
