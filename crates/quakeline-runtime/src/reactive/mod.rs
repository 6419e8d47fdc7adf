#![forbid(unsafe_code)]

//! Reactive primitives used to publish derived state.

pub mod observable;

pub use observable::{Observable, Subscription};
