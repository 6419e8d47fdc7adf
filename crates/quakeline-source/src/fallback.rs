#![forbid(unsafe_code)]

use std::cell::Cell;

use quakeline_core::{DataSource, Event, FetchError, PageQuery};
use tracing::warn;

/// Serves pages from `primary`, falling back to `fallback` when it fails.
///
/// Only the primary's error is logged; a fallback failure is returned as is.
#[derive(Debug)]
pub struct FallbackSource<P, F> {
    primary: P,
    fallback: F,
    fallbacks_used: Cell<u64>,
}

impl<P, F> FallbackSource<P, F> {
    #[must_use]
    pub fn new(primary: P, fallback: F) -> Self {
        Self {
            primary,
            fallback,
            fallbacks_used: Cell::new(0),
        }
    }

    /// Pages served by the fallback so far.
    #[must_use]
    pub fn fallbacks_used(&self) -> u64 {
        self.fallbacks_used.get()
    }

    #[must_use]
    pub fn primary(&self) -> &P {
        &self.primary
    }

    #[must_use]
    pub fn fallback(&self) -> &F {
        &self.fallback
    }
}

impl<P: DataSource, F: DataSource> DataSource for FallbackSource<P, F> {
    fn fetch_page(&self, query: &PageQuery) -> Result<Vec<Event>, FetchError> {
        match self.primary.fetch_page(query) {
            Ok(page) => Ok(page),
            Err(err) => {
                warn!(
                    offset = query.offset,
                    status = err.status,
                    error = %err,
                    "primary source failed, serving fallback page"
                );
                self.fallbacks_used.set(self.fallbacks_used.get() + 1);
                self.fallback.fetch_page(query)
            }
        }
    }
}
