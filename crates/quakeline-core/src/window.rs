#![forbid(unsafe_code)]

//! Fixed-height list windowing.
//!
//! Given a scroll offset, the item and viewport heights, and the number of
//! loaded items, [`compute`] returns the contiguous index range that has to
//! be materialized, widened by an overscan margin on both sides.
//!
//! # Invariants
//!
//! 1. `0 <= start_index <= end_index <= max(0, item_count - 1)`.
//! 2. `end_index - start_index + 1 <= ceil(viewport / item) + 2 * overscan + 1`.
//! 3. Increasing the scroll offset never decreases `start_index`.
//! 4. `item_count == 0` yields `start = end = 0` and a zero total height;
//!    [`WindowState::visible_range`] is then empty.
//!
//! # Performance
//!
//! O(1), allocation free. Safe to call on every scroll event.

use std::ops::Range;

/// Materialized index range plus the geometry the renderer needs to place it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowState {
    /// First materialized index (inclusive).
    pub start_index: usize,
    /// Last materialized index (inclusive). Equal to `start_index` when empty.
    pub end_index: usize,
    /// Translation applied to the rendered rows, `start_index * item_height`.
    pub offset_y_px: u64,
    /// Height of the full scrollable spacer, `item_count * item_height`.
    pub total_height_px: u64,
    /// Item count the window was computed against.
    pub item_count: usize,
}

impl WindowState {
    /// True when there is nothing to render.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.item_count == 0
    }

    /// Number of rows to render.
    #[must_use]
    pub fn len(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            self.end_index - self.start_index + 1
        }
    }

    /// Half-open index range to render.
    #[must_use]
    pub fn visible_range(&self) -> Range<usize> {
        if self.is_empty() {
            0..0
        } else {
            self.start_index..self.end_index + 1
        }
    }

    /// The rendered slice of `items`.
    ///
    /// Clamped to `items.len()` so a window computed against a stale count
    /// never indexes out of bounds.
    #[must_use]
    pub fn visible_slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let range = self.visible_range();
        let end = range.end.min(items.len());
        let start = range.start.min(end);
        &items[start..end]
    }

    /// Loaded items after the window, `item_count - 1 - end_index`.
    ///
    /// Negative only for an empty collection.
    #[inline]
    #[must_use]
    pub fn remaining_after_end(&self) -> i64 {
        self.item_count as i64 - 1 - self.end_index as i64
    }

    /// Fewer than `threshold_items` loaded items remain past the window.
    ///
    /// An empty collection is always near its end.
    #[inline]
    #[must_use]
    pub fn is_near_end(&self, threshold_items: usize) -> bool {
        self.remaining_after_end() < threshold_items as i64
    }
}

/// Compute the window for one set of inputs.
///
/// Non-finite or negative offsets are treated as 0. A zero `item_height` or
/// `viewport_height` is treated as 1px; configuration validation rejects
/// those values before they get here.
#[must_use]
pub fn compute(
    scroll_offset: f64,
    item_height: u32,
    viewport_height: u32,
    item_count: usize,
    overscan: usize,
) -> WindowState {
    let item_height = item_height.max(1);
    let viewport_height = viewport_height.max(1);
    let scroll_offset = if scroll_offset.is_finite() {
        scroll_offset.max(0.0)
    } else {
        0.0
    };

    let height = f64::from(item_height);
    let first_visible = (scroll_offset / height).floor() as usize;
    let last_visible = ((scroll_offset + f64::from(viewport_height)) / height).floor() as usize;

    let max_index = item_count.saturating_sub(1);
    let start_index = first_visible.saturating_sub(overscan).min(max_index);
    let end_index = last_visible
        .saturating_add(overscan)
        .clamp(start_index, max_index);

    WindowState {
        start_index,
        end_index,
        offset_y_px: (start_index as u64).saturating_mul(u64::from(item_height)),
        total_height_px: (item_count as u64).saturating_mul(u64::from(item_height)),
        item_count,
    }
}

/// Fixed geometry of a virtual list: row height, viewport height, overscan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowGeometry {
    pub item_height: u32,
    pub viewport_height: u32,
    pub overscan: usize,
}

impl Default for WindowGeometry {
    fn default() -> Self {
        Self {
            item_height: 96,
            viewport_height: 600,
            overscan: 5,
        }
    }
}

impl WindowGeometry {
    #[must_use]
    pub const fn new(item_height: u32, viewport_height: u32, overscan: usize) -> Self {
        Self {
            item_height,
            viewport_height,
            overscan,
        }
    }

    /// Same geometry with a different viewport height (after a resize).
    #[must_use]
    pub const fn with_viewport_height(mut self, viewport_height: u32) -> Self {
        self.viewport_height = viewport_height;
        self
    }

    /// Rows that fit in the viewport, rounded up.
    #[must_use]
    pub fn rows_per_viewport(&self) -> usize {
        self.viewport_height.max(1).div_ceil(self.item_height.max(1)) as usize
    }

    /// Upper bound on [`WindowState::len`] for this geometry.
    #[must_use]
    pub fn max_window_len(&self) -> usize {
        self.rows_per_viewport() + 2 * self.overscan + 1
    }

    #[must_use]
    pub fn compute(&self, scroll_offset: f64, item_count: usize) -> WindowState {
        compute(
            scroll_offset,
            self.item_height,
            self.viewport_height,
            item_count,
            self.overscan,
        )
    }
}
