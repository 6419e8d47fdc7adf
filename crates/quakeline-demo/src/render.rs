#![forbid(unsafe_code)]

//! Plain-text rendering of a [`RenderSnapshot`].

use std::io::Write;

use quakeline_core::{Event, MagnitudeClass};
use quakeline_core::format::{
    format_coordinates, format_depth, format_magnitude, format_relative_time, truncate_text,
};
use quakeline_runtime::{RenderSnapshot, ViewState};

/// One timeline row.
#[must_use]
pub fn render_row(index: usize, event: &Event, now_ms: i64, max_place_chars: usize) -> String {
    format!(
        "{index:>5}  M{:<4} {:<9} {:<width$}  {:<12} {:<22} {}",
        format_magnitude(event.magnitude),
        MagnitudeClass::from_magnitude(event.magnitude).label(),
        truncate_text(&event.location_label, max_place_chars),
        format_depth(event.depth_km),
        format_coordinates(event.longitude, event.latitude),
        format_relative_time(event.timestamp_ms, now_ms),
        width = max_place_chars + 3,
    )
}

/// Write the frame header and the visible rows.
pub fn render_snapshot(
    out: &mut impl Write,
    frame: u32,
    snapshot: &RenderSnapshot,
    now_ms: i64,
    max_place_chars: usize,
) -> std::io::Result<()> {
    let window = &snapshot.window;
    writeln!(
        out,
        "-- frame {frame}: rows {}..={} of {} (offset {}px, height {}px)",
        window.start_index,
        window.end_index,
        window.item_count,
        window.offset_y_px,
        window.total_height_px
    )?;
    match &snapshot.view {
        ViewState::Loading => writeln!(out, "   loading earthquakes...")?,
        ViewState::Empty => writeln!(out, "   no earthquakes match the current filter")?,
        ViewState::Failed { message } => writeln!(out, "   error: {message} (retry available)")?,
        ViewState::Ready {
            loading_more,
            notice,
        } => {
            for (offset, event) in snapshot.visible.iter().enumerate() {
                let index = window.start_index + offset;
                writeln!(out, "{}", render_row(index, event, now_ms, max_place_chars))?;
            }
            if *loading_more {
                writeln!(out, "   loading more...")?;
            }
            if let Some(notice) = notice {
                writeln!(out, "   notice: {notice}")?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use quakeline_core::window;
    use quakeline_runtime::LoadState;

    fn snapshot(view: ViewState, visible: Vec<Event>) -> RenderSnapshot {
        RenderSnapshot {
            window: window::compute(0.0, 96, 600, visible.len(), 5),
            visible,
            load_state: LoadState::default(),
            view,
        }
    }

    #[test]
    fn row_contains_every_label() {
        let event = Event::new("a", 0)
            .with_magnitude(5.4)
            .with_location("Central Chile")
            .with_coordinates(-71.2, -33.4, 35.0);
        let row = render_row(7, &event, 2 * 3_600_000, 20);
        assert!(row.starts_with("    7  M5.4"));
        assert!(row.contains("Moderate"));
        assert!(row.contains("Central Chile"));
        assert!(row.contains("35 km deep"));
        assert!(row.contains("-33.400°, -71.200°"));
        assert!(row.ends_with("2h ago"));
    }

    #[test]
    fn long_place_is_truncated() {
        let event = Event::new("a", 0).with_location("x".repeat(50));
        let row = render_row(0, &event, 0, 10);
        assert!(row.contains(&format!("{}...", "x".repeat(10))));
    }

    #[test]
    fn states_render_placeholders() {
        let mut out = Vec::new();
        render_snapshot(&mut out, 0, &snapshot(ViewState::Loading, Vec::new()), 0, 20).unwrap();
        render_snapshot(&mut out, 1, &snapshot(ViewState::Empty, Vec::new()), 0, 20).unwrap();
        let failed = ViewState::Failed {
            message: "offline".to_string(),
        };
        render_snapshot(&mut out, 2, &snapshot(failed, Vec::new()), 0, 20).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("loading earthquakes"));
        assert!(text.contains("no earthquakes match"));
        assert!(text.contains("error: offline"));
    }

    #[test]
    fn ready_renders_rows_and_notice() {
        let events = vec![Event::new("a", 0), Event::new("b", 0)];
        let view = ViewState::Ready {
            loading_more: true,
            notice: Some("fetch failed: timeout".to_string()),
        };
        let mut out = Vec::new();
        render_snapshot(&mut out, 3, &snapshot(view, events), 0, 20).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("-- frame 3: rows 0..=1 of 2"));
        assert_eq!(text.lines().filter(|l| l.contains(" M0.0")).count(), 2);
        assert!(text.contains("loading more..."));
        assert!(text.contains("notice: fetch failed: timeout"));
    }
}
