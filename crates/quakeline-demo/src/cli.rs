#![forbid(unsafe_code)]

use std::io::Write;
use std::path::PathBuf;
use std::rc::Rc;

use chrono::Utc;
use clap::{Parser, ValueEnum};
use quakeline_core::{DataSource, MAGNITUDE_PRESETS};
use quakeline_runtime::{HeadlessViewport, ManualFrameScheduler, Timeline, TimelineConfig, ViewState};
use quakeline_source::{FallbackSource, MockSource, UsgsSource};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{DemoError, Result};
use crate::render::render_snapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceKind {
    /// Generated offline catalog.
    Mock,
    /// Live USGS catalog.
    Usgs,
    /// USGS, falling back to the mock catalog on failure.
    Auto,
}

#[derive(Debug, Parser)]
#[command(
    name = "quakeline",
    about = "Scroll a virtualized earthquake timeline headlessly",
    version
)]
pub struct Cli {
    /// TOML or JSON timeline configuration.
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = SourceKind::Mock)]
    pub source: SourceKind,

    /// Override the configured magnitude floor.
    #[arg(long)]
    pub min_magnitude: Option<f64>,

    /// Override the configured time window, in days.
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub window_days: Option<u32>,

    #[arg(long)]
    pub page_size: Option<usize>,

    /// Frames to simulate.
    #[arg(long, default_value_t = 10)]
    pub frames: u32,

    /// Pixels scrolled per frame.
    #[arg(long, default_value_t = 960.0)]
    pub scroll_step: f64,

    /// Scroll signals emitted per frame; they coalesce into one recompute.
    #[arg(long, default_value_t = 4, value_parser = clap::value_parser!(u32).range(1..))]
    pub signals_per_frame: u32,

    /// Retries of a failed page before giving up.
    #[arg(long, default_value_t = 2)]
    pub retries: u32,

    /// Seed of the mock catalog.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Characters of the place name shown per row.
    #[arg(long, default_value_t = 28)]
    pub place_width: usize,

    /// Print the final summary as JSON instead of rendering frames.
    #[arg(long)]
    pub json: bool,
}

/// Outcome of a headless run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub frames: u32,
    pub loaded: usize,
    pub has_more: bool,
    pub fetches: usize,
    pub recomputes: u64,
    pub superseded: u64,
    pub first_visible: Option<String>,
    pub min_magnitude: f64,
    pub window_days: u32,
}

pub fn run_from_env() -> Result<()> {
    let cli = Cli::parse();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    run(cli, &mut out).map(|_| ())
}

/// Resolve the configuration: file (or defaults), then CLI overrides.
pub fn resolve_config(cli: &Cli) -> Result<TimelineConfig> {
    let mut config = match &cli.config {
        Some(path) => TimelineConfig::load(path)?,
        None => TimelineConfig::default(),
    };
    if let Some(min_magnitude) = cli.min_magnitude {
        config.filter.min_magnitude = min_magnitude;
    }
    if let Some(window_days) = cli.window_days {
        config.filter.window_days = window_days;
    }
    if let Some(page_size) = cli.page_size {
        config.page_size = page_size;
    }
    if !MAGNITUDE_PRESETS.contains(&config.filter.min_magnitude) {
        warn!(
            min_magnitude = config.filter.min_magnitude,
            "magnitude floor is not one of the presets"
        );
    }
    Ok(config.validated()?)
}

fn build_source(cli: &Cli) -> Result<Box<dyn DataSource>> {
    let mut mock = MockSource::new();
    if let Some(seed) = cli.seed {
        mock = mock.with_seed(seed);
    }
    Ok(match cli.source {
        SourceKind::Mock => Box::new(mock),
        SourceKind::Usgs => Box::new(UsgsSource::new()?),
        SourceKind::Auto => Box::new(FallbackSource::new(UsgsSource::new()?, mock)),
    })
}

/// Drive the timeline for `cli.frames` frames, writing to `out`.
pub fn run(cli: Cli, out: &mut impl Write) -> Result<RunSummary> {
    if !cli.scroll_step.is_finite() {
        return Err(DemoError::invalid("--scroll-step must be finite"));
    }
    let config = resolve_config(&cli)?;
    let source = build_source(&cli)?;
    run_with_source(&cli, &config, source, out)
}

/// [`run`] against an explicit source.
pub fn run_with_source<S: DataSource>(
    cli: &Cli,
    config: &TimelineConfig,
    source: S,
    out: &mut impl Write,
) -> Result<RunSummary> {
    let scheduler = Rc::new(ManualFrameScheduler::new());
    let timeline = Timeline::new(config, source, scheduler.clone());
    let viewport = Rc::new(HeadlessViewport::new(f64::from(config.viewport_height)));
    let attachment = timeline.attach(viewport.clone());

    info!(
        source = ?cli.source,
        min_magnitude = config.filter.min_magnitude,
        window_days = config.filter.window_days,
        frames = cli.frames,
        "headless run starting"
    );
    timeline.start();

    let mut fetches = 0;
    let mut retries_left = cli.retries;
    let step = cli.scroll_step / f64::from(cli.signals_per_frame);

    for frame in 0..cli.frames {
        for _ in 0..cli.signals_per_frame {
            viewport.scroll_by(step);
        }
        scheduler.run_frame();
        fetches += timeline.run_until_idle(8);

        while timeline.load_state().error.is_some() && retries_left > 0 {
            retries_left -= 1;
            if !timeline.retry() {
                break;
            }
            fetches += timeline.run_until_idle(8);
        }

        let snapshot = timeline.snapshot();
        if let ViewState::Failed { message } = &snapshot.view {
            return Err(DemoError::InitialLoad {
                attempts: cli.retries - retries_left + 1,
                message: message.clone(),
            });
        }
        if !cli.json {
            render_snapshot(out, frame, &snapshot, Utc::now().timestamp_millis(), cli.place_width)?;
        }
    }

    let coordinator = timeline.coordinator();
    let summary = RunSummary {
        frames: cli.frames,
        loaded: timeline.len(),
        has_more: timeline.load_state().has_more,
        fetches,
        recomputes: coordinator.recompute_count(),
        superseded: coordinator.superseded_count(),
        first_visible: timeline.snapshot().visible.first().map(|e| e.id.clone()),
        min_magnitude: config.filter.min_magnitude,
        window_days: config.filter.window_days,
    };
    attachment.detach();

    if cli.json {
        serde_json::to_writer_pretty(&mut *out, &summary)?;
        writeln!(out)?;
    } else {
        writeln!(
            out,
            "== {} rows loaded in {} fetches, has_more={}, {} recomputes ({} signals coalesced)",
            summary.loaded, summary.fetches, summary.has_more, summary.recomputes, summary.superseded
        )?;
    }
    info!(loaded = summary.loaded, fetches = summary.fetches, "headless run finished");
    Ok(summary)
}
