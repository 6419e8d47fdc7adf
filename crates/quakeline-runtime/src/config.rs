#![forbid(unsafe_code)]

//! Timeline configuration.
//!
//! Every tunable of the timeline lives in one [`TimelineConfig`] that can be
//! loaded from TOML or JSON at startup. Missing keys take the defaults below.
//!
//! ```toml
//! # quakeline.toml
//! item_height = 96
//! viewport_height = 600
//! overscan = 5
//! page_size = 50
//! load_more_threshold = 10
//!
//! [filter]
//! min_magnitude = 4.0
//! window_days = 7
//! ```

use std::path::Path;

use quakeline_core::{FilterConfig, MAX_WINDOW_DAYS, WindowGeometry};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tunables for the scroll coordinator and the paging controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    /// Fixed row height in pixels.
    pub item_height: u32,
    /// Initial viewport height in pixels; the attached viewport overrides it.
    pub viewport_height: u32,
    /// Rows rendered beyond each edge of the viewport.
    pub overscan: usize,
    /// Upstream records requested per fetch.
    pub page_size: usize,
    /// Load the next page once fewer rows than this remain past the window.
    pub load_more_threshold: usize,
    /// Filter applied to the first session.
    pub filter: FilterConfig,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            item_height: 96,
            viewport_height: 600,
            overscan: 5,
            page_size: 50,
            load_more_threshold: 10,
            filter: FilterConfig::default(),
        }
    }
}

/// Errors from loading a [`TimelineConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid TOML config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("config failed validation: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

impl TimelineConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(s)?)
    }

    /// Load from a file, picking the format from the extension (`.json`
    /// is JSON, anything else is TOML), and validate the result.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config = if path.extension().is_some_and(|ext| ext == "json") {
            Self::from_json_str(&content)?
        } else {
            Self::from_toml_str(&content)?
        };
        config.validated()
    }

    /// Serialize to TOML.
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string(self)
    }

    /// List every out-of-range parameter. Empty means valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.item_height == 0 {
            errors.push("item_height must be > 0".to_string());
        }
        if self.viewport_height == 0 {
            errors.push("viewport_height must be > 0".to_string());
        }
        if self.page_size == 0 {
            errors.push("page_size must be > 0".to_string());
        }
        if self.filter.window_days > MAX_WINDOW_DAYS {
            errors.push(format!(
                "filter.window_days must be <= {MAX_WINDOW_DAYS}, got {}",
                self.filter.window_days
            ));
        }
        if !self.filter.min_magnitude.is_finite() {
            errors.push(format!(
                "filter.min_magnitude must be finite, got {}",
                self.filter.min_magnitude
            ));
        }
        errors
    }

    /// `self` if valid, otherwise every violation.
    pub fn validated(self) -> Result<Self, ConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(ConfigError::Invalid(errors))
        }
    }

    #[must_use]
    pub fn geometry(&self) -> WindowGeometry {
        WindowGeometry::new(self.item_height, self.viewport_height, self.overscan)
    }
}
