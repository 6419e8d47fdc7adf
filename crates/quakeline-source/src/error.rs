#![forbid(unsafe_code)]

use quakeline_core::FetchError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SourceError>;

/// Failures inside a catalog client, before they are flattened into
/// [`FetchError`] at the [`DataSource`](quakeline_core::DataSource) boundary.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("USGS API error: {status} {reason}")]
    Status { status: u16, reason: String },

    #[error("malformed GeoJSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid request URL: {message}")]
    InvalidUrl { message: String },
}

impl SourceError {
    /// HTTP status carried by the failure, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Http(err) => err.status().map(|s| s.as_u16()),
            Self::Json(_) | Self::InvalidUrl { .. } => None,
        }
    }
}

impl From<SourceError> for FetchError {
    fn from(err: SourceError) -> Self {
        let message = err.to_string();
        match err.status() {
            Some(status) => FetchError::with_status(status, message),
            None => FetchError::new(message),
        }
    }
}
