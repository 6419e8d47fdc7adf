#![forbid(unsafe_code)]

use quakeline_runtime::ConfigError;
use quakeline_source::SourceError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DemoError>;

#[derive(Debug, Error)]
pub enum DemoError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("source error: {0}")]
    Source(#[from] SourceError),

    #[error("initial load failed after {attempts} attempt(s): {message}")]
    InitialLoad { attempts: u32, message: String },

    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },
}

impl DemoError {
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::InvalidArgument { .. } => 2,
            Self::InitialLoad { .. } => 3,
            _ => 1,
        }
    }

    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }
}
