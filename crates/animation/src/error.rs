//! Error types for grid sources and animation sessions.

use precip_grid::GridError;
use renderer::RenderError;
use thiserror::Error;

/// Failure to obtain the encoded bytes of a frame.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("grid endpoint returned {status} for {url}")]
    Status { status: u16, url: String },

    #[error("frame not found: {0}")]
    NotFound(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e.to_string())
    }
}

/// Errors raised by the sequencer and the sinks it drives.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnimationError {
    #[error("invalid frame range: from {from} is after to {to}")]
    InvalidRange { from: u32, to: u32 },

    #[error("fps must be a positive number, got {0}")]
    InvalidFps(f64),

    #[error("source error: {0}")]
    Source(#[from] SourceError),

    #[error("decode error: {0}")]
    Decode(#[from] GridError),

    #[error("render error: {0}")]
    Render(#[from] RenderError),
}

/// Result type for animation operations.
pub type Result<T> = std::result::Result<T, AnimationError>;
