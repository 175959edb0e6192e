//! Error types for rendering.

use thiserror::Error;

/// Errors that can occur while rasterizing or encoding an overlay.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    /// No GPU adapter or device could be created.
    #[error("rasterizer unavailable: {0}")]
    RasterizerUnavailable(String),

    /// The GPU rejected a resource or command.
    #[error("GPU error: {0}")]
    Gpu(String),

    #[error("invalid render options: {0}")]
    InvalidOptions(String),

    #[error("encoding failed: {0}")]
    Encode(String),
}

impl RenderError {
    /// Create an InvalidOptions error.
    pub fn invalid_options(msg: impl Into<String>) -> Self {
        Self::InvalidOptions(msg.into())
    }

    /// Create a Gpu error.
    pub fn gpu(msg: impl Into<String>) -> Self {
        Self::Gpu(msg.into())
    }

    /// True when falling back to the CPU path makes sense.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::RasterizerUnavailable(_))
    }
}

/// Result type for rendering operations.
pub type Result<T> = std::result::Result<T, RenderError>;
