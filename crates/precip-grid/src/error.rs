//! Error types for grid decoding and queries.

use thiserror::Error;

/// Errors raised for structurally invalid grid input.
///
/// "No data" is never reported through this type: queries return `None`
/// for cells that hold the sentinel or negative values.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GridError {
    /// The buffer ends before the header or the declared payload.
    #[error("malformed grid: buffer is {actual} bytes, expected at least {expected}")]
    BufferTooShort { expected: usize, actual: usize },

    /// A declared dimension is zero or negative.
    #[error("malformed grid: {field} must be positive, got {value}")]
    InvalidCount { field: &'static str, value: i32 },

    /// The declared dimensions describe a payload that cannot be addressed.
    #[error("malformed grid: {lat_count}x{lon_count} payload size overflows")]
    SizeOverflow { lat_count: i32, lon_count: i32 },

    /// Coordinate and value arrays disagree on the grid shape.
    #[error("malformed grid: {0}")]
    ShapeMismatch(String),

    /// A coordinate axis is not strictly monotonic, or longitudes decrease.
    /// `index` is the first sample out of order.
    #[error("malformed grid: {axis} axis is not strictly monotonic at index {index}")]
    NonMonotonicAxis { axis: &'static str, index: usize },

    /// A JSON grid document could not be parsed.
    #[error("malformed grid document: {0}")]
    InvalidDocument(String),

    /// A GeoJSON geometry could not be parsed or is not a polygon type.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),
}

impl GridError {
    /// Create a ShapeMismatch error.
    pub fn shape_mismatch(msg: impl Into<String>) -> Self {
        Self::ShapeMismatch(msg.into())
    }

    /// Create an InvalidGeometry error.
    pub fn invalid_geometry(msg: impl Into<String>) -> Self {
        Self::InvalidGeometry(msg.into())
    }

    /// True for errors describing a bad binary grid (header, size or shape).
    pub fn is_malformed(&self) -> bool {
        !matches!(self, Self::InvalidGeometry(_))
    }
}

/// Result type for grid operations.
pub type Result<T> = std::result::Result<T, GridError>;
