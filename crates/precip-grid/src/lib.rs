//! Precipitation grid model and pure grid operations.
//!
//! This crate owns everything that works on a decoded grid without touching
//! a GPU or the network:
//!
//! - **Codec**: the compact little-endian wire format served by the grid
//!   endpoint (plus its JSON twin)
//! - **Queries**: nearest-cell sampling and polygon averaging
//! - **Georeferencing**: pixel-center aligned overlay bounds
//!
//! # Data flow
//!
//! ```text
//! HTTP body (application/octet-stream)
//!      │
//!      ▼
//! codec::decode ──► Grid ──┬─► query::nearest_value / polygon_average
//!                          │
//!                          ├─► renderer (texture packing, rasterization)
//!                          │
//!                          └─► georef::compute_bounds ──► map overlay
//! ```
//!
//! # Example
//!
//! ```
//! use precip_grid::{codec, query, Grid};
//!
//! let grid = Grid::from_data(vec![0.0, 1.0], vec![100.0, 101.0], vec![1.0, 2.0, 3.0, 4.0])?;
//! let bytes = codec::encode(&grid);
//! let decoded = codec::decode(&bytes)?;
//! assert_eq!(query::nearest_value(&decoded, 0.9, 100.2), Some(3.0));
//! # Ok::<(), precip_grid::GridError>(())
//! ```

pub mod codec;
pub mod error;
pub mod geometry;
pub mod georef;
pub mod query;
pub mod types;

pub use codec::{decode, decode_json, encode};
pub use error::{GridError, Result};
pub use geometry::{BoundingBox, Geometry, Position};
pub use georef::{compute_bounds, GeoBounds};
pub use query::{nearest_index, nearest_value, polygon_average, polygon_stats, AreaSummary};
pub use types::{is_valid, Bounds, Grid, GridStats, LatOrder, SENTINEL};
