//! Pixel-center aligned placement of rendered rasters.
//!
//! The `bounds` carried by a grid describe the extent reported by the source,
//! which does not coincide with the sample positions. A raster placed with
//! those bounds is visibly offset. Overlay bounds are derived from the
//! coordinate arrays instead, extended by half a cell on every side so that
//! pixel centers land on the grid samples.

use serde::{Deserialize, Serialize};

use crate::types::{max_of, min_of, Grid};

/// Geographic extent of an overlay raster.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoBounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl GeoBounds {
    /// Geographic position of the center of raster pixel (`x`, `y`).
    ///
    /// Row 0 is the northern edge. Returns `(lat, lon)`.
    pub fn pixel_center(&self, x: u32, y: u32, width: u32, height: u32) -> (f64, f64) {
        let fx = (x as f64 + 0.5) / width as f64;
        let fy = (y as f64 + 0.5) / height as f64;
        let lon = self.min_lon + fx * (self.max_lon - self.min_lon);
        let lat = self.max_lat - fy * (self.max_lat - self.min_lat);
        (lat, lon)
    }

    /// Image corners as `[lon, lat]`: top-left, top-right, bottom-right, bottom-left.
    pub fn corners(&self) -> [[f64; 2]; 4] {
        [
            [self.min_lon, self.max_lat],
            [self.max_lon, self.max_lat],
            [self.max_lon, self.min_lat],
            [self.min_lon, self.min_lat],
        ]
    }
}

/// Half-cell extended extent of one axis.
///
/// A single-sample axis has no step; it falls back to the nominal extent.
fn axis_extent(axis: &[f32], nominal: (f32, f32)) -> (f64, f64) {
    let min = min_of(axis) as f64;
    let max = max_of(axis) as f64;

    if axis.len() < 2 {
        return (nominal.0 as f64, nominal.1 as f64);
    }

    let step = (max - min) / (axis.len() - 1) as f64;
    (min - step / 2.0, max + step / 2.0)
}

/// Overlay bounds for `grid`, aligned to its sample coordinates.
pub fn compute_bounds(grid: &Grid) -> GeoBounds {
    let nominal = grid.bounds();
    let (min_lat, max_lat) = axis_extent(grid.lat(), (nominal.min_lat, nominal.max_lat));
    let (min_lon, max_lon) = axis_extent(grid.lon(), (nominal.min_lon, nominal.max_lon));

    GeoBounds {
        min_lat,
        max_lat,
        min_lon,
        max_lon,
    }
}
