//! Core grid types.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::error::{GridError, Result};

/// Reserved "no data" marker written by the data source.
pub const SENTINEL: f32 = -999.0;

/// Fixed legend scale reported by the data source (mm/day).
pub const FIXED_SCALE_MIN: f32 = 0.0;
pub const FIXED_SCALE_MAX: f32 = 100.0;

/// Returns true when a cell carries a usable magnitude.
///
/// The sentinel, any negative value and any non-finite value are "no data".
#[inline]
pub fn is_valid(value: f32) -> bool {
    value.is_finite() && value >= 0.0 && value != SENTINEL
}

/// Nominal extent reported by the data source.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bounds {
    pub min_lat: f32,
    pub max_lat: f32,
    pub min_lon: f32,
    pub max_lon: f32,
}

impl Bounds {
    pub fn new(min_lat: f32, max_lat: f32, min_lon: f32, max_lon: f32) -> Self {
        Self {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
        }
    }
}

/// Precomputed descriptive statistics used for legend scaling.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridStats {
    pub min: f32,
    pub max: f32,
    pub mean: f32,
    pub actual_min: f32,
    pub actual_max: f32,
}

impl GridStats {
    /// Compute statistics the way the data source does.
    ///
    /// `min`/`max` are the fixed legend scale; the remaining fields cover
    /// valid cells only and are 0 when there are none.
    pub fn from_values(values: &[f32]) -> Self {
        let mut count = 0usize;
        let mut sum = 0.0f64;
        let mut actual_min = f32::INFINITY;
        let mut actual_max = f32::NEG_INFINITY;

        for &v in values.iter().filter(|v| is_valid(**v)) {
            count += 1;
            sum += v as f64;
            actual_min = actual_min.min(v);
            actual_max = actual_max.max(v);
        }

        if count == 0 {
            return Self {
                min: FIXED_SCALE_MIN,
                max: FIXED_SCALE_MAX,
                ..Default::default()
            };
        }

        Self {
            min: FIXED_SCALE_MIN,
            max: FIXED_SCALE_MAX,
            mean: (sum / count as f64) as f32,
            actual_min,
            actual_max,
        }
    }
}

/// Direction of the latitude axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LatOrder {
    /// South to north: row 0 is the southernmost row.
    Ascending,
    /// North to south: row 0 is the northernmost row.
    Descending,
}

impl LatOrder {
    /// Detect the orientation of a latitude axis.
    ///
    /// A single-row axis has no direction and is treated as north-first.
    pub fn detect(lat: &[f32]) -> Self {
        match (lat.first(), lat.last()) {
            (Some(first), Some(last)) if first < last => Self::Ascending,
            _ => Self::Descending,
        }
    }
}

impl std::fmt::Display for LatOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ascending => write!(f, "ascending"),
            Self::Descending => write!(f, "descending"),
        }
    }
}

/// One decoded frame of the gridded field.
///
/// Values are stored row-major with one row per latitude. A `Grid` is never
/// mutated after construction; every frame or query gets its own instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    lat: Vec<f32>,
    lon: Vec<f32>,
    values: Vec<f32>,
    bounds: Bounds,
    stats: GridStats,
    time_index: i32,
    total_times: i32,
}

impl Grid {
    /// Build a grid from its parts, checking the shape invariants.
    pub fn new(
        lat: Vec<f32>,
        lon: Vec<f32>,
        values: Vec<f32>,
        bounds: Bounds,
        stats: GridStats,
    ) -> Result<Self> {
        if lat.is_empty() || lon.is_empty() {
            return Err(GridError::shape_mismatch(format!(
                "grid needs at least one row and column, got {}x{}",
                lat.len(),
                lon.len()
            )));
        }

        let expected = lat.len() * lon.len();
        if values.len() != expected {
            return Err(GridError::shape_mismatch(format!(
                "{} values for a {}x{} grid (expected {})",
                values.len(),
                lat.len(),
                lon.len(),
                expected
            )));
        }

        if let Some(index) = first_unordered(&lat, lat.first() > lat.last()) {
            return Err(GridError::NonMonotonicAxis { axis: "lat", index });
        }
        if let Some(index) = first_unordered(&lon, false) {
            return Err(GridError::NonMonotonicAxis { axis: "lon", index });
        }

        Ok(Self {
            lat,
            lon,
            values,
            bounds,
            stats,
            time_index: 0,
            total_times: 1,
        })
    }

    /// Build a grid from one vector per latitude row.
    pub fn from_rows(
        lat: Vec<f32>,
        lon: Vec<f32>,
        rows: Vec<Vec<f32>>,
        bounds: Bounds,
        stats: GridStats,
    ) -> Result<Self> {
        if rows.len() != lat.len() {
            return Err(GridError::shape_mismatch(format!(
                "{} rows for {} latitudes",
                rows.len(),
                lat.len()
            )));
        }
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != lon.len()) {
            return Err(GridError::shape_mismatch(format!(
                "row {} has {} values for {} longitudes",
                i,
                row.len(),
                lon.len()
            )));
        }

        let values = rows.into_iter().flatten().collect();
        Self::new(lat, lon, values, bounds, stats)
    }

    /// Build a grid whose bounds and stats are derived from the data.
    pub fn from_data(lat: Vec<f32>, lon: Vec<f32>, values: Vec<f32>) -> Result<Self> {
        let bounds = Bounds::new(
            min_of(&lat),
            max_of(&lat),
            min_of(&lon),
            max_of(&lon),
        );
        let stats = GridStats::from_values(&values);
        Self::new(lat, lon, values, bounds, stats)
    }

    /// Attach the time-axis position carried in the wire header.
    pub fn with_time(mut self, time_index: i32, total_times: i32) -> Self {
        self.time_index = time_index;
        self.total_times = total_times;
        self
    }

    pub fn lat(&self) -> &[f32] {
        &self.lat
    }

    pub fn lon(&self) -> &[f32] {
        &self.lon
    }

    /// Flat row-major values.
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn stats(&self) -> GridStats {
        self.stats
    }

    pub fn time_index(&self) -> i32 {
        self.time_index
    }

    pub fn total_times(&self) -> i32 {
        self.total_times
    }

    /// Number of latitude rows (N).
    pub fn height(&self) -> usize {
        self.lat.len()
    }

    /// Number of longitude columns (M).
    pub fn width(&self) -> usize {
        self.lon.len()
    }

    pub fn lat_order(&self) -> LatOrder {
        LatOrder::detect(&self.lat)
    }

    /// Values of latitude row `row`.
    pub fn row(&self, row: usize) -> Option<&[f32]> {
        if row >= self.height() {
            return None;
        }
        let start = row * self.width();
        Some(&self.values[start..start + self.width()])
    }

    /// Iterate rows in storage order.
    pub fn rows(&self) -> impl Iterator<Item = &[f32]> {
        self.values.chunks_exact(self.width())
    }

    /// Raw value at (row, col), sentinel included.
    pub fn value(&self, row: usize, col: usize) -> Option<f32> {
        if col >= self.width() {
            return None;
        }
        self.row(row).map(|r| r[col])
    }

    /// Value at (row, col) if it is valid data.
    pub fn valid_value(&self, row: usize, col: usize) -> Option<f32> {
        self.value(row, col).filter(|v| is_valid(*v))
    }

    /// All valid values in storage order.
    pub fn valid_values(&self) -> impl Iterator<Item = f32> + '_ {
        self.values.iter().copied().filter(|v| is_valid(*v))
    }

    pub fn valid_count(&self) -> usize {
        self.valid_values().count()
    }
}

/// Index of the first sample that breaks strict ordering, if any.
///
/// NaN coordinates never compare as ordered and are reported too.
fn first_unordered(axis: &[f32], descending: bool) -> Option<usize> {
    let expected = if descending {
        Ordering::Greater
    } else {
        Ordering::Less
    };
    axis.windows(2)
        .position(|w| w[0].partial_cmp(&w[1]) != Some(expected))
        .map(|i| i + 1)
}

pub(crate) fn min_of(axis: &[f32]) -> f32 {
    axis.iter().copied().fold(f32::INFINITY, f32::min)
}

pub(crate) fn max_of(axis: &[f32]) -> f32 {
    axis.iter().copied().fold(f32::NEG_INFINITY, f32::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_grid() -> Grid {
        Grid::from_data(
            vec![0.0, 1.0],
            vec![10.0, 11.0, 12.0],
            vec![1.0, 2.0, SENTINEL, 4.0, -5.0, 6.0],
        )
        .unwrap()
    }

    #[test]
    fn test_is_valid() {
        assert!(is_valid(0.0));
        assert!(is_valid(12.5));
        assert!(!is_valid(SENTINEL));
        assert!(!is_valid(-0.5));
        assert!(!is_valid(f32::NAN));
        assert!(!is_valid(f32::INFINITY));
    }

    #[test]
    fn test_grid_shape_checked() {
        let err = Grid::from_data(vec![0.0, 1.0], vec![0.0], vec![1.0]).unwrap_err();
        assert!(matches!(err, GridError::ShapeMismatch(_)));

        let err = Grid::from_data(vec![], vec![0.0], vec![]).unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn test_axes_must_be_strictly_monotonic() {
        let err = Grid::from_data(vec![0.0, 2.0, 1.0], vec![0.0], vec![1.0; 3]).unwrap_err();
        assert_eq!(err, GridError::NonMonotonicAxis { axis: "lat", index: 2 });
        assert!(err.is_malformed());

        let err = Grid::from_data(vec![0.0], vec![0.0, 1.0, 1.0], vec![1.0; 3]).unwrap_err();
        assert_eq!(err, GridError::NonMonotonicAxis { axis: "lon", index: 2 });

        // Longitudes run west to east only.
        let err = Grid::from_data(vec![0.0], vec![2.0, 1.0], vec![1.0; 2]).unwrap_err();
        assert_eq!(err, GridError::NonMonotonicAxis { axis: "lon", index: 1 });

        let err = Grid::from_data(vec![0.0, f32::NAN], vec![0.0], vec![1.0; 2]).unwrap_err();
        assert!(matches!(err, GridError::NonMonotonicAxis { axis: "lat", .. }));

        // Either latitude direction is fine.
        assert!(Grid::from_data(vec![3.0, 2.0, 1.0], vec![0.0], vec![1.0; 3]).is_ok());
        assert!(Grid::from_data(vec![1.0, 2.0, 3.0], vec![0.0], vec![1.0; 3]).is_ok());
    }

    #[test]
    fn test_from_rows_rejects_ragged_rows() {
        let err = Grid::from_rows(
            vec![0.0, 1.0],
            vec![0.0, 1.0],
            vec![vec![1.0, 2.0], vec![3.0]],
            Bounds::default(),
            GridStats::default(),
        )
        .unwrap_err();
        assert!(matches!(err, GridError::ShapeMismatch(_)));
    }

    #[test]
    fn test_row_access() {
        let grid = sample_grid();
        assert_eq!(grid.row(1), Some(&[4.0, -5.0, 6.0][..]));
        assert_eq!(grid.row(2), None);
        assert_eq!(grid.value(0, 1), Some(2.0));
        assert_eq!(grid.value(0, 3), None);
        assert_eq!(grid.valid_value(0, 2), None);
        assert_eq!(grid.rows().count(), 2);
    }

    #[test]
    fn test_valid_values_skip_no_data() {
        let grid = sample_grid();
        let valid: Vec<f32> = grid.valid_values().collect();
        assert_eq!(valid, vec![1.0, 2.0, 4.0, 6.0]);
        assert_eq!(grid.valid_count(), 4);
    }

    #[test]
    fn test_stats_from_values() {
        let stats = GridStats::from_values(&[2.0, SENTINEL, 4.0, -1.0, 9.0]);
        assert_eq!(stats.min, 0.0);
        assert_eq!(stats.max, 100.0);
        assert_eq!(stats.actual_min, 2.0);
        assert_eq!(stats.actual_max, 9.0);
        assert!((stats.mean - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_stats_without_valid_values() {
        let stats = GridStats::from_values(&[SENTINEL, SENTINEL]);
        assert_eq!(stats.mean, 0.0);
        assert_eq!(stats.actual_min, 0.0);
        assert_eq!(stats.actual_max, 0.0);
        assert_eq!(stats.max, 100.0);
    }

    #[test]
    fn test_lat_order_detection() {
        assert_eq!(LatOrder::detect(&[-2.0, -1.0, 0.0]), LatOrder::Ascending);
        assert_eq!(LatOrder::detect(&[5.0, 4.0]), LatOrder::Descending);
        assert_eq!(LatOrder::detect(&[3.0]), LatOrder::Descending);
        assert_eq!(LatOrder::Ascending.to_string(), "ascending");
    }

    #[test]
    fn test_bounds_serialize_camel_case() {
        let json = serde_json::to_string(&Bounds::new(-11.0, 6.0, 95.0, 141.0)).unwrap();
        assert!(json.contains("\"minLat\""));
        assert!(json.contains("\"maxLon\""));
    }
}
