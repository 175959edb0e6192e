//! Point and region queries against a decoded grid.
//!
//! Both queries are pure functions of the grid. "No data" is reported as
//! `None`, never as an error.

use serde::Serialize;

use crate::geometry::Geometry;
use crate::types::{is_valid, Grid};

/// Index of the axis entry nearest `target`.
///
/// Ties resolve to the first index encountered in array order.
pub fn nearest_index(axis: &[f32], target: f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &coord) in axis.iter().enumerate() {
        let dist = (coord as f64 - target).abs();
        if dist.is_nan() {
            continue;
        }
        match best {
            Some((_, best_dist)) if dist >= best_dist => {}
            _ => best = Some((i, dist)),
        }
    }
    best.map(|(i, _)| i)
}

/// Sample the grid at the cell nearest (`lat`, `lon`).
///
/// The row and column are resolved by two independent 1-D scans, not a true
/// 2-D nearest-neighbor search. Near grid edges this can pick a cell that is
/// not the geometrically closest one; callers rely on this exact behavior.
pub fn nearest_value(grid: &Grid, lat: f64, lon: f64) -> Option<f32> {
    let row = nearest_index(grid.lat(), lat)?;
    let col = nearest_index(grid.lon(), lon)?;
    grid.valid_value(row, col)
}

/// Aggregate over the valid cells inside a polygon.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AreaSummary {
    pub mean: f64,
    pub min: f32,
    pub max: f32,
    pub count: usize,
}

/// Mean of the valid cells whose centers fall inside `geometry`.
///
/// Returns `None` when no valid cell is contained.
pub fn polygon_average(grid: &Grid, geometry: &Geometry) -> Option<f64> {
    polygon_stats(grid, geometry).map(|s| s.mean)
}

/// Mean, min, max and count over the same cell mask as [`polygon_average`].
pub fn polygon_stats(grid: &Grid, geometry: &Geometry) -> Option<AreaSummary> {
    let bbox = geometry.bounding_box()?;

    let mut sum = 0.0f64;
    let mut count = 0usize;
    let mut min = f32::INFINITY;
    let mut max = f32::NEG_INFINITY;

    for (row, &lat) in grid.lat().iter().enumerate() {
        let lat = lat as f64;
        if lat < bbox.min_lat || lat > bbox.max_lat {
            continue;
        }

        for (col, &lon) in grid.lon().iter().enumerate() {
            let lon = lon as f64;
            if !bbox.contains(lon, lat) || !geometry.contains(lon, lat) {
                continue;
            }

            if let Some(v) = grid.value(row, col).filter(|v| is_valid(*v)) {
                sum += v as f64;
                count += 1;
                min = min.min(v);
                max = max.max(v);
            }
        }
    }

    if count == 0 {
        return None;
    }

    Some(AreaSummary {
        mean: sum / count as f64,
        min,
        max,
        count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SENTINEL;

    #[test]
    fn test_nearest_index_basic() {
        let axis = [0.0, 1.0, 2.0, 3.0];
        assert_eq!(nearest_index(&axis, 2.2), Some(2));
        assert_eq!(nearest_index(&axis, -10.0), Some(0));
        assert_eq!(nearest_index(&axis, 10.0), Some(3));
        assert_eq!(nearest_index(&[], 1.0), None);
    }

    #[test]
    fn test_nearest_index_descending_axis() {
        let axis = [6.0, 4.0, 2.0];
        assert_eq!(nearest_index(&axis, 4.4), Some(1));
        assert_eq!(nearest_index(&axis, 1.0), Some(2));
    }

    #[test]
    fn test_nearest_index_tie_prefers_first() {
        assert_eq!(nearest_index(&[0.0, 1.0], 0.5), Some(0));
        assert_eq!(nearest_index(&[1.0, 0.0], 0.5), Some(0));
    }

    #[test]
    fn test_nearest_value_no_data() {
        let grid = Grid::from_data(vec![0.0, 1.0], vec![0.0, 1.0], vec![1.0, SENTINEL, -3.0, 4.0])
            .unwrap();
        assert_eq!(nearest_value(&grid, 0.1, 0.1), Some(1.0));
        assert_eq!(nearest_value(&grid, 0.1, 0.9), None);
        assert_eq!(nearest_value(&grid, 0.9, 0.1), None);
        assert_eq!(nearest_value(&grid, 0.9, 0.9), Some(4.0));
    }

    #[test]
    fn test_polygon_stats_summary() {
        let grid = Grid::from_data(
            vec![0.0, 1.0],
            vec![0.0, 1.0],
            vec![2.0, 8.0, SENTINEL, 5.0],
        )
        .unwrap();
        let geom = Geometry::polygon(vec![vec![
            [-0.5, -0.5],
            [1.5, -0.5],
            [1.5, 1.5],
            [-0.5, 1.5],
        ]]);

        let summary = polygon_stats(&grid, &geom).unwrap();
        assert_eq!(summary.count, 3);
        assert_eq!(summary.min, 2.0);
        assert_eq!(summary.max, 8.0);
        assert!((summary.mean - 5.0).abs() < 1e-12);
        assert_eq!(polygon_average(&grid, &geom), Some(summary.mean));
    }
}
