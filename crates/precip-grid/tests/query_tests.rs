//! Tests for nearest-cell sampling and polygon averaging.

use precip_grid::{nearest_value, polygon_average, polygon_stats, Geometry, Grid, SENTINEL};
use test_utils::{assert_approx_eq, axis, geojson};

// ============================================================================
// nearest_value
// ============================================================================

fn two_by_two() -> Grid {
    // lat rows: 10 (north), 0 (south); lon cols: 100, 110
    Grid::from_data(vec![10.0, 0.0], vec![100.0, 110.0], vec![1.0, 2.0, 3.0, 4.0]).unwrap()
}

#[test]
fn test_nearest_value_each_quadrant() {
    let grid = two_by_two();
    assert_eq!(nearest_value(&grid, 9.0, 101.0), Some(1.0));
    assert_eq!(nearest_value(&grid, 8.0, 108.0), Some(2.0));
    assert_eq!(nearest_value(&grid, 1.0, 99.0), Some(3.0));
    assert_eq!(nearest_value(&grid, -4.0, 140.0), Some(4.0));
}

#[test]
fn test_nearest_value_tie_breaks_to_first_index() {
    let grid = two_by_two();
    // Equidistant on both axes: first lat (10) and first lon (100) win.
    assert_eq!(nearest_value(&grid, 5.0, 105.0), Some(1.0));
    // Equidistant on lat only.
    assert_eq!(nearest_value(&grid, 5.0, 109.0), Some(2.0));
}

#[test]
fn test_nearest_value_independent_axes() {
    // Cells on an irregular lon axis: the chosen column depends only on lon.
    let grid = Grid::from_data(
        vec![0.0, 1.0],
        vec![0.0, 0.9, 5.0],
        vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
    )
    .unwrap();
    assert_eq!(nearest_value(&grid, 0.6, 0.5), Some(5.0));
    assert_eq!(nearest_value(&grid, 0.4, 2.9), Some(2.0));
}

#[test]
fn test_nearest_value_no_data_is_none() {
    let grid = Grid::from_data(vec![0.0, 1.0], vec![0.0, 1.0], vec![SENTINEL, -0.1, 0.0, 3.0])
        .unwrap();
    assert_eq!(nearest_value(&grid, 0.0, 0.0), None);
    assert_eq!(nearest_value(&grid, 0.0, 1.0), None);
    assert_eq!(nearest_value(&grid, 1.0, 0.0), Some(0.0));
}

// ============================================================================
// polygon_average
// ============================================================================

/// 3x3 grid on [0, 0.5, 1] with values 1..=9 in row-major order.
fn three_by_three() -> Grid {
    let values = (1..=9).map(|v| v as f32).collect();
    Grid::from_data(axis(0.0, 1.0, 3), axis(0.0, 1.0, 3), values).unwrap()
}

#[test]
fn test_unit_square_averages_exactly_four_cells() {
    let grid = three_by_three();
    let geom = Geometry::from_geojson(geojson::UNIT_SQUARE).unwrap();

    // Manual mask: rows 1..=2, cols 1..=2 -> 5, 6, 8, 9
    let mut expected = Vec::new();
    for (row, &lat) in grid.lat().iter().enumerate() {
        for (col, &lon) in grid.lon().iter().enumerate() {
            if (0.25..=1.25).contains(&lat) && (0.25..=1.25).contains(&lon) {
                expected.push(grid.value(row, col).unwrap() as f64);
            }
        }
    }
    assert_eq!(expected, vec![5.0, 6.0, 8.0, 9.0]);

    let mean = polygon_average(&grid, &geom).unwrap();
    assert_approx_eq!(mean, expected.iter().sum::<f64>() / 4.0, 1e-12);

    let stats = polygon_stats(&grid, &geom).unwrap();
    assert_eq!(stats.count, 4);
}

#[test]
fn test_polygon_without_valid_cells_is_none() {
    let grid = Grid::from_data(axis(0.0, 1.0, 3), axis(0.0, 1.0, 3), vec![SENTINEL; 9]).unwrap();
    let geom = Geometry::from_geojson(geojson::UNIT_SQUARE).unwrap();
    assert_eq!(polygon_average(&grid, &geom), None);

    let far_away = Geometry::from_geojson(&geojson::square_feature(50.0, 50.0, 1.0)).unwrap();
    assert_eq!(polygon_average(&three_by_three(), &far_away), None);
}

#[test]
fn test_polygon_skips_invalid_cells() {
    let mut values: Vec<f32> = (1..=9).map(|v| v as f32).collect();
    values[4] = SENTINEL; // (1, 1)
    values[8] = -2.0; // (2, 2)
    let grid = Grid::from_data(axis(0.0, 1.0, 3), axis(0.0, 1.0, 3), values).unwrap();
    let geom = Geometry::from_geojson(geojson::UNIT_SQUARE).unwrap();

    assert_approx_eq!(polygon_average(&grid, &geom).unwrap(), 7.0, 1e-12); // (6 + 8) / 2
}

#[test]
fn test_multi_polygon_counts_any_member() {
    let grid = Grid::from_data(axis(0.0, 2.0, 3), axis(0.0, 2.0, 3), (1..=9).map(|v| v as f32).collect())
        .unwrap();
    let geom = Geometry::from_geojson(geojson::TWO_SQUARES).unwrap();

    // (0,0) -> 1 and (2,2) -> 9; the gap between squares is inside the bbox
    // but outside both rings.
    let stats = polygon_stats(&grid, &geom).unwrap();
    assert_eq!(stats.count, 2);
    assert_approx_eq!(stats.mean, 5.0, 1e-12);
}

#[test]
fn test_polygon_holes_not_honored() {
    let grid = Grid::from_data(axis(0.0, 2.0, 3), axis(0.0, 2.0, 3), vec![3.0; 9]).unwrap();
    let geom = Geometry::polygon(vec![
        vec![[-0.5, -0.5], [2.5, -0.5], [2.5, 2.5], [-0.5, 2.5], [-0.5, -0.5]],
        vec![[0.5, 0.5], [1.5, 0.5], [1.5, 1.5], [0.5, 1.5], [0.5, 0.5]],
    ]);
    assert_eq!(polygon_stats(&grid, &geom).unwrap().count, 9);
}

#[test]
fn test_triangle_mask() {
    // Triangle whose hypotenuse runs along lat = lon - 0.1.
    let grid = three_by_three();
    let geom = Geometry::polygon(vec![vec![[-0.1, -0.2], [1.3, -0.2], [1.3, 1.2]]]);
    let stats = polygon_stats(&grid, &geom).unwrap();
    // Cells strictly east of the hypotenuse: (lat 0, lon 0.5), (0, 1), (0.5, 1)
    assert_eq!(stats.count, 3);
    assert_eq!(stats.min, 2.0);
    assert_eq!(stats.max, 6.0);
    assert_approx_eq!(stats.mean, (2.0 + 3.0 + 6.0) / 3.0, 1e-12);
}
