//! Tests for overlay georeferencing.

use precip_grid::{compute_bounds, Bounds, Grid, GridStats};
use test_utils::{assert_approx_eq, assert_coords_approx_eq, axis};

#[test]
fn test_half_step_extension() {
    let grid = Grid::new(
        axis(-2.0, 2.0, 5),
        axis(100.0, 104.0, 5),
        vec![1.0; 25],
        Bounds::new(-3.0, 3.0, 99.0, 105.0),
        GridStats::default(),
    )
    .unwrap();

    let bounds = compute_bounds(&grid);
    assert_eq!(bounds.min_lat, -2.5);
    assert_eq!(bounds.max_lat, 2.5);
    assert_eq!(bounds.min_lon, 99.5);
    assert_eq!(bounds.max_lon, 104.5);
}

#[test]
fn test_reported_bounds_are_ignored() {
    // Nominal bounds come from the full-resolution dataset and are coarser.
    let grid = Grid::new(
        axis(6.0, -11.0, 35),
        axis(95.0, 141.0, 93),
        vec![0.0; 35 * 93],
        Bounds::new(-11.05, 6.05, 94.95, 141.05),
        GridStats::default(),
    )
    .unwrap();

    let bounds = compute_bounds(&grid);
    let lat_step = 17.0 / 34.0;
    let lon_step = 46.0 / 92.0;
    assert_approx_eq!(bounds.min_lat, -11.0 - lat_step / 2.0, 1e-5);
    assert_approx_eq!(bounds.max_lat, 6.0 + lat_step / 2.0, 1e-5);
    assert_approx_eq!(bounds.min_lon, 95.0 - lon_step / 2.0, 1e-5);
    assert_approx_eq!(bounds.max_lon, 141.0 + lon_step / 2.0, 1e-5);
}

#[test]
fn test_pixel_centers_land_on_samples() {
    let lat = axis(-2.0, 2.0, 5);
    let lon = axis(10.0, 13.0, 4);
    let grid = Grid::from_data(lat.clone(), lon.clone(), vec![1.0; 20]).unwrap();
    let bounds = compute_bounds(&grid);

    // Raster row 0 is north, so it maps to the largest latitude.
    for (x, &expected_lon) in lon.iter().enumerate() {
        for (y, &expected_lat) in lat.iter().rev().enumerate() {
            let (lat, lon) = bounds.pixel_center(x as u32, y as u32, 4, 5);
            assert_coords_approx_eq!((lat, lon), (expected_lat, expected_lon), 1e-9);
        }
    }
}
