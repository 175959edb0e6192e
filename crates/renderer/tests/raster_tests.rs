//! Tests for texture packing and the two rasterization modes.
//!
//! The banded path is exercised through its CPU reference, which mirrors the
//! fragment shader texel for texel.

use precip_grid::{Grid, SENTINEL};
use renderer::legend::{gradient_color, LEGEND_BANDS};
use renderer::{
    pack_grid, render_cpu, shade_banded, RenderBackend, RenderError, RenderOptions, Rasterizer,
};
use test_utils::{apply_island_mask, axis, create_constant_grid, create_precipitation_grid};

/// One row: a valid cell to the west, missing data to the east.
fn coast_grid() -> Grid {
    Grid::from_data(vec![0.0], vec![0.0, 1.0], vec![10.0, SENTINEL]).unwrap()
}

fn alphas(raster: &renderer::PixelRaster, y: u32) -> Vec<u8> {
    (0..raster.width())
        .map(|x| raster.pixel(x, y).unwrap()[3])
        .collect()
}

// ============================================================================
// Packing
// ============================================================================

#[test]
fn test_ascending_latitude_is_flipped() {
    let ascending = Grid::from_data(
        vec![0.0, 1.0],
        vec![0.0, 1.0],
        vec![0.0, 0.0, 100.0, 100.0],
    )
    .unwrap();
    let descending = Grid::from_data(
        vec![1.0, 0.0],
        vec![0.0, 1.0],
        vec![100.0, 100.0, 0.0, 0.0],
    )
    .unwrap();

    let up = pack_grid(&ascending);
    let down = pack_grid(&descending);

    assert!(up.flipped());
    assert!(!down.flipped());
    // Row 0 is north in both cases
    assert_eq!(up.texel(0, 0), [255, 0, 0, 255]);
    assert_eq!(up.texel(0, 1), [0, 0, 0, 255]);
    assert_eq!(up.texels(), down.texels());
}

#[test]
fn test_packed_texture_dimensions() {
    let grid = Grid::from_data(
        axis(2.0, -2.0, 3),
        axis(100.0, 104.0, 5),
        create_constant_grid(5, 3, 12.0),
    )
    .unwrap();
    let tex = pack_grid(&grid);
    assert_eq!((tex.width(), tex.height()), (5, 3));
    assert_eq!(tex.texels().len(), 5 * 3 * 4);
    assert_eq!(tex.effective_max(), 12.0);
}

// ============================================================================
// Output geometry
// ============================================================================

#[test]
fn test_output_size_is_cells_times_scale() {
    let grid = Grid::from_data(
        axis(1.0, 0.0, 2),
        axis(0.0, 2.0, 3),
        create_constant_grid(3, 2, 1.0),
    )
    .unwrap();
    let options = RenderOptions::new(0.8, 4);

    let cpu = render_cpu(&grid, &options).unwrap();
    let banded = shade_banded(&pack_grid(&grid), &options).unwrap();
    assert_eq!((cpu.width(), cpu.height()), (12, 8));
    assert_eq!((banded.width(), banded.height()), (12, 8));
}

#[test]
fn test_invalid_options_rejected() {
    let grid = coast_grid();
    for options in [RenderOptions::new(1.5, 4), RenderOptions::new(0.5, 0)] {
        assert!(matches!(
            render_cpu(&grid, &options),
            Err(RenderError::InvalidOptions(_))
        ));
        assert!(matches!(
            shade_banded(&pack_grid(&grid), &options),
            Err(RenderError::InvalidOptions(_))
        ));
    }
}

// ============================================================================
// CPU gradient path
// ============================================================================

#[test]
fn test_cpu_feathers_toward_missing_data() {
    let raster = render_cpu(&coast_grid(), &RenderOptions::new(1.0, 4)).unwrap();
    assert_eq!((raster.width(), raster.height()), (8, 4));

    let expected = vec![255, 255, 223, 159, 96, 32, 0, 0];
    for y in 0..4 {
        assert_eq!(alphas(&raster, y), expected, "row {}", y);
    }

    // Only one valid value contributes, so the color never changes.
    let top = gradient_color(1.0).to_array();
    for x in 0..6 {
        assert_eq!(raster.pixel(x, 0).unwrap()[..3], top[..3]);
    }
}

#[test]
fn test_cpu_island_coast() {
    let (w, h) = (16, 12);
    let mut data = create_precipitation_grid(w, h, 3);
    apply_island_mask(&mut data, w, h);
    let grid = Grid::from_data(axis(6.0, -5.0, h), axis(100.0, 115.0, w), data).unwrap();

    let raster = render_cpu(&grid, &RenderOptions::new(0.8, 2)).unwrap();
    // Corner is surrounded by ocean, center by land.
    assert_eq!(raster.pixel(0, 0), Some([0, 0, 0, 0]));
    assert_eq!(raster.pixel(16, 12).unwrap()[3], 204);
    assert!(raster.covered_pixels() < w * h * 4);
}

// ============================================================================
// Banded path
// ============================================================================

#[test]
fn test_banded_interior_is_flat() {
    let grid = Grid::from_data(
        axis(4.0, 0.0, 5),
        axis(0.0, 4.0, 5),
        create_constant_grid(5, 5, 50.0),
    )
    .unwrap();
    let raster = shade_banded(&pack_grid(&grid), &RenderOptions::default()).unwrap();

    let expected = LEGEND_BANDS[8].color.with_alpha(204).to_array();
    assert_eq!(raster.covered_pixels(), 20 * 20);
    assert!(raster.as_bytes().chunks_exact(4).all(|px| px == expected));
}

#[test]
fn test_banded_edges_are_hard() {
    let raster = shade_banded(&pack_grid(&coast_grid()), &RenderOptions::new(1.0, 4)).unwrap();

    assert_eq!(alphas(&raster, 0), vec![255, 255, 255, 255, 0, 0, 0, 0]);
    assert_eq!(raster.pixel(0, 0), Some(LEGEND_BANDS[8].color.to_array()));
    // Filtered scalar drops toward the edge and steps down a band.
    assert_eq!(raster.pixel(3, 0), Some(LEGEND_BANDS[6].color.to_array()));
}

#[test]
fn test_banded_all_invalid_is_empty() {
    let grid = Grid::from_data(vec![0.0, 1.0], vec![0.0, 1.0], vec![SENTINEL; 4]).unwrap();
    let raster = shade_banded(&pack_grid(&grid), &RenderOptions::default()).unwrap();
    assert_eq!(raster.covered_pixels(), 0);
}

#[test]
fn test_modes_are_distinguishable() {
    let grid = coast_grid();
    let options = RenderOptions::new(1.0, 4);
    let cpu = render_cpu(&grid, &options).unwrap();
    let banded = shade_banded(&pack_grid(&grid), &options).unwrap();

    assert_ne!(cpu, banded);
    assert!(cpu.covered_pixels() > banded.covered_pixels());
}

#[test]
fn test_cpu_rasterizer_matches_render_cpu() {
    let rasterizer = tokio_test::block_on(Rasterizer::acquire(RenderBackend::Cpu)).unwrap();
    assert_eq!(rasterizer.backend(), RenderBackend::Cpu);

    let grid = coast_grid();
    let options = RenderOptions::default();
    let via_rasterizer = tokio_test::block_on(rasterizer.render(&grid, &options)).unwrap();
    assert_eq!(via_rasterizer, render_cpu(&grid, &options).unwrap());
}
