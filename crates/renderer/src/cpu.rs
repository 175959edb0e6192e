//! CPU rasterizer with alpha-weighted bilinear edge blending.
//!
//! Produces a smooth gradient through the legend colors with feathered
//! coastlines, unlike the GPU path's flat bands. Both are valid rendering
//! modes and are kept distinguishable.

use precip_grid::{is_valid, Grid, LatOrder};
use rayon::prelude::*;
use tracing::debug;

use crate::error::Result;
use crate::legend::gradient_color;
use crate::normalize::ContinuousScale;
use crate::raster::{PixelRaster, RenderOptions};

/// Render `grid` on the CPU.
///
/// For every output pixel the four surrounding cells are blended with
/// bilinear weights. Invalid corners carry zero weight; the value is the
/// weighted mean over valid corners and the alpha is `opacity` times the
/// summed valid weight. A pixel is fully transparent only when none of its
/// corners is valid.
pub fn render_cpu(grid: &Grid, options: &RenderOptions) -> Result<PixelRaster> {
    options.validate()?;
    let (width, height) = options.output_size(grid)?;
    let scale = ContinuousScale::from_grid(grid);

    let rows = grid.height();
    let cols = grid.width();
    let flip = grid.lat_order() == LatOrder::Ascending;
    let opacity = options.opacity;

    // Row `r` counted from the north edge.
    let cell = |r: usize, c: usize| -> Option<f32> {
        let row = if flip { rows - 1 - r } else { r };
        grid.value(row, c).filter(|v| is_valid(*v))
    };

    let mut raster = PixelRaster::new(width, height);
    raster.par_rows_mut().enumerate().for_each(|(y, out_row)| {
        let sy = source_coord(y, height, rows);
        let (y0, y1, fy) = neighbors(sy, rows);

        for (x, px) in out_row.chunks_exact_mut(4).enumerate() {
            let sx = source_coord(x, width, cols);
            let (x0, x1, fx) = neighbors(sx, cols);

            let corners = [
                (cell(y0, x0), (1.0 - fx) * (1.0 - fy)),
                (cell(y0, x1), fx * (1.0 - fy)),
                (cell(y1, x0), (1.0 - fx) * fy),
                (cell(y1, x1), fx * fy),
            ];

            let mut weight = 0.0f32;
            let mut sum = 0.0f32;
            for (value, w) in corners {
                if let Some(v) = value {
                    weight += w;
                    sum += v * w;
                }
            }

            if weight <= 0.0 {
                continue;
            }

            let t = scale.scalar(sum / weight).unwrap_or(0.0);
            let color = gradient_color(t);
            let alpha = ((opacity * weight * 255.0).round() as u8).max(u8::from(opacity > 0.0));
            px.copy_from_slice(&color.with_alpha(alpha).to_array());
        }
    });

    debug!(
        width,
        height,
        effective_max = scale.effective_max(),
        "CPU raster complete"
    );

    Ok(raster)
}

/// Continuous cell coordinate of output pixel `i`'s center, clamped to the grid.
fn source_coord(i: usize, out_len: u32, cells: usize) -> f32 {
    let s = (i as f32 + 0.5) / out_len as f32 * cells as f32 - 0.5;
    s.clamp(0.0, (cells - 1) as f32)
}

/// Lower and upper neighbor indices with the fractional offset between them.
fn neighbors(s: f32, cells: usize) -> (usize, usize, f32) {
    let lo = (s.floor() as usize).min(cells - 1);
    let hi = (lo + 1).min(cells - 1);
    (lo, hi, s - lo as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::legend::LEGEND_BANDS;
    use precip_grid::SENTINEL;

    #[test]
    fn test_neighbors_at_edges() {
        assert_eq!(neighbors(0.0, 3), (0, 1, 0.0));
        assert_eq!(neighbors(2.0, 3), (2, 2, 0.0));
        assert_eq!(neighbors(0.5, 1), (0, 0, 0.5));
    }

    #[test]
    fn test_source_coord_clamped() {
        assert_eq!(source_coord(0, 8, 2), 0.0);
        assert_eq!(source_coord(7, 8, 2), 1.0);
        assert_eq!(source_coord(0, 2, 2), 0.0);
        assert_eq!(source_coord(1, 2, 2), 1.0);
    }

    #[test]
    fn test_uniform_grid_is_opaque_and_flat() {
        let grid = Grid::from_data(vec![1.0, 0.0], vec![0.0, 1.0], vec![0.0; 4]).unwrap();
        let raster = render_cpu(&grid, &RenderOptions::new(1.0, 2)).unwrap();
        assert_eq!(raster.covered_pixels(), 16);
        let expected = LEGEND_BANDS[0].color.to_array();
        assert_eq!(raster.pixel(1, 1), Some(expected));
    }

    #[test]
    fn test_all_invalid_is_transparent() {
        let grid = Grid::from_data(vec![0.0, 1.0], vec![0.0, 1.0], vec![SENTINEL; 4]).unwrap();
        let raster = render_cpu(&grid, &RenderOptions::new(1.0, 3)).unwrap();
        assert_eq!(raster.covered_pixels(), 0);
    }
}
