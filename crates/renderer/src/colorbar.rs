//! Static legend colorbar.

use crate::error::{RenderError, Result};
use crate::legend::{BAND_COUNT, LEGEND_BANDS};
use crate::raster::PixelRaster;

/// Draw the legend as 9 equal opaque segments, lowest band on the left.
pub fn render_colorbar(width: u32, height: u32) -> Result<PixelRaster> {
    if width < BAND_COUNT as u32 || height == 0 {
        return Err(RenderError::invalid_options(format!(
            "colorbar needs at least {}x1 pixels, got {}x{}",
            BAND_COUNT, width, height
        )));
    }

    let mut raster = PixelRaster::new(width, height);
    for x in 0..width {
        let band = (x as usize * BAND_COUNT / width as usize).min(BAND_COUNT - 1);
        let color = LEGEND_BANDS[band].color;
        for y in 0..height {
            raster.set_pixel(x, y, color);
        }
    }
    Ok(raster)
}
