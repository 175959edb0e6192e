//! Output raster and render options shared by both rasterizers.

use precip_grid::Grid;
use rayon::prelude::*;

use crate::error::{RenderError, Result};
use crate::legend::Color;

/// Largest accepted upscaling factor.
pub const MAX_SCALE: u32 = 64;

/// Options for one render call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderOptions {
    /// Overlay opacity in [0, 1], written into the alpha channel.
    pub opacity: f32,
    /// Output pixels per grid cell along each axis.
    pub scale: u32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            opacity: 0.8,
            scale: 4,
        }
    }
}

impl RenderOptions {
    pub fn new(opacity: f32, scale: u32) -> Self {
        Self { opacity, scale }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.opacity.is_finite() || !(0.0..=1.0).contains(&self.opacity) {
            return Err(RenderError::invalid_options(format!(
                "opacity must be within [0, 1], got {}",
                self.opacity
            )));
        }
        if self.scale == 0 || self.scale > MAX_SCALE {
            return Err(RenderError::invalid_options(format!(
                "scale must be within [1, {}], got {}",
                MAX_SCALE, self.scale
            )));
        }
        Ok(())
    }

    /// Alpha byte written for covered pixels.
    pub fn alpha(&self) -> u8 {
        (self.opacity.clamp(0.0, 1.0) * 255.0).round() as u8
    }

    /// Output raster size for `grid`: `(M * scale, N * scale)`.
    pub fn output_size(&self, grid: &Grid) -> Result<(u32, u32)> {
        self.scaled_size(grid.width(), grid.height())
    }

    /// `(width * scale, height * scale)`, failing when either side
    /// overflows `u32`.
    pub fn scaled_size(&self, width: usize, height: usize) -> Result<(u32, u32)> {
        let dim = |cells: usize| {
            u32::try_from(cells)
                .ok()
                .and_then(|c| c.checked_mul(self.scale))
                .ok_or_else(|| {
                    RenderError::invalid_options(format!(
                        "{} cells at scale {} exceeds the raster size limit",
                        cells, self.scale
                    ))
                })
        };
        Ok((dim(width)?, dim(height)?))
    }
}

/// RGBA8 image with straight alpha. Row 0 is the northern edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelRaster {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl PixelRaster {
    /// Fully transparent raster.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 4],
        }
    }

    /// Wrap tightly packed RGBA rows.
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(RenderError::invalid_options(format!(
                "{} bytes for a {}x{} RGBA raster (expected {})",
                pixels.len(),
                width,
                height,
                expected
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        Some([
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ])
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, color: Color) {
        if x >= self.width || y >= self.height {
            return;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        self.pixels[i..i + 4].copy_from_slice(&color.to_array());
    }

    /// Number of pixels with non-zero alpha.
    pub fn covered_pixels(&self) -> usize {
        self.pixels.chunks_exact(4).filter(|p| p[3] > 0).count()
    }

    /// Parallel iterator over output rows, north first.
    pub(crate) fn par_rows_mut(&mut self) -> rayon::slice::ChunksExactMut<'_, u8> {
        let stride = self.width as usize * 4;
        self.pixels.par_chunks_exact_mut(stride.max(1))
    }
}
