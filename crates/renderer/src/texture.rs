//! Texture packing for the banded shader, plus a CPU reference of that shader.
//!
//! The packed texture stores one texel per grid cell:
//!
//! | Channel | Content                                         |
//! |---------|-------------------------------------------------|
//! | R       | quantized curved scalar (0 for invalid cells)   |
//! | G, B    | 0                                               |
//! | A       | 255 for valid cells, 0 for invalid cells        |
//!
//! Texture row 0 is always the northernmost grid row, so grids with an
//! ascending latitude axis are flipped while packing.

use precip_grid::{Grid, LatOrder};
use rayon::prelude::*;

use crate::error::Result;
use crate::legend::{Color, LEGEND_BANDS};
use crate::normalize::ContinuousScale;
use crate::raster::{PixelRaster, RenderOptions};

/// Band edges as fractions of the normalized range.
pub const BAND_EDGES: [f32; 8] = [0.04, 0.10, 0.20, 0.30, 0.40, 0.55, 0.70, 0.85];

/// Alpha below which a filtered sample is treated as no data.
pub const DISCARD_ALPHA: f32 = 0.5;

/// Band for a recovered scalar, keyed to the effective maximum.
///
/// Mirrors the fragment shader: the scalar is mapped back onto
/// `[0, effective_max]` and compared against each edge scaled the same way.
pub fn band_index(scalar: f32, effective_max: f32) -> usize {
    let value = scalar * effective_max;
    BAND_EDGES
        .iter()
        .take_while(|&&edge| value >= edge * effective_max)
        .count()
}

/// Scalar and validity texture ready for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct PackedTexture {
    width: u32,
    height: u32,
    texels: Vec<u8>,
    effective_max: f32,
    flipped: bool,
}

impl PackedTexture {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Tightly packed RGBA8 rows, north first.
    pub fn texels(&self) -> &[u8] {
        &self.texels
    }

    pub fn effective_max(&self) -> f32 {
        self.effective_max
    }

    /// Whether grid rows were reversed while packing.
    pub fn flipped(&self) -> bool {
        self.flipped
    }

    pub fn texel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = (y as usize * self.width as usize + x as usize) * 4;
        [
            self.texels[i],
            self.texels[i + 1],
            self.texels[i + 2],
            self.texels[i + 3],
        ]
    }

    /// Bilinear sample at normalized coordinates with clamp-to-edge
    /// addressing, matching a linear sampler on an `Rgba8Unorm` texture.
    pub fn sample_bilinear(&self, u: f32, v: f32) -> [f32; 4] {
        let tx = u * self.width as f32 - 0.5;
        let ty = v * self.height as f32 - 0.5;

        let x0f = tx.floor();
        let y0f = ty.floor();
        let fx = tx - x0f;
        let fy = ty - y0f;

        let max_x = self.width as i64 - 1;
        let max_y = self.height as i64 - 1;
        let x0 = (x0f as i64).clamp(0, max_x) as u32;
        let x1 = (x0f as i64 + 1).clamp(0, max_x) as u32;
        let y0 = (y0f as i64).clamp(0, max_y) as u32;
        let y1 = (y0f as i64 + 1).clamp(0, max_y) as u32;

        let t00 = self.texel(x0, y0);
        let t10 = self.texel(x1, y0);
        let t01 = self.texel(x0, y1);
        let t11 = self.texel(x1, y1);

        let mut out = [0.0f32; 4];
        for c in 0..4 {
            let top = t00[c] as f32 * (1.0 - fx) + t10[c] as f32 * fx;
            let bottom = t01[c] as f32 * (1.0 - fx) + t11[c] as f32 * fx;
            out[c] = (top * (1.0 - fy) + bottom * fy) / 255.0;
        }
        out
    }
}

/// Pack a grid into a scalar/validity texture.
pub fn pack_grid(grid: &Grid) -> PackedTexture {
    let scale = ContinuousScale::from_grid(grid);
    let flipped = grid.lat_order() == LatOrder::Ascending;
    let height = grid.height();
    let width = grid.width();

    let mut texels = Vec::with_capacity(width * height * 4);
    for dst_row in 0..height {
        let src_row = if flipped { height - 1 - dst_row } else { dst_row };
        let row = grid.row(src_row).unwrap_or(&[]);
        for &value in row {
            match scale.quantized(value) {
                Some(r) => texels.extend_from_slice(&[r, 0, 0, 255]),
                None => texels.extend_from_slice(&[0, 0, 0, 0]),
            }
        }
    }

    PackedTexture {
        width: width as u32,
        height: height as u32,
        texels,
        effective_max: scale.effective_max(),
        flipped,
    }
}

/// CPU rendition of the banded fragment shader.
///
/// Each output pixel samples the texture bilinearly at its center,
/// discards samples whose alpha is below 0.5, and paints the legend color
/// of the band the recovered scalar falls in at the configured opacity.
pub fn shade_banded(texture: &PackedTexture, options: &RenderOptions) -> Result<PixelRaster> {
    options.validate()?;
    let (width, height) = options.scaled_size(texture.width as usize, texture.height as usize)?;
    let alpha = options.alpha();
    let effective_max = texture.effective_max;

    let mut raster = PixelRaster::new(width, height);
    raster.par_rows_mut().enumerate().for_each(|(y, row)| {
        let v = (y as f32 + 0.5) / height as f32;
        for (x, px) in row.chunks_exact_mut(4).enumerate() {
            let u = (x as f32 + 0.5) / width as f32;
            let sample = texture.sample_bilinear(u, v);
            if sample[3] < DISCARD_ALPHA {
                continue;
            }
            let band = band_index(sample[0], effective_max);
            let color: Color = LEGEND_BANDS[band].color.with_alpha(alpha);
            px.copy_from_slice(&color.to_array());
        }
    });

    Ok(raster)
}

#[cfg(test)]
mod tests {
    use super::*;
    use precip_grid::SENTINEL;

    #[test]
    fn test_band_index_edges() {
        assert_eq!(band_index(0.0, 1.0), 0);
        assert_eq!(band_index(0.039, 1.0), 0);
        assert_eq!(band_index(0.04, 1.0), 1);
        assert_eq!(band_index(0.5, 40.0), 5);
        assert_eq!(band_index(0.85, 10.0), 8);
        assert_eq!(band_index(1.0, 10.0), 8);
    }

    #[test]
    fn test_pack_marks_validity() {
        let grid = Grid::from_data(vec![1.0, 0.0], vec![0.0, 1.0], vec![100.0, SENTINEL, 0.0, -2.0])
            .unwrap();
        let tex = pack_grid(&grid);
        assert!(!tex.flipped());
        assert_eq!(tex.texel(0, 0), [255, 0, 0, 255]);
        assert_eq!(tex.texel(1, 0), [0, 0, 0, 0]);
        assert_eq!(tex.texel(0, 1), [0, 0, 0, 255]);
        assert_eq!(tex.texel(1, 1), [0, 0, 0, 0]);
    }

    #[test]
    fn test_sample_at_texel_center_is_exact() {
        let grid = Grid::from_data(vec![1.0, 0.0], vec![0.0, 1.0], vec![100.0, 0.0, 0.0, 0.0])
            .unwrap();
        let tex = pack_grid(&grid);
        let s = tex.sample_bilinear(0.25, 0.25);
        assert_eq!(s, [1.0, 0.0, 0.0, 1.0]);

        // Halfway between the two top texels
        let s = tex.sample_bilinear(0.5, 0.25);
        assert!((s[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_shade_rejects_oversized_output() {
        let tex = PackedTexture {
            width: 1 << 27,
            height: 1,
            texels: Vec::new(),
            effective_max: 1.0,
            flipped: false,
        };
        let err = shade_banded(&tex, &RenderOptions::new(1.0, 64)).unwrap_err();
        assert!(matches!(err, crate::error::RenderError::InvalidOptions(_)));
    }

    #[test]
    fn test_sample_clamps_to_edge() {
        let grid = Grid::from_data(vec![0.0], vec![0.0], vec![5.0]).unwrap();
        let tex = pack_grid(&grid);
        assert_eq!(tex.sample_bilinear(0.0, 0.0), tex.sample_bilinear(1.0, 1.0));
    }
}
