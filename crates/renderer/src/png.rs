//! PNG encoding for overlay rasters.
//!
//! Two modes:
//! - **Indexed PNG (color type 3)**: used when the raster has at most 256
//!   distinct RGBA values. Banded output always qualifies.
//! - **RGBA PNG (color type 6)**: fallback, typical for the CPU gradient.
//!
//! Alpha is straight, matching [`PixelRaster`].

use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::io::Write;

use crate::error::{RenderError, Result};
use crate::raster::PixelRaster;

/// PNG file signature.
pub const PNG_SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

/// Maximum colors for indexed PNG (PNG8)
const MAX_PALETTE_SIZE: usize = 256;

/// Minimum pixels to benefit from parallel palette extraction
const PARALLEL_THRESHOLD: usize = 4096; // 64x64 or larger

const COLOR_TYPE_INDEXED: u8 = 3;
const COLOR_TYPE_RGBA: u8 = 6;

/// Distinct RGBA entries plus one palette index per pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    pub colors: Vec<[u8; 4]>,
    pub indices: Vec<u8>,
}

impl Palette {
    /// Build a palette, or `None` when the image has more than 256 colors.
    pub fn extract(pixels: &[u8]) -> Option<Self> {
        if pixels.len() / 4 >= PARALLEL_THRESHOLD {
            extract_parallel(pixels)
        } else {
            extract_sequential(pixels)
        }
    }

    fn has_transparency(&self) -> bool {
        self.colors.iter().any(|c| c[3] < 255)
    }
}

#[inline(always)]
fn pack_color(px: &[u8]) -> u32 {
    u32::from_le_bytes([px[0], px[1], px[2], px[3]])
}

fn extract_sequential(pixels: &[u8]) -> Option<Palette> {
    let mut lookup: HashMap<u32, u8> = HashMap::with_capacity(MAX_PALETTE_SIZE);
    let mut colors = Vec::with_capacity(MAX_PALETTE_SIZE);
    let mut indices = Vec::with_capacity(pixels.len() / 4);

    for px in pixels.chunks_exact(4) {
        let key = pack_color(px);
        let idx = match lookup.get(&key) {
            Some(&idx) => idx,
            None => {
                if colors.len() >= MAX_PALETTE_SIZE {
                    return None;
                }
                let idx = colors.len() as u8;
                colors.push([px[0], px[1], px[2], px[3]]);
                lookup.insert(key, idx);
                idx
            }
        };
        indices.push(idx);
    }

    Some(Palette { colors, indices })
}

/// Collect per-chunk color sets in parallel, merge them, then map pixels.
fn extract_parallel(pixels: &[u8]) -> Option<Palette> {
    let chunk_px = (pixels.len() / 4 / rayon::current_num_threads()).max(256);

    let sets: Vec<HashSet<u32>> = pixels
        .par_chunks(chunk_px * 4)
        .map(|chunk| {
            let mut set = HashSet::with_capacity(MAX_PALETTE_SIZE);
            for px in chunk.chunks_exact(4) {
                set.insert(pack_color(px));
                if set.len() > MAX_PALETTE_SIZE {
                    break;
                }
            }
            set
        })
        .collect();

    let mut lookup: HashMap<u32, u8> = HashMap::with_capacity(MAX_PALETTE_SIZE);
    let mut colors = Vec::with_capacity(MAX_PALETTE_SIZE);
    for key in sets.into_iter().flatten() {
        if lookup.contains_key(&key) {
            continue;
        }
        if colors.len() >= MAX_PALETTE_SIZE {
            return None;
        }
        lookup.insert(key, colors.len() as u8);
        colors.push(key.to_le_bytes());
    }

    let indices = pixels
        .par_chunks_exact(4)
        .map(|px| lookup.get(&pack_color(px)).copied().unwrap_or(0))
        .collect();

    Some(Palette { colors, indices })
}

/// Encode a raster, choosing indexed or RGBA output automatically.
pub fn encode_png(raster: &PixelRaster) -> Result<Vec<u8>> {
    create_png_auto(
        raster.as_bytes(),
        raster.width() as usize,
        raster.height() as usize,
    )
}

/// Create a PNG from RGBA bytes with automatic format selection.
pub fn create_png_auto(pixels: &[u8], width: usize, height: usize) -> Result<Vec<u8>> {
    check_len(pixels.len(), width * height * 4, width, height)?;
    match Palette::extract(pixels) {
        Some(palette) => create_png_indexed(width, height, &palette),
        None => create_png(pixels, width, height),
    }
}

/// Create an indexed PNG (color type 3).
///
/// One byte per pixel plus a PLTE chunk, with tRNS only when some entry
/// is not fully opaque.
pub fn create_png_indexed(width: usize, height: usize, palette: &Palette) -> Result<Vec<u8>> {
    check_len(palette.indices.len(), width * height, width, height)?;

    let mut png = start_png(width, height, COLOR_TYPE_INDEXED);

    let plte: Vec<u8> = palette.colors.iter().flat_map(|c| [c[0], c[1], c[2]]).collect();
    write_chunk(&mut png, b"PLTE", &plte);

    if palette.has_transparency() {
        let trns: Vec<u8> = palette.colors.iter().map(|c| c[3]).collect();
        write_chunk(&mut png, b"tRNS", &trns);
    }

    let idat = deflate_scanlines(&palette.indices, width, height)?;
    write_chunk(&mut png, b"IDAT", &idat);
    write_chunk(&mut png, b"IEND", &[]);
    Ok(png)
}

/// Create a truecolor PNG with alpha (color type 6).
pub fn create_png(pixels: &[u8], width: usize, height: usize) -> Result<Vec<u8>> {
    check_len(pixels.len(), width * height * 4, width, height)?;

    let mut png = start_png(width, height, COLOR_TYPE_RGBA);
    let idat = deflate_scanlines(pixels, width * 4, height)?;
    write_chunk(&mut png, b"IDAT", &idat);
    write_chunk(&mut png, b"IEND", &[]);
    Ok(png)
}

fn check_len(actual: usize, expected: usize, width: usize, height: usize) -> Result<()> {
    if actual != expected {
        return Err(RenderError::Encode(format!(
            "{} bytes of image data for {}x{} (expected {})",
            actual, width, height, expected
        )));
    }
    Ok(())
}

/// Signature plus IHDR for an 8-bit image.
fn start_png(width: usize, height: usize, color_type: u8) -> Vec<u8> {
    let mut png = Vec::with_capacity(64);
    png.extend_from_slice(&PNG_SIGNATURE);

    let mut ihdr = Vec::with_capacity(13);
    ihdr.extend_from_slice(&(width as u32).to_be_bytes());
    ihdr.extend_from_slice(&(height as u32).to_be_bytes());
    ihdr.push(8); // bit depth
    ihdr.push(color_type);
    ihdr.extend_from_slice(&[0, 0, 0]); // compression, filter, interlace
    write_chunk(&mut png, b"IHDR", &ihdr);
    png
}

/// Prefix each row with filter byte 0 and zlib-compress the result.
fn deflate_scanlines(data: &[u8], row_bytes: usize, height: usize) -> Result<Vec<u8>> {
    let mut raw = Vec::with_capacity(height * (row_bytes + 1));
    for row in data.chunks_exact(row_bytes.max(1)).take(height) {
        raw.push(0);
        raw.extend_from_slice(row);
    }

    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::fast());
    encoder
        .write_all(&raw)
        .map_err(|e| RenderError::Encode(format!("IDAT compression failed: {}", e)))?;
    encoder
        .finish()
        .map_err(|e| RenderError::Encode(format!("IDAT compression failed: {}", e)))
}

/// Append a length-prefixed chunk with its CRC.
fn write_chunk(png: &mut Vec<u8>, chunk_type: &[u8; 4], data: &[u8]) {
    png.extend_from_slice(&(data.len() as u32).to_be_bytes());
    png.extend_from_slice(chunk_type);
    png.extend_from_slice(data);

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(chunk_type);
    hasher.update(data);
    png.extend_from_slice(&hasher.finalize().to_be_bytes());
}
