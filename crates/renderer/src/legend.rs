//! Discrete precipitation legend and color helpers.
//!
//! The legend has 9 bands ordered from dry to extreme. The same table
//! drives the UI swatches, the GPU shader's band colors and the CPU
//! gradient stops.

use precip_grid::is_valid;

/// Color value in RGBA format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    pub const fn transparent() -> Self {
        Self::new(0, 0, 0, 0)
    }

    /// Parse a `#RRGGBB` string into an opaque color.
    pub fn from_hex(hex: &str) -> Option<Self> {
        hex_to_rgb(hex).map(|(r, g, b)| Self::rgb(r, g, b))
    }

    /// Format as `#RRGGBB` (alpha is not included).
    pub fn to_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    pub fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Normalized `[r, g, b, a]` for shader uniforms.
    pub fn to_f32_array(self) -> [f32; 4] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            self.a as f32 / 255.0,
        ]
    }
}

/// Convert hex color string to RGB tuple
pub fn hex_to_rgb(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }

    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;

    Some((r, g, b))
}

/// Linear color interpolation
pub fn interpolate_color(color1: Color, color2: Color, t: f32) -> Color {
    let t = t.clamp(0.0, 1.0);
    let t_inv = 1.0 - t;

    Color::new(
        ((color1.r as f32 * t_inv) + (color2.r as f32 * t)).round() as u8,
        ((color1.g as f32 * t_inv) + (color2.g as f32 * t)).round() as u8,
        ((color1.b as f32 * t_inv) + (color2.b as f32 * t)).round() as u8,
        ((color1.a as f32 * t_inv) + (color2.a as f32 * t)).round() as u8,
    )
}

/// One legend entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LegendBand {
    /// Values strictly above this bound (mm) belong to the band or a higher one.
    pub lower: f32,
    /// Exclusive upper bound; `None` for the open-ended top band.
    pub upper: Option<f32>,
    pub color: Color,
    pub label: &'static str,
}

/// Color shown for cells without data.
pub const NO_DATA_COLOR: Color = Color::rgb(0xCC, 0xCC, 0xCC);

/// Number of legend bands.
pub const BAND_COUNT: usize = 9;

/// Legend bands, lowest first.
pub const LEGEND_BANDS: [LegendBand; BAND_COUNT] = [
    band(0.0, Some(20.0), Color::rgb(0x34, 0x0A, 0x00), "0-20"),
    band(20.0, Some(50.0), Color::rgb(0x8E, 0x28, 0x00), "20-50"),
    band(50.0, Some(100.0), Color::rgb(0xDC, 0x62, 0x00), "50-100"),
    band(100.0, Some(150.0), Color::rgb(0xEF, 0xA7, 0x00), "100-150"),
    band(150.0, Some(200.0), Color::rgb(0xEB, 0xE1, 0x00), "150-200"),
    band(200.0, Some(300.0), Color::rgb(0xE0, 0xFD, 0x68), "200-300"),
    band(300.0, Some(400.0), Color::rgb(0x8A, 0xD5, 0x8B), "300-400"),
    band(400.0, Some(500.0), Color::rgb(0x36, 0x91, 0x35), "400-500"),
    band(500.0, None, Color::rgb(0x00, 0x46, 0x0C), ">500"),
];

const fn band(lower: f32, upper: Option<f32>, color: Color, label: &'static str) -> LegendBand {
    LegendBand {
        lower,
        upper,
        color,
        label,
    }
}

/// Legend table for swatch rendering, lowest band first.
pub fn legend_bands() -> &'static [LegendBand] {
    &LEGEND_BANDS
}

/// Band index for a value, or `None` when it is not valid data.
///
/// Scans from the top band down and returns the first band whose lower
/// bound the value strictly exceeds. A valid value that exceeds none of
/// them (exactly 0) lands in the lowest band.
pub fn legend_band(value: f32) -> Option<usize> {
    if !is_valid(value) {
        return None;
    }

    let idx = LEGEND_BANDS
        .iter()
        .rposition(|b| value > b.lower)
        .unwrap_or(0);
    Some(idx)
}

/// Legend color for an optional value; missing and invalid values are gray.
pub fn legend_color(value: Option<f32>) -> Color {
    value
        .and_then(legend_band)
        .map(|i| LEGEND_BANDS[i].color)
        .unwrap_or(NO_DATA_COLOR)
}

/// Smooth color through the legend stops for `t` in [0, 1].
///
/// Used by the CPU rasterizer, which blends between bands instead of
/// stepping.
pub fn gradient_color(t: f32) -> Color {
    let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
    let pos = t * (BAND_COUNT - 1) as f32;
    let lo = (pos.floor() as usize).min(BAND_COUNT - 2);
    interpolate_color(
        LEGEND_BANDS[lo].color,
        LEGEND_BANDS[lo + 1].color,
        pos - lo as f32,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use precip_grid::SENTINEL;

    #[test]
    fn test_hex_to_rgb() {
        assert_eq!(hex_to_rgb("#FF0000"), Some((255, 0, 0)));
        assert_eq!(hex_to_rgb("00460c"), Some((0, 70, 12)));
        assert_eq!(hex_to_rgb("#FFF"), None);
        assert_eq!(hex_to_rgb("#GG0000"), None);
    }

    #[test]
    fn test_hex_roundtrip() {
        for band in legend_bands() {
            let hex = band.color.to_hex();
            assert_eq!(Color::from_hex(&hex), Some(band.color));
        }
        assert_eq!(NO_DATA_COLOR.to_hex(), "#CCCCCC");
    }

    #[test]
    fn test_band_bounds_are_contiguous() {
        for pair in LEGEND_BANDS.windows(2) {
            assert_eq!(pair[0].upper, Some(pair[1].lower));
        }
        assert_eq!(LEGEND_BANDS[BAND_COUNT - 1].upper, None);
    }

    #[test]
    fn test_zero_maps_to_lowest_band() {
        assert_eq!(legend_band(0.0), Some(0));
    }

    #[test]
    fn test_invalid_values_have_no_band() {
        assert_eq!(legend_band(SENTINEL), None);
        assert_eq!(legend_band(-0.01), None);
        assert_eq!(legend_band(f32::NAN), None);
        assert_eq!(legend_color(None), NO_DATA_COLOR);
    }

    #[test]
    fn test_gradient_endpoints() {
        assert_eq!(gradient_color(0.0), LEGEND_BANDS[0].color);
        assert_eq!(gradient_color(1.0), LEGEND_BANDS[BAND_COUNT - 1].color);
        assert_eq!(gradient_color(0.5), LEGEND_BANDS[4].color);
        assert_eq!(gradient_color(f32::NAN), LEGEND_BANDS[0].color);
    }

    #[test]
    fn test_interpolate_color_midpoint() {
        let c = interpolate_color(Color::rgb(0, 0, 0), Color::rgb(200, 100, 50), 0.5);
        assert_eq!(c, Color::rgb(100, 50, 25));
    }
}
