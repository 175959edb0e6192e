//! Continuous value normalization used to prepare grids for the shader.
//!
//! Two stages: a percentile clamp that keeps a handful of extreme cells
//! from flattening the rest of the field, then a log curve with a
//! piecewise boost above the knee so low rainfall still gets distinct
//! bands.
//!
//! ```text
//! effectiveMax = max(p99(valid), 1)
//! norm         = min(1, v / effectiveMax)
//! base         = ln(1 + 10·norm) / ln(11)
//! curved       = base                         if base < 0.2
//!              = 0.2 + (base - 0.2) · 1.8     otherwise
//! quantized    = round(clamp(curved, 0, 1) · 255)
//! ```

use precip_grid::{is_valid, Grid};

/// Percentile used for the effective maximum.
pub const PERCENTILE: f64 = 0.99;

/// Floor applied to the effective maximum.
pub const MIN_EFFECTIVE_MAX: f32 = 1.0;

/// Curve knee in log-normalized space.
pub const CURVE_KNEE: f32 = 0.2;

/// Slope applied above the knee.
pub const CURVE_BOOST: f32 = 1.8;

/// Linear stretch inside the log before compression.
const LOG_STRETCH: f32 = 10.0;

/// 99th percentile of the valid values, floored at 1.
///
/// Invalid values are skipped. Returns 1 when nothing is valid.
pub fn effective_max<I>(values: I) -> f32
where
    I: IntoIterator<Item = f32>,
{
    let mut valid: Vec<f32> = values.into_iter().filter(|v| is_valid(*v)).collect();
    if valid.is_empty() {
        return MIN_EFFECTIVE_MAX;
    }

    valid.sort_unstable_by(f32::total_cmp);
    let n = valid.len();
    let idx = ((PERCENTILE * n as f64).floor() as usize).min(n - 1);
    valid[idx].max(MIN_EFFECTIVE_MAX)
}

/// Linear normalization against the effective maximum, capped at 1.
#[inline]
pub fn normalize(value: f32, effective_max: f32) -> f32 {
    (value / effective_max).min(1.0)
}

/// Log-then-boost curve, clamped to [0, 1].
#[inline]
pub fn curve(norm: f32) -> f32 {
    let base = (norm * LOG_STRETCH).ln_1p() / LOG_STRETCH.ln_1p();
    let curved = if base < CURVE_KNEE {
        base
    } else {
        CURVE_KNEE + (base - CURVE_KNEE) * CURVE_BOOST
    };
    curved.clamp(0.0, 1.0)
}

/// 8-bit quantization of a curved scalar.
#[inline]
pub fn quantize(curved: f32) -> u8 {
    (curved.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Per-grid normalization, computed once per render.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContinuousScale {
    effective_max: f32,
}

impl ContinuousScale {
    pub fn new(effective_max: f32) -> Self {
        Self {
            effective_max: effective_max.max(MIN_EFFECTIVE_MAX),
        }
    }

    pub fn from_grid(grid: &Grid) -> Self {
        Self::new(effective_max(grid.values().iter().copied()))
    }

    pub fn effective_max(&self) -> f32 {
        self.effective_max
    }

    /// Curved scalar in [0, 1], or `None` for invalid values.
    pub fn scalar(&self, value: f32) -> Option<f32> {
        is_valid(value).then(|| curve(normalize(value, self.effective_max)))
    }

    /// Quantized scalar as packed into the texture's R channel.
    pub fn quantized(&self, value: f32) -> Option<u8> {
        self.scalar(value).map(quantize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use precip_grid::SENTINEL;

    #[test]
    fn test_effective_max_floor() {
        assert_eq!(effective_max(vec![0.1, 0.2, 0.5]), 1.0);
        assert_eq!(effective_max(Vec::new()), 1.0);
        assert_eq!(effective_max(vec![SENTINEL, -3.0]), 1.0);
    }

    #[test]
    fn test_effective_max_index() {
        // n = 10 -> floor(9.9) = 9, the last element
        let values: Vec<f32> = (1..=10).map(|v| v as f32 * 10.0).collect();
        assert_eq!(effective_max(values), 100.0);

        // n = 200 -> index 198
        let values: Vec<f32> = (0..200).map(|v| v as f32).collect();
        assert_eq!(effective_max(values), 198.0);
    }

    #[test]
    fn test_effective_max_ignores_order_and_invalid() {
        let values = vec![50.0, SENTINEL, 3.0, f32::NAN, 7.0];
        // valid: 3, 7, 50 -> floor(2.97) = 2 -> 50
        assert_eq!(effective_max(values), 50.0);
    }

    #[test]
    fn test_curve_knee_is_continuous() {
        // base = 0.2 exactly at norm = (11^0.2 - 1) / 10
        let norm = (11f32.powf(CURVE_KNEE) - 1.0) / LOG_STRETCH;
        let below = curve(norm - 1e-4);
        let above = curve(norm + 1e-4);
        assert!((above - below).abs() < 1e-3);
    }

    #[test]
    fn test_curve_saturates() {
        assert_eq!(curve(0.0), 0.0);
        assert_eq!(curve(1.0), 1.0);
        // base(0.5) ~ 0.747 -> 0.2 + 0.547 * 1.8 > 1 -> clamped
        assert_eq!(curve(0.5), 1.0);
    }

    #[test]
    fn test_quantize() {
        assert_eq!(quantize(0.0), 0);
        assert_eq!(quantize(1.0), 255);
        assert_eq!(quantize(0.5), 128);
        assert_eq!(quantize(2.0), 255);
    }

    #[test]
    fn test_scale_skips_invalid() {
        let scale = ContinuousScale::new(100.0);
        assert_eq!(scale.scalar(SENTINEL), None);
        assert_eq!(scale.quantized(100.0), Some(255));
        assert_eq!(scale.quantized(0.0), Some(0));
    }
}
