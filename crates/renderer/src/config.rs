//! Rendering configuration.

use serde::{Deserialize, Serialize};

use crate::raster::{RenderOptions, MAX_SCALE};

/// Which rasterizer to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderBackend {
    /// GPU when available, CPU otherwise.
    #[default]
    Auto,
    /// GPU only; fail when no adapter is available.
    Gpu,
    /// CPU gradient renderer.
    Cpu,
}

impl RenderBackend {
    /// Parse from string (case-insensitive). Unknown values mean `Auto`.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "gpu" | "wgpu" => Self::Gpu,
            "cpu" => Self::Cpu,
            _ => Self::Auto,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Gpu => "gpu",
            Self::Cpu => "cpu",
        }
    }
}

impl std::fmt::Display for RenderBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Configuration for overlay rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub backend: RenderBackend,

    /// Overlay opacity (0-1).
    pub opacity: f32,

    /// Output pixels per grid cell.
    pub scale: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        let options = RenderOptions::default();
        Self {
            backend: RenderBackend::Auto,
            opacity: options.opacity,
            scale: options.scale,
        }
    }
}

impl RenderConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("RENDER_BACKEND") {
            config.backend = RenderBackend::from_str(&val);
        }

        if let Ok(val) = std::env::var("RENDER_OPACITY") {
            if let Ok(opacity) = val.parse() {
                config.opacity = opacity;
            }
        }

        if let Ok(val) = std::env::var("RENDER_SCALE") {
            if let Ok(scale) = val.parse() {
                config.scale = scale;
            }
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.opacity) {
            return Err("opacity must be 0-1".to_string());
        }

        if self.scale == 0 || self.scale > MAX_SCALE {
            return Err(format!("scale must be 1-{}", MAX_SCALE));
        }

        Ok(())
    }

    pub fn options(&self) -> RenderOptions {
        RenderOptions::new(self.opacity, self.scale)
    }
}
