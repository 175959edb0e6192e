//! Overlay rendering for precipitation grids.
//!
//! Implements the color pipeline from decoded grid to image:
//! - Discrete legend (9 bands) and continuous percentile/log normalization
//! - GPU rasterization with hard bands and filtered band boundaries
//! - CPU rasterization with a smooth gradient and feathered edges
//! - PNG encoding and the legend colorbar
//!
//! Callers normally hold a [`Rasterizer`], which picks the GPU path when an
//! adapter is available and the CPU path otherwise.

pub mod colorbar;
pub mod config;
pub mod cpu;
pub mod error;
pub mod gpu;
pub mod legend;
pub mod normalize;
pub mod png;
pub mod raster;
pub mod texture;

pub use colorbar::render_colorbar;
pub use config::{RenderBackend, RenderConfig};
pub use cpu::render_cpu;
pub use error::{RenderError, Result};
pub use gpu::{render_once, GpuRasterizer};
pub use legend::{legend_band, legend_bands, legend_color, Color, LegendBand, NO_DATA_COLOR};
pub use normalize::{effective_max, ContinuousScale};
pub use png::encode_png;
pub use raster::{PixelRaster, RenderOptions};
pub use texture::{pack_grid, shade_banded, PackedTexture};

use precip_grid::Grid;
use tracing::{info, warn};

/// The rasterizer a caller renders frames with.
pub enum Rasterizer {
    Gpu(GpuRasterizer),
    Cpu,
}

impl Rasterizer {
    /// Acquire a rasterizer for `backend`.
    ///
    /// `Auto` falls back to the CPU path with a warning when no GPU is
    /// available; `Gpu` surfaces [`RenderError::RasterizerUnavailable`].
    pub async fn acquire(backend: RenderBackend) -> Result<Self> {
        match backend {
            RenderBackend::Cpu => Ok(Self::Cpu),
            RenderBackend::Gpu => Ok(Self::Gpu(GpuRasterizer::new().await?)),
            RenderBackend::Auto => match GpuRasterizer::new().await {
                Ok(gpu) => Ok(Self::Gpu(gpu)),
                Err(e) if e.is_unavailable() => {
                    warn!(error = %e, "GPU unavailable, falling back to CPU rasterizer");
                    Ok(Self::Cpu)
                }
                Err(e) => Err(e),
            },
        }
    }

    pub fn backend(&self) -> RenderBackend {
        match self {
            Self::Gpu(_) => RenderBackend::Gpu,
            Self::Cpu => RenderBackend::Cpu,
        }
    }

    pub async fn render(&self, grid: &Grid, options: &RenderOptions) -> Result<PixelRaster> {
        match self {
            Self::Gpu(gpu) => gpu.render(grid, options).await,
            Self::Cpu => render_cpu(grid, options),
        }
    }
}

impl std::fmt::Debug for Rasterizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gpu(gpu) => write!(f, "Rasterizer::Gpu({})", gpu.adapter_name()),
            Self::Cpu => write!(f, "Rasterizer::Cpu"),
        }
    }
}

/// Log which rasterizer was selected.
pub fn log_rasterizer(rasterizer: &Rasterizer) {
    match rasterizer {
        Rasterizer::Gpu(gpu) => info!(
            adapter = gpu.adapter_name(),
            backend = ?gpu.backend(),
            "Using GPU rasterizer"
        ),
        Rasterizer::Cpu => info!("Using CPU rasterizer"),
    }
}
