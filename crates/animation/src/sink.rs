//! Sink that rasterizes presented frames.

use async_trait::async_trait;
use precip_grid::{compute_bounds, GeoBounds};
use renderer::{PixelRaster, Rasterizer, RenderOptions};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

use crate::error::Result;
use crate::sequencer::{Frame, FrameSink};
use crate::source::FrameKey;

/// A rasterized frame with its georeference.
#[derive(Debug, Clone)]
pub struct RenderedFrame {
    pub key: FrameKey,
    pub raster: Arc<PixelRaster>,
    pub bounds: GeoBounds,
    pub generation: u64,
}

/// Rasterizes each presented frame and publishes the latest one.
///
/// Subscribers see only the most recent frame; intermediate frames are
/// overwritten if nobody reads them in time.
pub struct RasterSink {
    rasterizer: Arc<Rasterizer>,
    options: RenderOptions,
    latest: watch::Sender<Option<RenderedFrame>>,
}

impl RasterSink {
    pub fn new(rasterizer: Arc<Rasterizer>, options: RenderOptions) -> Self {
        let (latest, _) = watch::channel(None);
        Self {
            rasterizer,
            options,
            latest,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<RenderedFrame>> {
        self.latest.subscribe()
    }

    /// The most recently presented frame, if any.
    pub fn latest(&self) -> Option<RenderedFrame> {
        self.latest.borrow().clone()
    }
}

#[async_trait]
impl FrameSink for RasterSink {
    async fn present(&self, frame: &Frame) -> Result<()> {
        let raster = self.rasterizer.render(&frame.grid, &self.options).await?;
        let bounds = compute_bounds(&frame.grid);
        debug!(
            frame = %frame.key,
            width = raster.width(),
            height = raster.height(),
            backend = %self.rasterizer.backend(),
            "Frame rasterized"
        );

        self.latest.send_replace(Some(RenderedFrame {
            key: frame.key.clone(),
            raster: Arc::new(raster),
            bounds,
            generation: frame.generation,
        }));
        Ok(())
    }
}
