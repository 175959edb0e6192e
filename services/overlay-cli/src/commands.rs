//! Command implementations.
//!
//! Each command returns a serializable summary; `main` prints it as JSON.

use animation::{
    AnimationConfig, AnimationSequencer, FrameCache, FrameKey, GridSource, HttpGridSource,
    RasterSink, SourceConfig,
};
use anyhow::{anyhow, Context, Result};
use precip_grid::{
    codec, compute_bounds, polygon_stats, query, AreaSummary, Bounds, GeoBounds, Geometry, Grid,
    GridStats, LatOrder,
};
use renderer::{
    encode_png, legend_band, legend_bands, legend_color, log_rasterizer, render_colorbar,
    ContinuousScale, Rasterizer, RenderBackend, RenderConfig, NO_DATA_COLOR,
};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::cli::{
    AnimateArgs, ApiArgs, AreaArgs, ConvertArgs, GridArgs, LegendArgs, PointArgs, RenderArgs,
    RenderSettings, TimesArgs,
};

// ============================================================================
// Shared helpers
// ============================================================================

/// API configuration from the environment with command-line overrides.
pub fn source_config(api: &ApiArgs, period: Option<&str>) -> Result<SourceConfig> {
    let mut config = SourceConfig::from_env();
    if let Some(url) = &api.api_url {
        config.base_url = url.clone();
    }
    if let Some(period) = period {
        config.period = period.to_string();
    }
    config
        .validate()
        .map_err(|e| anyhow!("invalid source configuration: {}", e))?;
    Ok(config)
}

/// Render configuration from the environment with command-line overrides.
pub fn render_config(settings: &RenderSettings) -> Result<RenderConfig> {
    let mut config = RenderConfig::from_env();
    if let Some(backend) = &settings.backend {
        config.backend = RenderBackend::from_str(backend);
    }
    if let Some(opacity) = settings.opacity {
        config.opacity = opacity;
    }
    if let Some(scale) = settings.scale {
        config.scale = scale;
    }
    config
        .validate()
        .map_err(|e| anyhow!("invalid render configuration: {}", e))?;
    Ok(config)
}

/// Read a grid file, JSON when the extension says so.
pub fn read_grid_file(path: &Path) -> Result<Grid> {
    let data = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let is_json = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let grid = if is_json {
        let text = std::str::from_utf8(&data)
            .with_context(|| format!("{} is not UTF-8", path.display()))?;
        codec::decode_json(text)?
    } else {
        codec::decode(&data)?
    };
    Ok(grid)
}

/// Load the grid named by `args`: a local file, or a frame from the API.
pub async fn load_grid(args: &GridArgs) -> Result<Grid> {
    if let Some(path) = &args.file {
        return read_grid_file(path);
    }

    let config = source_config(&args.api, args.period.as_deref())?;
    let source = HttpGridSource::new(&config)?;
    let key = FrameKey::new(config.period.clone(), args.time);
    info!(frame = %key, url = %config.base_url, "Fetching grid");
    let bytes = source.fetch(&key).await?;
    Ok(codec::decode(&bytes)?)
}

// ============================================================================
// render
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderSummary {
    pub output: PathBuf,
    pub width: u32,
    pub height: u32,
    pub backend: RenderBackend,
    pub bounds: GeoBounds,
    pub effective_max: f32,
    pub covered_pixels: usize,
    pub png_bytes: usize,
}

pub async fn render(args: &RenderArgs) -> Result<RenderSummary> {
    let grid = load_grid(&args.grid).await?;
    let config = render_config(&args.render)?;

    let rasterizer = Rasterizer::acquire(config.backend).await?;
    log_rasterizer(&rasterizer);

    let raster = rasterizer.render(&grid, &config.options()).await?;
    let png = encode_png(&raster)?;
    std::fs::write(&args.output, &png)
        .with_context(|| format!("writing {}", args.output.display()))?;

    info!(
        output = %args.output.display(),
        width = raster.width(),
        height = raster.height(),
        "Overlay written"
    );

    Ok(RenderSummary {
        output: args.output.clone(),
        width: raster.width(),
        height: raster.height(),
        backend: rasterizer.backend(),
        bounds: compute_bounds(&grid),
        effective_max: ContinuousScale::from_grid(&grid).effective_max(),
        covered_pixels: raster.covered_pixels(),
        png_bytes: png.len(),
    })
}

// ============================================================================
// point / area
// ============================================================================

#[derive(Debug, Serialize)]
pub struct PointResult {
    pub lat: f64,
    pub lon: f64,
    pub value: Option<f32>,
    pub band: Option<&'static str>,
    pub color: String,
}

pub async fn point(args: &PointArgs) -> Result<PointResult> {
    let grid = load_grid(&args.grid).await?;
    Ok(sample_point(&grid, args.lat, args.lon))
}

pub fn sample_point(grid: &Grid, lat: f64, lon: f64) -> PointResult {
    let value = query::nearest_value(grid, lat, lon);
    let band = value
        .and_then(legend_band)
        .map(|i| legend_bands()[i].label);

    PointResult {
        lat,
        lon,
        value,
        band,
        color: legend_color(value).to_hex(),
    }
}

#[derive(Debug, Serialize)]
pub struct AreaResult {
    pub average: Option<f64>,
    pub summary: Option<AreaSummary>,
}

pub async fn area(args: &AreaArgs) -> Result<AreaResult> {
    let text = std::fs::read_to_string(&args.geojson)
        .with_context(|| format!("reading {}", args.geojson.display()))?;
    let geometry = Geometry::from_geojson(&text)?;
    let grid = load_grid(&args.grid).await?;

    let summary = polygon_stats(&grid, &geometry);
    if summary.is_none() {
        warn!("No valid cells inside the polygon");
    }
    Ok(AreaResult {
        average: summary.map(|s| s.mean),
        summary,
    })
}

// ============================================================================
// legend
// ============================================================================

#[derive(Debug, Serialize)]
pub struct LegendEntry {
    pub label: &'static str,
    pub lower: Option<f32>,
    pub upper: Option<f32>,
    pub color: String,
}

pub fn legend(args: &LegendArgs) -> Result<Vec<LegendEntry>> {
    if let Some(path) = &args.colorbar {
        let bar = render_colorbar(args.width, args.height)?;
        std::fs::write(path, encode_png(&bar)?)
            .with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), "Colorbar written");
    }

    let mut entries: Vec<LegendEntry> = legend_bands()
        .iter()
        .map(|band| LegendEntry {
            label: band.label,
            lower: Some(band.lower),
            upper: band.upper,
            color: band.color.to_hex(),
        })
        .collect();
    entries.push(LegendEntry {
        label: "no data",
        lower: None,
        upper: None,
        color: NO_DATA_COLOR.to_hex(),
    });
    Ok(entries)
}

// ============================================================================
// info / convert
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridInfo {
    pub rows: usize,
    pub cols: usize,
    pub lat_order: LatOrder,
    pub time_index: i32,
    pub total_times: i32,
    pub valid_cells: usize,
    pub effective_max: f32,
    pub bounds: Bounds,
    pub overlay_bounds: GeoBounds,
    pub stats: GridStats,
}

impl GridInfo {
    pub fn from_grid(grid: &Grid) -> Self {
        Self {
            rows: grid.height(),
            cols: grid.width(),
            lat_order: grid.lat_order(),
            time_index: grid.time_index(),
            total_times: grid.total_times(),
            valid_cells: grid.valid_count(),
            effective_max: ContinuousScale::from_grid(grid).effective_max(),
            bounds: grid.bounds(),
            overlay_bounds: compute_bounds(grid),
            stats: grid.stats(),
        }
    }
}

pub async fn info(args: &GridArgs) -> Result<GridInfo> {
    let grid = load_grid(args).await?;
    Ok(GridInfo::from_grid(&grid))
}

#[derive(Debug, Serialize)]
pub struct ConvertSummary {
    pub output: PathBuf,
    pub cells: usize,
    pub bytes: usize,
}

pub fn convert(args: &ConvertArgs) -> Result<ConvertSummary> {
    let grid = read_grid_file(&args.input)?;
    let encoded = codec::encode(&grid);
    std::fs::write(&args.output, &encoded)
        .with_context(|| format!("writing {}", args.output.display()))?;

    Ok(ConvertSummary {
        output: args.output.clone(),
        cells: grid.values().len(),
        bytes: encoded.len(),
    })
}

// ============================================================================
// periods / times
// ============================================================================

pub async fn periods(api: &ApiArgs) -> Result<Vec<String>> {
    let config = source_config(api, None)?;
    Ok(HttpGridSource::new(&config)?.periods().await?)
}

pub async fn times(args: &TimesArgs) -> Result<Vec<String>> {
    let config = source_config(&args.api, args.period.as_deref())?;
    Ok(HttpGridSource::new(&config)?.times(&config.period).await?)
}

// ============================================================================
// animate
// ============================================================================

#[derive(Debug, Serialize)]
pub struct AnimateSummary {
    pub written: Vec<u32>,
    pub missing: Vec<u32>,
    pub cache_hits: u64,
    pub cache_misses: u64,
}

pub async fn animate(args: &AnimateArgs) -> Result<AnimateSummary> {
    let config = source_config(&args.api, args.period.as_deref())?;
    let source = Arc::new(HttpGridSource::new(&config)?);
    animate_with_source(source, &config.period, args).await
}

/// Play `args.from..=args.to` from `source` until every frame has been
/// written once or the timeout expires.
pub async fn animate_with_source(
    source: Arc<dyn GridSource>,
    period: &str,
    args: &AnimateArgs,
) -> Result<AnimateSummary> {
    let render = render_config(&args.render)?;
    let mut playback = AnimationConfig::from_env();
    if let Some(fps) = args.fps {
        playback.fps = fps;
    }
    if let Some(prefetch) = args.prefetch {
        playback.prefetch = prefetch;
    }
    playback
        .validate()
        .map_err(|e| anyhow!("invalid animation configuration: {}", e))?;

    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("creating {}", args.out_dir.display()))?;

    let rasterizer = Rasterizer::acquire(render.backend).await?;
    log_rasterizer(&rasterizer);

    let sink = Arc::new(RasterSink::new(Arc::new(rasterizer), render.options()));
    let mut frames = sink.subscribe();
    let cache = Arc::new(FrameCache::new());
    let sequencer =
        AnimationSequencer::new(source, Arc::clone(&cache), sink, period, &playback);

    sequencer.play(args.from, args.to, playback.fps).await?;

    let expected = (args.to - args.from) as usize + 1;
    let mut written = BTreeSet::new();
    let collect = async {
        while written.len() < expected {
            frames.changed().await?;
            let latest = frames.borrow_and_update().clone();
            let Some(frame) = latest else { continue };
            if !written.insert(frame.key.time_index) {
                continue;
            }

            let path = args
                .out_dir
                .join(format!("{}_t{:03}.png", period, frame.key.time_index));
            std::fs::write(&path, encode_png(&frame.raster)?)
                .with_context(|| format!("writing {}", path.display()))?;
            info!(frame = %frame.key, path = %path.display(), "Frame written");
        }
        Ok::<_, anyhow::Error>(())
    };

    let outcome = tokio::time::timeout(Duration::from_secs(args.timeout_secs), collect).await;
    sequencer.stop().await;

    match outcome {
        Ok(result) => result?,
        Err(_) => warn!(
            written = written.len(),
            expected,
            "Timed out before every frame was rendered"
        ),
    }

    let missing = (args.from..=args.to)
        .filter(|t| !written.contains(t))
        .collect();
    Ok(AnimateSummary {
        written: written.into_iter().collect(),
        missing,
        cache_hits: cache.stats().hits(),
        cache_misses: cache.stats().misses(),
    })
}
