//! Command-line arguments.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "precip-overlay")]
#[command(about = "Render, animate and query precipitation grids")]
pub struct Cli {
    /// Log level (overridden by RUST_LOG filter directives)
    #[arg(long, default_value = "info", global = true)]
    pub log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Rasterize a grid into a PNG overlay
    Render(RenderArgs),
    /// Sample the grid at the cell nearest a coordinate
    Point(PointArgs),
    /// Average the grid over a GeoJSON polygon
    Area(AreaArgs),
    /// Print the legend and optionally draw a colorbar
    Legend(LegendArgs),
    /// Summarize a grid: shape, stats and overlay bounds
    Info(GridArgs),
    /// Convert a JSON grid document into the binary wire format
    Convert(ConvertArgs),
    /// List the periods served by the API
    Periods(ApiArgs),
    /// List the time axis of a period
    Times(TimesArgs),
    /// Play a range of frames and write each one as a PNG
    Animate(AnimateArgs),
}

/// Where to read the grid from.
#[derive(Args, Debug, Clone, Default)]
pub struct GridArgs {
    /// Local grid file: binary wire format, or JSON when it ends in `.json`
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Period (YYYYMM) to fetch from the API when no file is given
    #[arg(long)]
    pub period: Option<String>,

    /// Time index within the period
    #[arg(long, default_value_t = 0)]
    pub time: u32,

    #[command(flatten)]
    pub api: ApiArgs,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ApiArgs {
    /// Grid API base URL (defaults to PRECIP_API_URL)
    #[arg(long)]
    pub api_url: Option<String>,
}

/// Overrides on top of the RENDER_* environment.
#[derive(Args, Debug, Clone, Default)]
pub struct RenderSettings {
    /// auto, gpu or cpu
    #[arg(long)]
    pub backend: Option<String>,

    /// Overlay opacity (0-1)
    #[arg(long)]
    pub opacity: Option<f32>,

    /// Output pixels per grid cell
    #[arg(long)]
    pub scale: Option<u32>,
}

#[derive(Args, Debug, Clone)]
pub struct RenderArgs {
    #[command(flatten)]
    pub grid: GridArgs,

    #[command(flatten)]
    pub render: RenderSettings,

    /// Output PNG path
    #[arg(short, long)]
    pub output: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct PointArgs {
    #[command(flatten)]
    pub grid: GridArgs,

    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,

    #[arg(long, allow_hyphen_values = true)]
    pub lon: f64,
}

#[derive(Args, Debug, Clone)]
pub struct AreaArgs {
    #[command(flatten)]
    pub grid: GridArgs,

    /// GeoJSON Polygon, MultiPolygon or Feature
    #[arg(short, long)]
    pub geojson: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct LegendArgs {
    /// Write the colorbar to this PNG
    #[arg(long)]
    pub colorbar: Option<PathBuf>,

    #[arg(long, default_value_t = 360)]
    pub width: u32,

    #[arg(long, default_value_t = 24)]
    pub height: u32,
}

#[derive(Args, Debug, Clone)]
pub struct ConvertArgs {
    /// JSON grid document
    #[arg(short, long)]
    pub input: PathBuf,

    /// Binary output path
    #[arg(short, long)]
    pub output: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct TimesArgs {
    #[arg(long)]
    pub period: Option<String>,

    #[command(flatten)]
    pub api: ApiArgs,
}

#[derive(Args, Debug, Clone)]
pub struct AnimateArgs {
    #[arg(long)]
    pub period: Option<String>,

    #[arg(long, default_value_t = 0)]
    pub from: u32,

    #[arg(long)]
    pub to: u32,

    /// Frames per second (defaults to ANIMATION_FPS)
    #[arg(long)]
    pub fps: Option<f64>,

    /// Frames fetched ahead (defaults to ANIMATION_PREFETCH)
    #[arg(long)]
    pub prefetch: Option<usize>,

    /// Directory for `{period}_t{time}.png` frames
    #[arg(long)]
    pub out_dir: PathBuf,

    /// Give up on frames not rendered within this many seconds
    #[arg(long, default_value_t = 120)]
    pub timeout_secs: u64,

    #[command(flatten)]
    pub render: RenderSettings,

    #[command(flatten)]
    pub api: ApiArgs,
}
