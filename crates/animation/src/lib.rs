//! Frame sources, caching and time-axis animation for precipitation overlays.
//!
//! # Architecture
//!
//! ```text
//! GridSource (HTTP / memory) ──► FrameCache ──► AnimationSequencer ──► FrameSink
//!                                    ▲                 │                  │
//!                                    └── prefetch ◄────┘             RasterSink
//!                                                                  (Rasterizer)
//! ```
//!
//! The sequencer owns a single tick task per session. Prefetchers only fill
//! the cache; presentation is reserved to the tick task and guarded by the
//! session generation.

pub mod cache;
pub mod config;
pub mod error;
pub mod sequencer;
pub mod sink;
pub mod source;

pub use cache::{FrameCache, FrameCacheStats};
pub use config::{frame_delay, AnimationConfig, SourceConfig};
pub use error::{AnimationError, Result, SourceError};
pub use sequencer::{prefetch_indices, AnimationCursor, AnimationSequencer, Frame, FrameSink};
pub use sink::{RasterSink, RenderedFrame};
pub use source::{FrameKey, GridSource, HttpGridSource, MemoryGridSource};
