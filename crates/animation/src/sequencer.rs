//! Time-axis playback of precipitation frames.
//!
//! A session is one tick task driving frames `from..=to` in a loop. Each
//! tick loads the current frame (cache first), hands it to a [`FrameSink`],
//! advances the cursor and sleeps `1 / fps`. The next few frames are
//! prefetched into the cache in the background, wrapping to `from` after
//! `to`.
//!
//! # Late frames
//!
//! Presentation happens while holding the session lock, and only after
//! checking that the session generation is unchanged. [`AnimationSequencer::stop`]
//! bumps the generation under the same lock, so once `stop()` returns no
//! frame from the stopped session is presented, no matter when its fetches
//! complete.

use async_trait::async_trait;
use precip_grid::{codec, Grid};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::cache::FrameCache;
use crate::config::{frame_delay, AnimationConfig};
use crate::error::{AnimationError, Result};
use crate::source::{FrameKey, GridSource};

/// Snapshot of the playback position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AnimationCursor {
    pub from: u32,
    pub to: u32,
    pub current: u32,
    pub fps: f64,
    pub playing: bool,
    pub generation: u64,
}

impl Default for AnimationCursor {
    fn default() -> Self {
        Self {
            from: 0,
            to: 0,
            current: 0,
            fps: AnimationConfig::default().fps,
            playing: false,
            generation: 0,
        }
    }
}

impl AnimationCursor {
    /// Frame after `current`, wrapping to `from` after `to`.
    pub fn next(&self) -> u32 {
        next_frame(self.current, self.from, self.to)
    }
}

/// A decoded frame handed to a sink.
#[derive(Debug, Clone)]
pub struct Frame {
    pub key: FrameKey,
    pub grid: Arc<Grid>,
    pub generation: u64,
}

/// Receiver of presented frames.
///
/// `present` runs while the session lock is held; a slow sink delays
/// `stop()` until the frame in hand is finished.
#[async_trait]
pub trait FrameSink: Send + Sync {
    async fn present(&self, frame: &Frame) -> Result<()>;
}

fn next_frame(current: u32, from: u32, to: u32) -> u32 {
    if current >= to {
        from
    } else {
        current + 1
    }
}

/// Time indices to prefetch after `current`, in playback order.
///
/// Wraps to `from` after `to` and never repeats a frame or includes
/// `current` itself.
pub fn prefetch_indices(current: u32, from: u32, to: u32, count: usize) -> Vec<u32> {
    let span = to.saturating_sub(from) as usize + 1;
    let mut indices = Vec::with_capacity(count.min(span));
    let mut t = current;
    for _ in 0..count.min(span - 1) {
        t = next_frame(t, from, to);
        indices.push(t);
    }
    indices
}

struct Session {
    cursor: AnimationCursor,
    token: Option<CancellationToken>,
    task: Option<JoinHandle<()>>,
}

impl Session {
    /// Cancel the running session, if any, and invalidate its generation.
    fn halt(&mut self) -> Option<JoinHandle<()>> {
        if let Some(token) = self.token.take() {
            token.cancel();
        }
        self.cursor.generation += 1;
        self.cursor.playing = false;
        self.task.take()
    }
}

struct Shared {
    source: Arc<dyn GridSource>,
    cache: Arc<FrameCache>,
    sink: Arc<dyn FrameSink>,
    period: String,
    prefetch: usize,
    session: Mutex<Session>,
}

impl Shared {
    /// Cache-first load of one frame.
    async fn load(&self, key: &FrameKey) -> Result<Arc<Grid>> {
        let cache_key = key.cache_key();
        if let Some(grid) = self.cache.get(&cache_key).await {
            return Ok(grid);
        }
        let bytes = self.source.fetch(key).await?;
        let grid = codec::decode(&bytes)?;
        Ok(self.cache.insert(cache_key, grid).await)
    }

    /// Fetch and cache a frame that is not cached yet. Never presents.
    async fn warm(&self, key: &FrameKey) {
        let cache_key = key.cache_key();
        if self.cache.contains(&cache_key).await {
            return;
        }
        let decoded = match self.source.fetch(key).await {
            Ok(bytes) => codec::decode(&bytes).map_err(AnimationError::from),
            Err(e) => Err(e.into()),
        };
        match decoded {
            Ok(grid) => {
                self.cache.insert(cache_key, grid).await;
                metrics::counter!("animation_prefetched_frames_total").increment(1);
            }
            Err(e) => debug!(frame = %key, error = %e, "Prefetch failed"),
        }
    }

    /// Present `frame` if its session is still current, then advance.
    ///
    /// Returns false when the session has moved on; nothing is presented in
    /// that case.
    async fn present_if_current(&self, generation: u64, frame: Option<Frame>) -> bool {
        let mut session = self.session.lock().await;
        if session.cursor.generation != generation || !session.cursor.playing {
            debug!(generation, "Dropping frame from a stopped session");
            return false;
        }

        if let Some(frame) = frame {
            match self.sink.present(&frame).await {
                Ok(()) => metrics::counter!("animation_frames_presented_total").increment(1),
                Err(e) => {
                    warn!(frame = %frame.key, error = %e, "Sink failed to present frame");
                    metrics::counter!("animation_ticks_skipped_total").increment(1);
                }
            }
        }

        session.cursor.current = session.cursor.next();
        true
    }

    fn spawn_prefetch(self: &Arc<Self>, cursor: &AnimationCursor) {
        for t in prefetch_indices(cursor.current, cursor.from, cursor.to, self.prefetch) {
            let shared = Arc::clone(self);
            let key = FrameKey::new(self.period.clone(), t);
            tokio::spawn(async move { shared.warm(&key).await });
        }
    }
}

/// Drives playback of one period's frames into a [`FrameSink`].
pub struct AnimationSequencer {
    shared: Arc<Shared>,
}

impl AnimationSequencer {
    pub fn new(
        source: Arc<dyn GridSource>,
        cache: Arc<FrameCache>,
        sink: Arc<dyn FrameSink>,
        period: impl Into<String>,
        config: &AnimationConfig,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                source,
                cache,
                sink,
                period: period.into(),
                prefetch: config.prefetch,
                session: Mutex::new(Session {
                    cursor: AnimationCursor {
                        fps: config.fps,
                        ..Default::default()
                    },
                    token: None,
                    task: None,
                }),
            }),
        }
    }

    pub fn cache(&self) -> &Arc<FrameCache> {
        &self.shared.cache
    }

    /// Start playing `from..=to`, replacing any running session.
    #[instrument(skip(self))]
    pub async fn play(&self, from: u32, to: u32, fps: f64) -> Result<()> {
        if from > to {
            return Err(AnimationError::InvalidRange { from, to });
        }
        let delay = frame_delay(fps).ok_or(AnimationError::InvalidFps(fps))?;

        let mut session = self.shared.session.lock().await;
        if let Some(previous) = session.halt() {
            previous.abort();
        }

        let generation = session.cursor.generation;
        session.cursor = AnimationCursor {
            from,
            to,
            current: from,
            fps,
            playing: true,
            generation,
        };

        let token = CancellationToken::new();
        session.token = Some(token.clone());
        session.task = Some(tokio::spawn(run_session(
            Arc::clone(&self.shared),
            generation,
            delay,
            token,
        )));

        info!(
            period = %self.shared.period,
            from,
            to,
            fps,
            generation,
            "Animation started"
        );
        Ok(())
    }

    /// Stop playback and reset the cursor to the start of the range.
    ///
    /// After this returns no frame of the stopped session is presented.
    pub async fn stop(&self) {
        let task = {
            let mut session = self.shared.session.lock().await;
            let was_playing = session.cursor.playing;
            let task = session.halt();
            session.cursor.current = session.cursor.from;
            if was_playing {
                info!(generation = session.cursor.generation, "Animation stopped");
            }
            task
        };

        // The task exits at its next cancellation point; it cannot present.
        if let Some(task) = task {
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    warn!(error = %e, "Animation task ended abnormally");
                }
            }
        }
    }

    pub async fn cursor(&self) -> AnimationCursor {
        self.shared.session.lock().await.cursor
    }

    pub async fn is_playing(&self) -> bool {
        self.cursor().await.playing
    }
}

async fn run_session(
    shared: Arc<Shared>,
    generation: u64,
    delay: Duration,
    token: CancellationToken,
) {
    loop {
        let cursor = {
            let session = shared.session.lock().await;
            if session.cursor.generation != generation {
                return;
            }
            session.cursor
        };

        shared.spawn_prefetch(&cursor);

        let key = FrameKey::new(shared.period.clone(), cursor.current);
        let loaded = tokio::select! {
            _ = token.cancelled() => return,
            loaded = shared.load(&key) => loaded,
        };

        let frame = match loaded {
            Ok(grid) => Some(Frame {
                key,
                grid,
                generation,
            }),
            Err(e) => {
                warn!(frame = %key, error = %e, "Skipping frame");
                metrics::counter!("animation_ticks_skipped_total").increment(1);
                None
            }
        };

        if !shared.present_if_current(generation, frame).await {
            return;
        }

        tokio::select! {
            _ = token.cancelled() => return,
            _ = tokio::time::sleep(delay) => {}
        }
    }
}
