//! In-memory cache of decoded frames.
//!
//! Frames are keyed by their composite key (`"{period}:t{time}"`). The cache
//! never evicts on its own; callers decide when to drop frames with
//! [`FrameCache::evict`], [`FrameCache::retain`] or [`FrameCache::clear`].
//!
//! ## Metrics
//!
//! - `frame_cache_hits_total` / `frame_cache_misses_total`: lookups
//! - `frame_cache_entries`: current number of frames

use precip_grid::Grid;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Decoded frames shared between the tick task and prefetchers.
#[derive(Default)]
pub struct FrameCache {
    frames: RwLock<HashMap<String, Arc<Grid>>>,
    stats: FrameCacheStats,
}

/// Lookup counters, readable without taking the cache lock.
#[derive(Default)]
pub struct FrameCacheStats {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
}

impl FrameCacheStats {
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Hit rate as a percentage (0-100).
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits();
        let total = hits + self.misses();
        if total == 0 {
            0.0
        } else {
            (hits as f64 / total as f64) * 100.0
        }
    }
}

impl FrameCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a frame, counting the hit or miss.
    pub async fn get(&self, key: &str) -> Option<Arc<Grid>> {
        let found = self.frames.read().await.get(key).cloned();
        if found.is_some() {
            self.stats.hits.fetch_add(1, Ordering::Relaxed);
            metrics::counter!("frame_cache_hits_total").increment(1);
        } else {
            self.stats.misses.fetch_add(1, Ordering::Relaxed);
            metrics::counter!("frame_cache_misses_total").increment(1);
        }
        found
    }

    /// Whether `key` is cached. Does not touch the counters.
    pub async fn contains(&self, key: &str) -> bool {
        self.frames.read().await.contains_key(key)
    }

    /// Store a frame; a later insert for the same key wins.
    pub async fn insert(&self, key: impl Into<String>, grid: Grid) -> Arc<Grid> {
        let key = key.into();
        let grid = Arc::new(grid);
        let mut frames = self.frames.write().await;
        frames.insert(key.clone(), Arc::clone(&grid));
        metrics::gauge!("frame_cache_entries").set(frames.len() as f64);
        debug!(key = %key, entries = frames.len(), "Cached frame");
        grid
    }

    /// Drop one frame, returning it if it was cached.
    pub async fn evict(&self, key: &str) -> Option<Arc<Grid>> {
        let mut frames = self.frames.write().await;
        let removed = frames.remove(key);
        metrics::gauge!("frame_cache_entries").set(frames.len() as f64);
        removed
    }

    /// Keep only the frames whose key satisfies `keep`.
    pub async fn retain<F>(&self, mut keep: F)
    where
        F: FnMut(&str) -> bool,
    {
        let mut frames = self.frames.write().await;
        frames.retain(|key, _| keep(key));
        metrics::gauge!("frame_cache_entries").set(frames.len() as f64);
    }

    pub async fn clear(&self) {
        self.frames.write().await.clear();
        metrics::gauge!("frame_cache_entries").set(0.0);
    }

    pub async fn len(&self) -> usize {
        self.frames.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.frames.read().await.is_empty()
    }

    pub fn stats(&self) -> &FrameCacheStats {
        &self.stats
    }
}
