//! Grid sources: where the encoded bytes of a frame come from.

use async_trait::async_trait;
use bytes::Bytes;
use precip_grid::{codec, Grid};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use crate::config::SourceConfig;
use crate::error::SourceError;

/// One frame on a period's time axis.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FrameKey {
    pub period: String,
    pub time_index: u32,
}

impl FrameKey {
    pub fn new(period: impl Into<String>, time_index: u32) -> Self {
        Self {
            period: period.into(),
            time_index,
        }
    }

    /// Composite cache key, `"{period}:t{time_index}"`.
    pub fn cache_key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for FrameKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:t{}", self.period, self.time_index)
    }
}

/// Anything that can produce the binary encoding of a frame.
#[async_trait]
pub trait GridSource: Send + Sync {
    async fn fetch(&self, key: &FrameKey) -> Result<Bytes, SourceError>;
}

#[derive(Deserialize)]
struct PeriodsResponse {
    periods: Vec<String>,
}

#[derive(Deserialize)]
struct TimesResponse {
    times: Vec<String>,
}

/// Client for the precipitation grid API.
pub struct HttpGridSource {
    client: Client,
    base_url: String,
    subsample: u32,
}

impl HttpGridSource {
    pub fn new(config: &SourceConfig) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .pool_max_idle_per_host(4)
            .tcp_nodelay(true)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            subsample: config.subsample,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<reqwest::Response, SourceError> {
        let url = self.url(path);
        let response = self.client.get(&url).query(query).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                url,
            });
        }
        Ok(response)
    }

    fn frame_query(&self, key: &FrameKey) -> [(&'static str, String); 3] {
        [
            ("period", key.period.clone()),
            ("time", key.time_index.to_string()),
            ("subsample", self.subsample.to_string()),
        ]
    }

    /// Periods the API serves, `YYYYMM`.
    pub async fn periods(&self) -> Result<Vec<String>, SourceError> {
        let body: PeriodsResponse = self.get("/api/periods", &[]).await?.json().await?;
        Ok(body.periods)
    }

    /// Timestamps on a period's time axis, in frame order.
    pub async fn times(&self, period: &str) -> Result<Vec<String>, SourceError> {
        let body: TimesResponse = self
            .get("/api/times", &[("period", period.to_string())])
            .await?
            .json()
            .await?;
        Ok(body.times)
    }

    /// Fetch the JSON rendition of a frame and decode it.
    pub async fn fetch_document(&self, key: &FrameKey) -> Result<Grid, crate::AnimationError> {
        let text = self
            .get("/api/precipitation", &self.frame_query(key))
            .await?
            .text()
            .await
            .map_err(SourceError::from)?;
        Ok(codec::decode_json(&text)?)
    }
}

#[async_trait]
impl GridSource for HttpGridSource {
    #[instrument(skip(self), fields(frame = %key))]
    async fn fetch(&self, key: &FrameKey) -> Result<Bytes, SourceError> {
        let bytes = self
            .get("/api/precipitation/binary", &self.frame_query(key))
            .await?
            .bytes()
            .await?;
        debug!(len = bytes.len(), "Fetched frame");
        Ok(bytes)
    }
}

/// Encoded frames held in memory, for replays and tests.
#[derive(Default)]
pub struct MemoryGridSource {
    frames: RwLock<HashMap<FrameKey, Bytes>>,
    fetches: AtomicU64,
}

impl MemoryGridSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store raw bytes for `key`, replacing any previous entry.
    pub async fn insert(&self, key: FrameKey, bytes: Bytes) {
        self.frames.write().await.insert(key, bytes);
    }

    /// Encode and store `grid` for `key`.
    pub async fn insert_grid(&self, key: FrameKey, grid: &Grid) {
        self.insert(key, codec::encode(grid)).await;
    }

    /// Number of `fetch` calls served, including misses.
    pub fn fetches(&self) -> u64 {
        self.fetches.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl GridSource for MemoryGridSource {
    async fn fetch(&self, key: &FrameKey) -> Result<Bytes, SourceError> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        self.frames
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(key.to_string()))
    }
}
