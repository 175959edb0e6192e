//! Configuration for grid sources and animation playback.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Where frames come from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Base URL of the grid API (no trailing slash needed).
    pub base_url: String,

    /// Period identifier, `YYYYMM`.
    pub period: String,

    /// Spatial subsample rate requested from the API.
    pub subsample: u32,

    /// HTTP request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            period: "202512".to_string(),
            subsample: 2,
            timeout_secs: 60,
        }
    }
}

impl SourceConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("PRECIP_API_URL") {
            config.base_url = val;
        }

        if let Ok(val) = std::env::var("PRECIP_PERIOD") {
            config.period = val;
        }

        if let Ok(val) = std::env::var("PRECIP_SUBSAMPLE") {
            if let Ok(subsample) = val.parse() {
                config.subsample = subsample;
            }
        }

        if let Ok(val) = std::env::var("PRECIP_TIMEOUT_SECS") {
            if let Ok(secs) = val.parse() {
                config.timeout_secs = secs;
            }
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(format!("base_url must be an http(s) URL, got {}", self.base_url));
        }

        if self.period.len() != 6 || !self.period.bytes().all(|b| b.is_ascii_digit()) {
            return Err(format!("period must be YYYYMM, got {}", self.period));
        }

        if self.subsample == 0 {
            return Err("subsample must be > 0".to_string());
        }

        if self.timeout_secs == 0 {
            return Err("timeout_secs must be > 0".to_string());
        }

        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Delay between frames at `fps`.
///
/// `None` when `fps` is not a positive finite number or when its period
/// does not fit in a [`Duration`].
pub fn frame_delay(fps: f64) -> Option<Duration> {
    if !fps.is_finite() || fps <= 0.0 {
        return None;
    }
    Duration::try_from_secs_f64(1.0 / fps).ok()
}

/// Playback settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimationConfig {
    /// Frames per second.
    pub fps: f64,

    /// Frames fetched ahead of the one being shown.
    pub prefetch: usize,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            fps: 2.0,
            prefetch: 3,
        }
    }
}

impl AnimationConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("ANIMATION_FPS") {
            if let Ok(fps) = val.parse() {
                config.fps = fps;
            }
        }

        if let Ok(val) = std::env::var("ANIMATION_PREFETCH") {
            if let Ok(prefetch) = val.parse() {
                config.prefetch = prefetch;
            }
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if frame_delay(self.fps).is_none() {
            return Err(format!(
                "fps must be > 0 with a representable frame delay, got {}",
                self.fps
            ));
        }

        if self.prefetch > 64 {
            return Err("prefetch must be at most 64 frames".to_string());
        }

        Ok(())
    }
}
