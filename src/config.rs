//! Application configuration
//!
//! Loaded from TOML. Every section and field falls back to its default, so a
//! partial file (or no file at all) is valid.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::*;
use crate::error::{Error, Result};

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub downstream: DownstreamConfig,
    pub control: ControlConfig,
    pub switcher: SwitcherConfig,
    pub feeds: FeedsConfig,
}

/// Mixing engine connection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownstreamConfig {
    /// `host:port` of the engine's command socket
    pub address: String,
    pub connect_timeout_ms: u64,
    /// Deadline for a solicited reply; 0 waits forever
    pub read_timeout_ms: u64,
    /// How long to wait for the greeting banner after connect
    pub banner_timeout_ms: u64,
    /// TCP keepalive idle time; 0 disables keepalive
    pub keepalive_secs: u64,
}

impl Default for DownstreamConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ENGINE_ADDRESS.to_string(),
            connect_timeout_ms: 3000,
            read_timeout_ms: 5000,
            banner_timeout_ms: 1000,
            keepalive_secs: 10,
        }
    }
}

impl DownstreamConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        (self.read_timeout_ms > 0).then(|| Duration::from_millis(self.read_timeout_ms))
    }

    pub fn banner_timeout(&self) -> Duration {
        Duration::from_millis(self.banner_timeout_ms)
    }

    pub fn keepalive(&self) -> Option<Duration> {
        (self.keepalive_secs > 0).then(|| Duration::from_secs(self.keepalive_secs))
    }
}

/// HTTP control and event endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    pub bind_address: String,
    pub http_port: u16,
    /// Requests held while one is being processed
    pub queue_depth: usize,
    /// Notifications buffered per subscriber before it starts missing them
    pub event_buffer: usize,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            http_port: DEFAULT_HTTP_PORT,
            queue_depth: 32,
            event_buffer: 256,
        }
    }
}

/// One downstream keyer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DskConfig {
    pub feed_id: u32,
    /// Fade length in seconds; 0 switches instantly
    #[serde(default)]
    pub transition_duration: f64,
}

/// Bus and keyer model
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SwitcherConfig {
    pub framerate: f64,
    pub preview: u32,
    pub program: u32,
    pub feeds_count: u32,
    /// Default cut transition length in seconds
    pub cut_duration: f64,
    pub dsks: Vec<DskConfig>,
}

impl Default for SwitcherConfig {
    fn default() -> Self {
        Self {
            framerate: DEFAULT_FRAMERATE,
            preview: DEFAULT_PREVIEW,
            program: DEFAULT_PROGRAM,
            feeds_count: DEFAULT_FEEDS_COUNT,
            cut_duration: DEFAULT_CUT_DURATION_SECS,
            dsks: DEFAULT_DSK_FEED_IDS
                .iter()
                .map(|&feed_id| DskConfig {
                    feed_id,
                    transition_duration: 0.0,
                })
                .collect(),
        }
    }
}

/// Feed registry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedsConfig {
    pub capacity: usize,
    pub width: u32,
    pub height: u32,
    /// Engine frame rate string, e.g. `30/1`
    pub framerate: String,
}

impl Default for FeedsConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_FEED_CAPACITY,
            width: 1280,
            height: 720,
            framerate: "30/1".to_string(),
        }
    }
}

impl AppConfig {
    /// Parse a TOML document
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    /// Per-user config file location
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "switcher-control")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load the explicit path, else the per-user file if present, else defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }

        match Self::default_path() {
            Some(path) if path.exists() => {
                tracing::info!("Loading config from {}", path.display());
                Self::load(&path)
            }
            _ => Ok(Self::default()),
        }
    }

    /// Reject values the switcher cannot work with
    pub fn validate(&self) -> Result<()> {
        let switcher = &self.switcher;

        if !(switcher.framerate.is_finite() && switcher.framerate > 0.0) {
            return Err(Error::Config(format!(
                "framerate must be positive, got {}",
                switcher.framerate
            )));
        }
        if !transition_in_range(switcher.cut_duration) {
            return Err(Error::Config(format!(
                "cut_duration must be between 0 and {} seconds, got {}",
                MAX_TRANSITION_SECS, switcher.cut_duration
            )));
        }
        if switcher.dsks.is_empty() {
            return Err(Error::Config("at least one DSK is required".to_string()));
        }
        if let Some(dsk) = switcher
            .dsks
            .iter()
            .find(|dsk| !transition_in_range(dsk.transition_duration))
        {
            return Err(Error::Config(format!(
                "DSK on feed {} has invalid transition_duration {}",
                dsk.feed_id, dsk.transition_duration
            )));
        }
        if self.feeds.capacity == 0 {
            return Err(Error::Config("feed capacity must be at least 1".to_string()));
        }
        if self.control.queue_depth == 0 || self.control.event_buffer == 0 {
            return Err(Error::Config(
                "queue_depth and event_buffer must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

fn transition_in_range(seconds: f64) -> bool {
    (0.0..=MAX_TRANSITION_SECS).contains(&seconds)
}
