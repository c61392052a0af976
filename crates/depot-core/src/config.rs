use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::retry::RetryPolicy;

/// Per-chunk retry parameters (optional `[retry]` section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum attempts per chunk (including the first).
    pub max_attempts: u32,
    /// Base backoff delay in seconds (e.g. 0.25 = 250ms).
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            base_delay_secs: 0.25,
            max_delay_secs: 30,
        }
    }
}

/// Global configuration loaded from `~/.config/depot/config.toml`.
///
/// The stall window and poll interval are fixed constants per run, never
/// derived from content length.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepotConfig {
    /// Number of byte-range chunks a download is split into.
    pub chunk_count: usize,
    /// Coordinator poll tick in milliseconds.
    pub poll_interval_ms: u64,
    /// Debounce window in seconds before a zero-throughput chunk is
    /// declared stalled and cancelled.
    pub stall_window_secs: u64,
    /// Optional retry policy; built-in defaults apply when missing.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
}

impl Default for DepotConfig {
    fn default() -> Self {
        Self {
            chunk_count: 8,
            poll_interval_ms: 500,
            stall_window_secs: 5,
            retry: None,
        }
    }
}

impl DepotConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    /// Poll ticks in the stall debounce window, at least one.
    pub fn stall_ticks(&self) -> u32 {
        let ticks = (self.stall_window_secs * 1000) / self.poll_interval_ms.max(1);
        ticks.max(1) as u32
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        match &self.retry {
            None => RetryPolicy::default(),
            Some(r) => RetryPolicy {
                max_attempts: r.max_attempts.max(1),
                base_delay: Duration::from_secs_f64(r.base_delay_secs.max(0.0)),
                max_delay: Duration::from_secs(r.max_delay_secs),
            },
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("depot")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<DepotConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = DepotConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: DepotConfig = toml::from_str(&data)?;
    Ok(cfg)
}
