use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Retry policy parameters (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per fetch (including the first).
    pub max_attempts: u32,
    /// Base delay in seconds for exponential backoff (e.g. 0.25 = 250ms).
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay_secs: 0.25,
            max_delay_secs: 30,
        }
    }
}

/// Global configuration loaded from `~/.config/yoink/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YoinkConfig {
    /// Number of concurrent fetch workers when `--jobs` is not given.
    pub jobs: usize,
    /// Connect timeout for each HTTP request, in seconds.
    pub connect_timeout_secs: u64,
    /// Overall timeout for each HTTP request, in seconds.
    pub request_timeout_secs: u64,
    /// Optional retry policy; if missing, built-in defaults are used.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
}

impl Default for YoinkConfig {
    fn default() -> Self {
        Self {
            jobs: 4,
            connect_timeout_secs: 30,
            request_timeout_secs: 600,
            retry: None,
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("yoink")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<YoinkConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = YoinkConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: YoinkConfig = toml::from_str(&data)?;
    Ok(cfg)
}
