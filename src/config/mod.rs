pub mod interval;

pub use interval::{parse_duration, IntervalSetting};

use crate::error::ConfigError;
use crate::poller::{DEFAULT_ENDPOINT, DEFAULT_USER_AGENT};
use crate::publisher::DEFAULT_SINK_CAPACITY;
use serde::Deserialize;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// State file used when none is configured
pub const DEFAULT_STATE_FILE: &str = "liftstream-state.json";

/// Complete Liftstream configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LiftstreamConfig {
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// `statefile` accepts a path, `true` (default path) or `false` (disabled)
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum StateFileSetting {
    Enabled(bool),
    Path(PathBuf),
}

impl Default for StateFileSetting {
    fn default() -> Self {
        StateFileSetting::Enabled(true)
    }
}

/// Poll loop configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// Poll period: seconds, or a string like "90s", "5m"
    #[serde(default)]
    pub interval: Option<IntervalSetting>,
    #[serde(default)]
    pub statefile: StateFileSetting,
    /// Publish a synthetic toggling record on cycles without changes
    #[serde(default)]
    pub dev: bool,
    /// Append every change as a JSON line to this file
    #[serde(default)]
    pub logfile: Option<PathBuf>,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            interval: None,
            statefile: StateFileSetting::default(),
            dev: false,
            logfile: None,
            endpoint: default_endpoint(),
            user_agent: default_user_agent(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

impl FeedConfig {
    /// Effective poll period, falling back to the default when unset or invalid
    pub fn interval(&self) -> Duration {
        match &self.interval {
            None => interval::DEFAULT_INTERVAL,
            Some(setting) => setting.resolve().unwrap_or_else(|| {
                warn!(interval = ?setting, "Invalid poll interval, using default");
                interval::DEFAULT_INTERVAL
            }),
        }
    }

    /// Effective state file path, `None` when persistence is disabled
    pub fn state_file(&self) -> Option<PathBuf> {
        match &self.statefile {
            StateFileSetting::Enabled(true) => Some(PathBuf::from(DEFAULT_STATE_FILE)),
            StateFileSetting::Enabled(false) => None,
            StateFileSetting::Path(path) if path.as_os_str().is_empty() => None,
            StateFileSetting::Path(path) => Some(path.clone()),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds.max(1))
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Messages buffered per subscriber before it starts losing updates
    #[serde(default = "default_sink_capacity")]
    pub sink_capacity: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_sink_capacity() -> usize {
    DEFAULT_SINK_CAPACITY
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            sink_capacity: default_sink_capacity(),
        }
    }
}

impl ServerConfig {
    /// Bind address; "*" and "" mean all interfaces
    pub fn bind_addr(&self) -> String {
        let host = match self.host.as_str() {
            "" | "*" => "0.0.0.0",
            host => host,
        };
        format!("{}:{}", host, self.port)
    }
}

impl LiftstreamConfig {
    /// Apply `LIFTSTREAM_*` overrides using `lookup` to read variables
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("LIFTSTREAM_INTERVAL") {
            self.feed.interval = Some(IntervalSetting::Text(v));
        }
        if let Some(v) = lookup("LIFTSTREAM_STATEFILE") {
            self.feed.statefile = match v.parse::<bool>() {
                Ok(b) => StateFileSetting::Enabled(b),
                Err(_) => StateFileSetting::Path(PathBuf::from(v)),
            };
        }
        if let Some(v) = lookup("LIFTSTREAM_DEV") {
            if let Ok(b) = v.parse::<bool>() {
                self.feed.dev = b;
            }
        }
        if let Some(v) = lookup("LIFTSTREAM_LOGFILE") {
            self.feed.logfile = if v.is_empty() { None } else { Some(PathBuf::from(v)) };
        }
        if let Some(v) = lookup("LIFTSTREAM_HOST") {
            self.server.host = v;
        }
        if let Some(v) = lookup("LIFTSTREAM_PORT") {
            if let Ok(n) = v.parse::<u16>() {
                self.server.port = n;
            }
        }
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }
}

/// Load configuration from TOML file
pub fn load_config(path: &Path) -> Result<LiftstreamConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Toml {
        path: path.to_path_buf(),
        source,
    })
}

/// Like [`load_config`], but a missing file yields the defaults
pub fn load_config_or_default(path: &Path) -> Result<LiftstreamConfig, ConfigError> {
    match load_config(path) {
        Err(ConfigError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
            info!(path = %path.display(), "No config file, using defaults");
            Ok(LiftstreamConfig::default())
        }
        other => other,
    }
}
