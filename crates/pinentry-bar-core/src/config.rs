//! Configuration types and loading for pinentry-bar.
//!
//! Configuration is loaded from `~/.config/pinentry-bar/config.toml`.
//! Command-line flags override what the file says.
//!
//! # Error Handling
//!
//! - If the config file doesn't exist, default values are returned.
//! - If the config file exists but is invalid, an error is returned (fail fast).
//!
//! # Example Configuration
//!
//! ```toml
//! [bar]
//! prompt = "PIN:"     # drawn before the caller's prompt
//! marker = "*"        # shown once per character of the secret
//! top = true          # false anchors the bar at the bottom
//! monitor = 1         # optional monitor override
//!
//! [session]
//! timeout = 0         # seconds, 0 = wait forever
//! capacity = 8192     # secret buffer size in bytes
//!
//! [grab]
//! attempts = 1000
//! interval_ms = 1
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::buffer::{DEFAULT_CAPACITY, MAX_CAPACITY};
use crate::grab::{GrabPolicy, DEFAULT_GRAB_ATTEMPTS};
use crate::types::SessionOptions;

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// The file parsed but holds a value that cannot be used.
    #[error("Invalid config value: {0}")]
    Invalid(String),
}

/// Main configuration struct.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Bar appearance and placement.
    pub bar: BarConfig,
    /// Session limits.
    pub session: SessionConfig,
    /// Exclusive input acquisition.
    pub grab: GrabConfig,
}

/// Configuration for the bar itself.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BarConfig {
    /// Prompt drawn ahead of the caller's prompt (default: empty).
    pub prompt: String,
    /// Marker glyphs shown per character of the secret (default: "*").
    pub marker: String,
    /// Anchor at the top of the monitor (default: true).
    pub top: bool,
    /// Monitor index override (default: follow the focused window).
    pub monitor: Option<usize>,
}

impl Default for BarConfig {
    fn default() -> Self {
        Self {
            prompt: String::new(),
            marker: "*".to_string(),
            top: true,
            monitor: None,
        }
    }
}

/// Configuration for a prompt session.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Timeout in seconds (default: 0 = disabled).
    pub timeout: u64,
    /// Secret buffer capacity in bytes (default: 8192).
    pub capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout: 0,
            capacity: DEFAULT_CAPACITY,
        }
    }
}

/// Configuration for keyboard acquisition.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GrabConfig {
    /// Number of attempts before giving up (default: 1000).
    pub attempts: u32,
    /// Milliseconds between attempts (default: 1).
    pub interval_ms: u64,
}

impl Default for GrabConfig {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_GRAB_ATTEMPTS,
            interval_ms: 1,
        }
    }
}

impl Config {
    /// Returns the default configuration file path.
    ///
    /// Returns `~/.config/pinentry-bar/config.toml` using `dirs::config_dir()`,
    /// or `None` if the config directory cannot be determined.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("pinentry-bar").join("config.toml"))
    }

    /// Load configuration from the default path.
    ///
    /// - Returns `Ok(Config::default())` if no config file exists.
    /// - Returns `Err` if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from a specific path.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the session cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session.capacity > MAX_CAPACITY {
            return Err(ConfigError::Invalid(format!(
                "session.capacity {} exceeds the maximum of {} bytes",
                self.session.capacity, MAX_CAPACITY
            )));
        }
        if self.bar.marker.chars().any(char::is_control) {
            return Err(ConfigError::Invalid(
                "bar.marker must not contain control characters".to_string(),
            ));
        }
        Ok(())
    }

    /// Session timeout; zero means none.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.session.timeout)
    }

    /// Runtime options for [`InputSession`](crate::session::InputSession)s.
    ///
    /// An empty marker, or one holding control characters, falls back to
    /// `*`. The capacity is kept within `1..=MAX_CAPACITY`.
    pub fn session_options(&self) -> SessionOptions {
        let marker = &self.bar.marker;
        let marker = if marker.is_empty() || marker.chars().any(char::is_control) {
            BarConfig::default().marker
        } else {
            marker.clone()
        };

        SessionOptions {
            bar_prompt: self.bar.prompt.clone(),
            marker,
            top_bar: self.bar.top,
            capacity: self.session.capacity.clamp(1, MAX_CAPACITY),
            grab: GrabPolicy {
                attempts: self.grab.attempts,
                interval: Duration::from_millis(self.grab.interval_ms),
            },
        }
    }
}
