//! Configuration management for the Moo file-manager client.
//!
//! This module provides TOML-based configuration file loading and saving.
//! The default configuration path is `~/.config/moo-files/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::credentials::{DEFAULT_KEY_NAME, SERVICE_NAME};
use crate::state::ViewMode;

/// Environment variable holding an API token that takes precedence over the
/// credential store.
pub const TOKEN_ENV: &str = "MOO_API_TOKEN";

/// Upper bound for `api.request_timeout_secs`.
const MAX_TIMEOUT_SECS: u64 = 3600;

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("base_url must be an http:// or https:// URL, got {0}")]
    InvalidBaseUrl(String),

    #[error("request_timeout_secs must be between 0 and 3600 seconds, got {0}")]
    InvalidTimeout(u64),

    #[error("log level must be one of: trace, debug, info, warn, error; got {0}")]
    InvalidLogLevel(String),

    #[error("root_dir must be an absolute remote path, got {0}")]
    InvalidRootDir(String),
}

/// Valid log level values for tracing configuration.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    /// Admin API endpoint.
    pub api: ApiConfig,

    /// Credential store entry names.
    pub credentials: CredentialsConfig,

    /// Local download destination.
    pub downloads: DownloadsConfig,

    /// File-manager defaults.
    pub manager: ManagerConfig,

    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Admin API configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL the `/file-manager/*` paths are appended to.
    pub base_url: String,

    /// Per-request timeout in seconds (0 = no timeout).
    pub request_timeout_secs: u64,
}

/// Credential store configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CredentialsConfig {
    /// Keychain service name.
    pub service: String,

    /// Keychain entry holding the API token.
    pub key_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DownloadsConfig {
    /// Directory downloaded files are written to.
    pub directory: PathBuf,
}

/// File-manager defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ManagerConfig {
    /// Remote directory opened on start.
    pub root_dir: String,

    /// Listing layout.
    pub view_mode: ViewMode,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Logging level (trace, debug, info, warn, error).
    pub level: String,

    /// Optional log file. Logs go to stderr when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            request_timeout_secs: 0,
        }
    }
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            service: SERVICE_NAME.to_string(),
            key_name: DEFAULT_KEY_NAME.to_string(),
        }
    }
}

impl Default for DownloadsConfig {
    fn default() -> Self {
        Self {
            directory: default_download_dir(),
        }
    }
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            root_dir: fm_protocol::path::ROOT.to_string(),
            view_mode: ViewMode::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// Returns the default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("moo-files")
        .join("config.toml")
}

fn default_download_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

impl Config {
    /// Apply environment variable overrides to the configuration.
    ///
    /// Environment variables take precedence over config file values.
    /// Supported variables:
    /// - MOO_API_BASE_URL: Override the API base URL
    /// - MOO_LOG_LEVEL: Override log level (trace, debug, info, warn, error)
    /// - MOO_DOWNLOAD_DIR: Override the download directory
    ///
    /// The API token variable ([`TOKEN_ENV`]) is read by the caller when it
    /// builds the token store.
    pub fn apply_env_overrides(&mut self) {
        if let Some(url) = non_empty_env("MOO_API_BASE_URL") {
            tracing::info!("Overriding base_url from environment: {}", url);
            self.api.base_url = url;
        }

        if let Some(level) = non_empty_env("MOO_LOG_LEVEL") {
            tracing::info!("Overriding log level from environment: {}", level);
            self.logging.level = level;
        }

        if let Some(dir) = non_empty_env("MOO_DOWNLOAD_DIR") {
            tracing::info!("Overriding download directory from environment: {}", dir);
            self.downloads.directory = PathBuf::from(dir);
        }
    }

    /// Validate the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.base_url()?;

        if self.api.request_timeout_secs > MAX_TIMEOUT_SECS {
            return Err(ConfigError::InvalidTimeout(self.api.request_timeout_secs));
        }

        let level = self.logging.level.to_lowercase();
        if !VALID_LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(self.logging.level.clone()));
        }

        if !self.manager.root_dir.starts_with('/') {
            return Err(ConfigError::InvalidRootDir(self.manager.root_dir.clone()));
        }

        Ok(())
    }

    /// Parsed API base URL.
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        let invalid = || ConfigError::InvalidBaseUrl(self.api.base_url.clone());
        let url = Url::parse(&self.api.base_url).map_err(|_| invalid())?;
        match url.scheme() {
            "http" | "https" if url.has_host() => Ok(url),
            _ => Err(invalid()),
        }
    }

    /// Request timeout, or `None` when requests may run indefinitely.
    pub fn request_timeout(&self) -> Option<Duration> {
        match self.api.request_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Load configuration from a file.
    ///
    /// If the file does not exist, returns the default configuration.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self> {
        Self::load(default_config_path())
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| anyhow::anyhow!("Invalid TOML configuration: {}", format_toml_error(&e)))
    }

    /// Save configuration to a file.
    ///
    /// Creates parent directories if they don't exist.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let contents = self.to_toml()?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::debug!("Configuration saved to {:?}", path);
        Ok(())
    }

    /// Serialize configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

/// Format a TOML deserialization error for user-friendly display.
fn format_toml_error(error: &toml::de::Error) -> String {
    let mut msg = error.message().to_string();

    if let Some(span) = error.span() {
        msg.push_str(&format!(" (at position {}..{})", span.start, span.end));
    }

    msg
}
