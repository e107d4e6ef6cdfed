//! Server configuration
//!
//! Loaded once at process start from a YAML file. Every field has a default,
//! so an empty file yields a working configuration.

use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub limits: LimitsConfig,
    pub keep_alive: KeepAliveConfig,
    /// Raises the log level from INFO to DEBUG
    pub debug: bool,
}

/// Listener and storage settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub backlog: u32,
    /// Directory that receives spillover files
    pub temporary_directory: PathBuf,
}

/// Per-request size limits
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Hard ceiling on the bytes a single request may consume
    pub max_request_size: usize,
    /// Bytes staged in memory before the body spills to disk
    pub max_staging_size: usize,
    /// Capacity of the fixed read chunk
    pub read_buffer_size: usize,
    /// Inactivity timeout for a single read, 0 disables it
    pub read_timeout_ms: u64,
    /// Time allowed for writing one reply, 0 disables it
    pub write_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KeepAliveConfig {
    /// Request cycles a persistent connection may serve
    pub max: u32,
    /// Seconds advertised in the `Keep-Alive` header
    pub timeout: u64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("read_buffer_size must be greater than zero")]
    ZeroReadBuffer,
    #[error("max_staging_size must be greater than zero")]
    ZeroStaging,
    #[error("max_staging_size ({staging}) must be below max_request_size ({request})")]
    StagingNotBelowCeiling { staging: usize, request: usize },
    #[error("keep_alive.max must be greater than zero")]
    ZeroKeepAlive,
    #[error("temporary_directory must not be empty")]
    MissingTemporaryDirectory,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            backlog: 1024,
            temporary_directory: std::env::temp_dir(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_request_size: 1024 * 1024,
            max_staging_size: 8 * 1024,
            read_buffer_size: 4 * 1024,
            read_timeout_ms: 30_000,
            write_timeout_ms: 30_000,
        }
    }
}

impl Default for KeepAliveConfig {
    fn default() -> Self {
        Self { max: 100, timeout: 15 }
    }
}

impl LimitsConfig {
    pub fn read_timeout(&self) -> Option<Duration> {
        (self.read_timeout_ms > 0).then(|| Duration::from_millis(self.read_timeout_ms))
    }

    pub fn write_timeout(&self) -> Option<Duration> {
        (self.write_timeout_ms > 0).then(|| Duration::from_millis(self.write_timeout_ms))
    }
}

impl Config {
    /// Load and validate the configuration file at `path`.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file {}", path.display()))?;
        Self::from_yaml_str(&text)
            .with_context(|| format!("Invalid configuration file {}", path.display()))
    }

    /// Parse and validate a YAML document.
    pub fn from_yaml_str(text: &str) -> anyhow::Result<Self> {
        // serde_yaml maps an empty document to unit, not to an empty mapping
        let cfg: Config = if text.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str(text).context("Failed to parse YAML")?
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let limits = &self.limits;
        if limits.read_buffer_size == 0 {
            return Err(ConfigError::ZeroReadBuffer);
        }
        if limits.max_staging_size == 0 {
            return Err(ConfigError::ZeroStaging);
        }
        if limits.max_staging_size >= limits.max_request_size {
            return Err(ConfigError::StagingNotBelowCeiling {
                staging: limits.max_staging_size,
                request: limits.max_request_size,
            });
        }
        if self.keep_alive.max == 0 {
            return Err(ConfigError::ZeroKeepAlive);
        }
        if self.server.temporary_directory.as_os_str().is_empty() {
            return Err(ConfigError::MissingTemporaryDirectory);
        }
        Ok(())
    }
}
