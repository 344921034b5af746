// src/config/model.rs

use serde::Deserialize;
use std::str::FromStr;
use thiserror::Error;

use crate::fs::instance::MountOptions;

/// Top-level runtime config
#[derive(Debug, Clone)]
pub struct Config {
    pub logging: LoggingConfig,
    pub mount:   MountOptions,
}

/// Raw file layout, before mount values are validated.
#[derive(Debug, Deserialize)]
pub struct RawConfig {
    #[serde(default)] pub logging: LoggingConfig,
    #[serde(default)] pub mount:   MountConfig,
}

/// Mirror of the `[logging]` table
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]            pub enable: bool,
    #[serde(default)]            pub file:   Option<String>,
    #[serde(default = "default_level")] pub level: String,
}
fn default_level() -> String { "INFO".into() }

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { enable: false, file: None, level: default_level() }
    }
}

/// Mirror of the `[mount]` table
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MountConfig {
    #[serde(default = "default_version")]          pub version:          u32,
    #[serde(default = "default_thread_count")]     pub thread_count:     usize,
    #[serde(default = "default_max_open_handles")] pub max_open_handles: usize,
    #[serde(default = "default_mount_point")]      pub mount_point:      String,
}
fn default_version() -> u32 { 110 }
fn default_thread_count() -> usize { 4 }
fn default_max_open_handles() -> usize { 4096 }
fn default_mount_point() -> String { "M:\\".into() }

impl Default for MountConfig {
    fn default() -> Self {
        Self {
            version:          default_version(),
            thread_count:     default_thread_count(),
            max_open_handles: default_max_open_handles(),
            mount_point:      default_mount_point(),
        }
    }
}

/// Log verbosity accepted in `[logging].level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogLevel(pub log::LevelFilter);

/// All the ways config loading can go wrong
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid log level '{0}'")]
    InvalidLevel(String),

    #[error("invalid [mount] value: {0}")]
    InvalidMount(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Allow `"debug"` → `LevelFilter::Debug`
impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let level = match s.to_uppercase().as_str() {
            "OFF"   => log::LevelFilter::Off,
            "ERROR" => log::LevelFilter::Error,
            "WARN"  => log::LevelFilter::Warn,
            "INFO"  => log::LevelFilter::Info,
            "DEBUG" => log::LevelFilter::Debug,
            "TRACE" => log::LevelFilter::Trace,
            other   => return Err(ConfigError::InvalidLevel(other.into())),
        };
        Ok(LogLevel(level))
    }
}

impl LoggingConfig {
    pub fn level_filter(&self) -> Result<log::LevelFilter, ConfigError> {
        self.level.parse::<LogLevel>().map(|l| l.0)
    }
}

impl TryFrom<MountConfig> for MountOptions {
    type Error = ConfigError;

    fn try_from(raw: MountConfig) -> Result<Self, Self::Error> {
        if raw.thread_count == 0 {
            return Err(ConfigError::InvalidMount("thread_count must be at least 1".into()));
        }
        if raw.max_open_handles == 0 {
            return Err(ConfigError::InvalidMount("max_open_handles must be at least 1".into()));
        }
        Ok(MountOptions {
            version:          raw.version,
            thread_count:     raw.thread_count,
            max_open_handles: raw.max_open_handles,
            mount_point:      raw.mount_point,
        })
    }
}
