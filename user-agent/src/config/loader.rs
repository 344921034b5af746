// src/config/loader.rs

//! # Configuration Loader
//!
//! Reads `default.toml`, deserializes into `RawConfig`, and converts the
//! `[mount]` table into runtime `MountOptions`.

use crate::bridge_log;
use crate::config::model::{Config, ConfigError, RawConfig};
use log::Level;
use std::{fs, path::Path};

/// Load and parse the configuration from `path`.
/// Logs at DEBUG before reading and INFO on success.
pub fn load(path: &Path) -> Result<Config, ConfigError> {
    bridge_log!(Level::Debug, "config", "Reading config from {:?}", path);
    let txt = fs::read_to_string(path)?;
    let cfg = load_from_str(&txt)?;
    bridge_log!(Level::Info, "config", "Loaded config from {:?}", path);
    Ok(cfg)
}

/// Parse and validate configuration text.
pub fn load_from_str(txt: &str) -> Result<Config, ConfigError> {
    let raw: RawConfig = toml::from_str(txt)?;
    // an unknown level is a config error, not a silent INFO
    raw.logging.level_filter()?;
    let mount = raw.mount.try_into()?;
    Ok(Config { logging: raw.logging, mount })
}
