//! Service configuration module.
//!
//! Handles loading, validating, and merging `iiif.toml`. The file is sparse:
//! stock defaults are serialized to a TOML table, the user file is merged on
//! top key-by-key, and the result is deserialized and validated.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [source]
//! root = "masters"          # Directory holding master files (local engine)
//!
//! [engine]
//! kind = "local"            # "local" or "remote"
//! # remote_url = "https://iiif.example.org/iiif/2"
//! timeout_secs = 30         # Upstream timeout (remote engine)
//!
//! [tiers]                   # Tier name -> longest permitted edge in pixels
//! # public = 1000
//! # thumbnail = 200
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Config file looked up when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "iiif.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `iiif.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IiifConfig {
    /// Where master files live.
    pub source: SourceConfig,
    /// Which backend renders derivatives.
    pub engine: EngineConfig,
    /// Access tiers by name, each the longest edge it may receive.
    pub tiers: BTreeMap<String, u32>,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl IiifConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.kind == EngineKind::Remote && self.engine.remote_url.is_none() {
            return Err(ConfigError::Validation(
                "engine.remote_url is required when engine.kind = \"remote\"".into(),
            ));
        }
        if self.engine.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "engine.timeout_secs must be non-zero".into(),
            ));
        }
        if let Some((name, _)) = self.tiers.iter().find(|(_, edge)| **edge == 0) {
            return Err(ConfigError::Validation(format!(
                "tiers.{name} must be non-zero"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceConfig {
    /// Directory the local engine resolves identifiers against.
    pub root: PathBuf,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("masters"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// Decode and process masters in-process.
    #[default]
    Local,
    /// Forward requests to an upstream IIIF server.
    Remote,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub kind: EngineKind,
    /// Upstream base URL, required for the remote engine.
    pub remote_url: Option<String>,
    /// Upstream request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            kind: EngineKind::Local,
            remote_url: None,
            timeout_secs: 30,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel render workers.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(IiifConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto the stock defaults, then deserialize and
/// validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<IiifConfig, ConfigError> {
    let base = stock_defaults_value();
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: IiifConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `path`. A missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<IiifConfig, ConfigError> {
    let overlay = load_raw_config(path)?;
    if overlay.is_none() {
        log::debug!("{} not found, using stock config", path.display());
    }
    resolve_config(overlay)
}

/// Returns a fully-commented stock `iiif.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# IIIF Derive Configuration
# =========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Master files
# ---------------------------------------------------------------------------
[source]
# Directory the local engine resolves identifiers against. An identifier
# maps to <root>/<identifier>, or to <root>/<identifier>.<ext> for the
# first of tif, tiff, jpg, jpeg, png, webp that exists.
root = "masters"

# ---------------------------------------------------------------------------
# Engine
# ---------------------------------------------------------------------------
[engine]
# "local" decodes masters in-process; "remote" forwards every request to
# another IIIF Image API 2.1 server.
kind = "local"

# Base URL of the upstream server (required when kind = "remote").
# remote_url = "https://iiif.example.org/iiif/2"

# Upstream request timeout in seconds.
timeout_secs = 30

# ---------------------------------------------------------------------------
# Access tiers
# ---------------------------------------------------------------------------
# Tier name -> longest edge (in pixels) a "max" or "full" request may
# return. Requests made without a tier are not capped.
[tiers]
# public = 1000
# thumbnail = 200

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel render workers for `batch`.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
