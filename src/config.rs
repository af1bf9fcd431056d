//! Configuration module.
//!
//! Handles loading, validating, and merging `gatepass.toml`. Stock defaults
//! are the base layer; a user file overrides only the keys it names.
//!
//! ## Config File Location
//!
//! `gatepass.toml` is read from the directory passed as `--config-dir`
//! (default: the working directory). No file means stock defaults.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [storage]
//! registry = "scan-registry.txt"  # Admitted payloads, one per line
//! artifacts_dir = "assets"        # Where generated codes are written
//!
//! [render]
//! error_correction = "low"        # low | medium | quartile | high
//! module_size = 10                # Pixels per module
//! border = 4                      # Quiet zone, in modules
//! format = "png"                  # png | jpeg
//!
//! [processing]
//! max_processes = 4               # Parallel issue workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{ArtifactFormat, EcLevel, RenderParams};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name looked up in the config directory.
pub const CONFIG_FILENAME: &str = "gatepass.toml";

/// Upper bound for `render.module_size`; larger values only waste disk.
const MAX_MODULE_SIZE: u32 = 100;

/// Upper bound for `render.border`.
const MAX_BORDER: u32 = 64;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `gatepass.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Registry file and artifact directory.
    pub storage: StorageConfig,
    /// Symbol rendering settings.
    pub render: RenderConfig,
    /// Parallel issuing settings.
    pub processing: ProcessingConfig,
}

impl Config {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.registry.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "storage.registry must not be empty".into(),
            ));
        }
        if self.storage.artifacts_dir.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "storage.artifacts_dir must not be empty".into(),
            ));
        }
        if self.render.module_size == 0 || self.render.module_size > MAX_MODULE_SIZE {
            return Err(ConfigError::Validation(format!(
                "render.module_size must be 1-{MAX_MODULE_SIZE}"
            )));
        }
        if self.render.border > MAX_BORDER {
            return Err(ConfigError::Validation(format!(
                "render.border must be 0-{MAX_BORDER}"
            )));
        }
        Ok(())
    }
}

/// Where state lives on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Append-only registry of admitted payloads.
    pub registry: PathBuf,
    /// Directory for generated credential images. Created on first use.
    pub artifacts_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            registry: PathBuf::from("scan-registry.txt"),
            artifacts_dir: PathBuf::from("assets"),
        }
    }
}

/// Symbol rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    pub error_correction: EcLevel,
    /// Pixels per module edge.
    pub module_size: u32,
    /// Quiet zone width in modules.
    pub border: u32,
    pub format: ArtifactFormat,
}

impl Default for RenderConfig {
    fn default() -> Self {
        let params = RenderParams::default();
        Self {
            error_correction: params.ec_level,
            module_size: params.module_size,
            border: params.border,
            format: ArtifactFormat::default(),
        }
    }
}

impl RenderConfig {
    pub fn params(&self) -> RenderParams {
        RenderParams {
            ec_level: self.error_correction,
            module_size: self.module_size,
            border: self.border,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel issue workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)`, at least 1
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
// Loading
// =============================================================================

/// Stock settings as a TOML value, the layer a user file is laid over.
pub fn stock_settings() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(Config::default())
        .map_err(|e| ConfigError::Validation(format!("stock defaults do not serialize: {e}")))
}

/// Lay `user` over `settings`. Sections combine key by key; any other value
/// replaces the one underneath.
pub fn overlay_settings(settings: &mut toml::Value, user: toml::Value) {
    match (settings, user) {
        (toml::Value::Table(stock), toml::Value::Table(user)) => {
            for (key, value) in user {
                match stock.get_mut(&key) {
                    Some(slot) => overlay_settings(slot, value),
                    None => {
                        stock.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

/// Read `gatepass.toml` from `dir`, or `Ok(None)` when there is none.
pub fn read_user_settings(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    match fs::read_to_string(dir.join(CONFIG_FILENAME)) {
        Ok(content) => Ok(Some(toml::from_str(&content)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Effective settings for `dir`: stock values, the user's file on top,
/// then [`Config::validate`].
pub fn load_config(dir: &Path) -> Result<Config, ConfigError> {
    let mut settings = stock_settings()?;
    if let Some(user) = read_user_settings(dir)? {
        overlay_settings(&mut settings, user);
    }
    let config: Config = settings.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock `gatepass.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# gatepass configuration
# ======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Storage
# ---------------------------------------------------------------------------
[storage]
# Append-only list of admitted credentials, one payload per line.
# Keep one file per event; deleting it re-admits everyone.
registry = "scan-registry.txt"

# Generated credential images land here as <name>_qr_code.<ext>.
# Created on first use.
artifacts_dir = "assets"

# ---------------------------------------------------------------------------
# Rendering
# ---------------------------------------------------------------------------
[render]
# Error correction: low, medium, quartile, high.
# Higher levels survive damage better but produce denser symbols.
error_correction = "low"

# Pixels per module.
module_size = 10

# Quiet zone around the symbol, in modules. Scanners expect at least 4.
border = 4

# Output image format: png or jpeg.
format = "png"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel workers for issue-batch.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
