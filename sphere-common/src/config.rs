//! Configuration loading and root folder resolution
//!
//! Priority order for every bootstrap value:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "SPHERE_CONFIG";

/// Environment variable naming the root folder (database lives here)
pub const ROOT_FOLDER_ENV_VAR: &str = "SPHERE_ROOT_FOLDER";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Root folder for the database file
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Base URL of the upstream music API (e.g. "https://api.spotify.com/v1")
    #[serde(default)]
    pub api_base_url: Option<String>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Sync tuning overrides; unset fields keep built-in defaults
    #[serde(default)]
    pub sync: SyncSection,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            root_folder: None,
            port: default_port(),
            api_base_url: None,
            logging: LoggingConfig::default(),
            sync: SyncSection::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// `[sync]` table of the TOML file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncSection {
    pub quick_limit: Option<usize>,
    pub full_limit: Option<usize>,
    pub min_limit: Option<usize>,
    pub max_limit: Option<usize>,
    /// Fraction of collapsed points above which the PCA layout is discarded
    pub collapsed_ratio: Option<f64>,
    /// Mean distance from centroid below which the PCA layout is discarded
    pub min_spread: Option<f64>,
    pub http_timeout_ms: Option<u64>,
    pub max_retries: Option<u32>,
}

fn default_port() -> u16 {
    5730
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Locate the config file
///
/// Explicit path (CLI) → `SPHERE_CONFIG` → `<config dir>/sphere/config.toml`.
/// Returns `None` when no file exists; callers fall back to defaults.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    dirs::config_dir()
        .map(|d| d.join("sphere").join("config.toml"))
        .filter(|p| p.exists())
}

/// Load a TOML config file
///
/// A missing file at an explicitly requested path is an error; parse
/// failures are always errors.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;
    debug!(path = %path.display(), "Loaded TOML config");
    Ok(config)
}

/// Resolve and load the config, falling back to defaults when no file exists
pub fn load_or_default(cli_arg: Option<&Path>) -> Result<TomlConfig> {
    match resolve_config_path(cli_arg) {
        Some(path) => {
            info!("Using config file: {}", path.display());
            load_toml_config(&path)
        }
        None => {
            info!("No config file found, using built-in defaults");
            Ok(TomlConfig::default())
        }
    }
}

/// Resolve the root folder following the priority order in the module docs
pub fn resolve_root_folder(cli_arg: Option<&Path>, toml: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV_VAR) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &toml.root_folder {
        return path.clone();
    }

    default_root_folder()
}

/// OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("sphere"))
        .unwrap_or_else(|| PathBuf::from("./sphere_data"))
}
