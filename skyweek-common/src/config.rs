//! Bootstrap configuration and root folder resolution
//!
//! Values resolve in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Built-in default (fallback)
//!
//! The TOML file holds bootstrap concerns only; it is read once at startup.

use crate::time::WeekStart;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Default HTTP port for skyweek-content
pub const DEFAULT_PORT: u16 = 5780;

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Root folder for local data (SQLite store, static library overrides)
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Remote document store
    #[serde(default)]
    pub store: StoreConfig,

    /// AI generation service
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Chart computation service (full birth data only)
    #[serde(default)]
    pub chart: ServiceEndpoint,

    /// Geocoding service used before chart computation
    #[serde(default)]
    pub geocoding: ServiceEndpoint,

    /// Content resolution tuning
    #[serde(default)]
    pub content: ContentConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            root_folder: None,
            port: default_port(),
            logging: LoggingConfig::default(),
            store: StoreConfig::default(),
            generation: GenerationConfig::default(),
            chart: ServiceEndpoint::default(),
            geocoding: ServiceEndpoint::default(),
            content: ContentConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Which document store backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// REST document store
    Http,
    /// Local SQLite file in the root folder
    #[default]
    Sqlite,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Base URL of an OpenAI-compatible API (e.g. https://api.openai.com/v1)
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    /// Client-side throttle for generation requests
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            model: default_model(),
            requests_per_minute: default_requests_per_minute(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceEndpoint {
    #[serde(default)]
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentConfig {
    #[serde(default)]
    pub week_starts_on: WeekStart,
    /// In-process cache lifetime; entries also expire at the week boundary
    #[serde(default = "default_cache_ttl_days")]
    pub cache_ttl_days: u32,
    /// Upper bound for every remote call
    #[serde(default = "default_remote_timeout_secs")]
    pub remote_timeout_secs: u64,
    /// Optional TOML file replacing the built-in static readings
    #[serde(default)]
    pub static_library: Option<PathBuf>,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            week_starts_on: WeekStart::default(),
            cache_ttl_days: default_cache_ttl_days(),
            remote_timeout_secs: default_remote_timeout_secs(),
            static_library: None,
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_requests_per_minute() -> u32 {
    30
}

fn default_cache_ttl_days() -> u32 {
    7
}

fn default_remote_timeout_secs() -> u64 {
    20
}

/// Load TOML config from an explicit path
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed ({}): {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))
}

/// Load TOML config from `path`, or the platform default location, or built-in defaults
pub fn load_or_default(path: Option<&Path>) -> Result<TomlConfig> {
    if let Some(path) = path {
        return load_toml_config(path);
    }

    match default_config_path() {
        Some(path) if path.exists() => {
            info!("Loading configuration from {}", path.display());
            load_toml_config(&path)
        }
        _ => {
            info!("No configuration file found, using built-in defaults");
            Ok(TomlConfig::default())
        }
    }
}

/// Write TOML config atomically (temp file + rename)
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let tmp_path = path.with_extension("toml.tmp");
    std::fs::write(&tmp_path, content)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Platform config file location (`~/.config/skyweek/config.toml` on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("skyweek").join("config.toml"))
}

/// Resolve the root folder: CLI → environment → TOML → OS default
pub fn resolve_root_folder(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    toml_config: &TomlConfig,
) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &toml_config.root_folder {
        return path.clone();
    }

    default_root_folder()
}

/// OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("skyweek"))
        .unwrap_or_else(|| PathBuf::from("./skyweek_data"))
}

/// Resolve an API key from environment then TOML
///
/// Warns when more than one source carries a key; the environment wins.
pub fn resolve_api_key(label: &str, env_var_name: &str, toml_value: Option<&str>) -> Result<String> {
    let env_key = std::env::var(env_var_name).ok().filter(|k| is_valid_key(k));
    let toml_key = toml_value.filter(|k| is_valid_key(k));

    if env_key.is_some() && toml_key.is_some() {
        warn!(
            "{} API key found in both environment and TOML. Using environment (highest priority).",
            label
        );
    }

    if let Some(key) = env_key {
        info!("{} API key loaded from environment variable", label);
        return Ok(key);
    }

    if let Some(key) = toml_key {
        info!("{} API key loaded from TOML config", label);
        return Ok(key.to_string());
    }

    Err(Error::Config(format!(
        "{} API key not configured. Set {} or the api_key entry in the TOML config",
        label, env_var_name
    )))
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}
