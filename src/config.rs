//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/orgview/orgview.toml`
//! 3. Explicit config file (`--config <file>`)
//! 4. Environment variables: `ORGVIEW_*` prefix

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;

/// Storage key the chart record is saved under unless configured otherwise.
pub const DEFAULT_STORAGE_KEY: &str = "orgview_data_v1";

/// Lazy-loading configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct LoaderConfig {
    /// JSON people directory (`{ "<parentId>": [nodes] }`); no lazy children if unset
    pub directory: Option<PathBuf>,
    /// Simulated fetch latency in milliseconds
    pub latency_ms: u64,
}

/// Talent pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PoolConfig {
    /// Deleted people go back to the unassigned list (their reports do not)
    pub return_deleted: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            return_deleted: true,
        }
    }
}

/// Raw settings for intermediate parsing.
///
/// Every field is optional so that a layer only overrides what it specifies.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub data_dir: Option<PathBuf>,
    pub storage_key: Option<String>,
    pub id_prefix: Option<String>,
    pub loader: RawLoaderConfig,
    pub pool: RawPoolConfig,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawLoaderConfig {
    pub directory: Option<PathBuf>,
    pub latency_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawPoolConfig {
    pub return_deleted: Option<bool>,
}

/// Unified configuration for orgview.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Directory holding the chart record (default: XDG data dir)
    pub data_dir: PathBuf,
    /// Name of the chart record inside `data_dir`
    pub storage_key: String,
    /// Use counter ids `<prefix>-<n>` instead of random UUIDs
    pub id_prefix: Option<String>,
    /// Lazy-loading settings
    pub loader: LoaderConfig,
    /// Talent pool settings
    pub pool: PoolConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            id_prefix: None,
            loader: LoaderConfig::default(),
            pool: PoolConfig::default(),
        }
    }
}

/// Get the default data directory.
fn default_data_dir() -> PathBuf {
    ProjectDirs::from("", "", "orgview")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("~/.orgview"))
}

/// Get the XDG config directory for orgview.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "orgview").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("orgview.toml"))
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

/// Expand `~`, `$VAR` and `${VAR}` in a path-like string.
fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    shellexpand::full(raw.as_ref())
        .map(|s| PathBuf::from(s.into_owned()))
        .unwrap_or_else(|_| path.to_path_buf())
}

impl Settings {
    /// Path of the chart record: `<data_dir>/<storage_key>.json`.
    pub fn record_path(&self) -> PathBuf {
        self.data_dir.join(format!("{}.json", self.storage_key))
    }

    /// Expand shell variables and tilde in path-like fields.
    fn expand_paths(&mut self) {
        self.data_dir = expand_path(&self.data_dir);
        if let Some(dir) = &self.loader.directory {
            self.loader.directory = Some(expand_path(dir));
        }
    }

    /// Overlay a config layer: every field the layer specifies wins.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            data_dir: overlay
                .data_dir
                .clone()
                .unwrap_or_else(|| self.data_dir.clone()),
            storage_key: overlay
                .storage_key
                .clone()
                .unwrap_or_else(|| self.storage_key.clone()),
            id_prefix: overlay.id_prefix.clone().or_else(|| self.id_prefix.clone()),
            loader: LoaderConfig {
                directory: overlay
                    .loader
                    .directory
                    .clone()
                    .or_else(|| self.loader.directory.clone()),
                latency_ms: overlay.loader.latency_ms.unwrap_or(self.loader.latency_ms),
            },
            pool: PoolConfig {
                return_deleted: overlay
                    .pool
                    .return_deleted
                    .unwrap_or(self.pool.return_deleted),
            },
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `config_file` - Optional explicit config file, applied after the global one
    ///
    /// # Precedence (lowest to highest)
    /// 1. Compiled defaults
    /// 2. Global config: `$XDG_CONFIG_HOME/orgview/orgview.toml`
    /// 3. Explicit config file (must exist)
    /// 4. Environment variables: `ORGVIEW_*` prefix, `__` as section separator
    pub fn load(config_file: Option<&Path>) -> Result<Self, ApplicationError> {
        // 1. Start with defaults
        let mut current = Self::default();

        // 2. Global config
        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                let raw = load_raw_settings(&global_path)?;
                current = current.merge_with(&raw);
            }
        }

        // 3. Explicit config file
        if let Some(path) = config_file {
            if !path.exists() {
                return Err(ApplicationError::Config {
                    message: format!("config file not found: {}", path.display()),
                });
            }
            let raw = load_raw_settings(path)?;
            current = current.merge_with(&raw);
        }

        // 4. Environment variables
        current = Self::apply_env_overrides(current)?;

        current.expand_paths();
        Ok(current)
    }

    /// Apply ORGVIEW_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("ORGVIEW")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("data_dir") {
            settings.data_dir = PathBuf::from(val);
        }
        if let Ok(val) = config.get_string("storage_key") {
            settings.storage_key = val;
        }
        if let Ok(val) = config.get_string("id_prefix") {
            settings.id_prefix = Some(val);
        }
        if let Ok(val) = config.get_string("loader.directory") {
            settings.loader.directory = Some(PathBuf::from(val));
        }
        if let Ok(val) = config.get::<u64>("loader.latency_ms") {
            settings.loader.latency_ms = val;
        }
        if let Ok(val) = config.get_bool("pool.return_deleted") {
            settings.pool.return_deleted = val;
        }

        Ok(settings)
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# orgview configuration
#
# Locations (by precedence, lowest to highest):
#   Global:   ~/.config/orgview/orgview.toml
#   Explicit: orgview --config <file>
#   Env:      ORGVIEW_* environment variables (ORGVIEW_LOADER__LATENCY_MS=250)

# Directory holding the chart record
# data_dir = "~/.local/share/orgview"

# Record name inside data_dir (<storage_key>.json)
# storage_key = "orgview_data_v1"

# Counter-based ids "<prefix>-<n>" instead of random UUIDs
# id_prefix = "team"

[loader]
# People directory for lazily loaded reports: { "<managerId>": [ {id, name, role}, ... ] }
# directory = "~/org/directory.json"

# Simulated fetch latency in milliseconds
# latency_ms = 0

[pool]
# Deleted people return to the unassigned list (their reports are discarded)
# return_deleted = true
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
