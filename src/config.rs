//! Configuration file support for the labelling client.
//!
//! Settings are stored as versioned JSON: in the user's config directory on
//! native builds and in `localStorage` in the browser.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_BASE_URL, DEFAULT_REQUEST_TIMEOUT_SECS};

/// Log level setting for the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Show only errors
    Error,
    /// Show errors and warnings
    Warn,
    /// Show errors, warnings, and info messages
    #[default]
    Info,
    /// Show debug-level logging
    Debug,
    /// Show all log messages including trace
    Trace,
}

impl LogLevel {
    /// Convert to log crate's LevelFilter.
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }

    /// Convert to log crate's Level.
    pub fn to_level(&self) -> log::Level {
        match self {
            LogLevel::Error => log::Level::Error,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Info => log::Level::Info,
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Trace => log::Level::Trace,
        }
    }
}

/// Current configuration file format version.
/// Increment this when making breaking changes to the config format.
pub const CONFIG_VERSION: u32 = 1;

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Version of the configuration file format
    pub version: u32,

    /// Base URL of the persistence service
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Log verbosity level
    #[serde(default)]
    pub log_level: LogLevel,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl AppConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self {
            version: CONFIG_VERSION,
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            log_level: LogLevel::default(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;

        if config.version > CONFIG_VERSION {
            return Err(ConfigError::VersionTooNew {
                file_version: config.version,
                supported_version: CONFIG_VERSION,
            });
        }

        Ok(config)
    }

    /// Get the default filename for the config file.
    pub fn default_filename() -> &'static str {
        "labelweb-config.json"
    }

    /// Get the default config file path.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn default_path() -> Option<std::path::PathBuf> {
        if let Some(config_dir) = dirs::config_dir() {
            Some(config_dir.join("labelweb").join(Self::default_filename()))
        } else {
            dirs::home_dir().map(|home_dir| {
                home_dir
                    .join(".config")
                    .join("labelweb")
                    .join(Self::default_filename())
            })
        }
    }

    /// Load configuration from a specific file, logging any failure.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_from_path(path: &std::path::Path) -> Option<Self> {
        match std::fs::read_to_string(path) {
            Ok(json) => match Self::from_json(&json) {
                Ok(config) => {
                    log::info!("Loaded configuration from {:?}", path);
                    Some(config)
                }
                Err(e) => {
                    log::warn!("Failed to parse config file {:?}: {}", path, e);
                    None
                }
            },
            Err(e) => {
                log::warn!("Failed to read config file {:?}: {}", path, e);
                None
            }
        }
    }

    /// Save configuration to `path`, creating parent directories.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn save_to_path(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Load the config file at `path`, writing defaults there if it does not
    /// exist yet. An unreadable file falls back to defaults and is left as is.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_or_init_at(path: &std::path::Path) -> Self {
        if path.exists() {
            return Self::load_from_path(path).unwrap_or_default();
        }
        let config = Self::default();
        if let Err(e) = config.save_to_path(path) {
            log::warn!("Failed to write default config to {:?}: {}", path, e);
        }
        config
    }

    /// LocalStorage key for WASM config persistence.
    #[cfg(target_arch = "wasm32")]
    const LOCALSTORAGE_KEY: &'static str = "labelweb-config";

    /// Try to load configuration from localStorage (WASM only).
    /// Returns None if not found or can't be parsed.
    #[cfg(target_arch = "wasm32")]
    pub fn load_from_local_storage() -> Option<Self> {
        let window = web_sys::window()?;
        let storage = window.local_storage().ok()??;

        match storage.get_item(Self::LOCALSTORAGE_KEY) {
            Ok(Some(json)) => match Self::from_json(&json) {
                Ok(config) => {
                    log::info!("Loaded configuration from localStorage");
                    Some(config)
                }
                Err(e) => {
                    log::warn!("Failed to parse config from localStorage: {}", e);
                    None
                }
            },
            Ok(None) => {
                log::debug!("No config found in localStorage");
                None
            }
            Err(e) => {
                log::warn!("Failed to read from localStorage: {:?}", e);
                None
            }
        }
    }

    /// Save configuration to localStorage (WASM only).
    #[cfg(target_arch = "wasm32")]
    pub fn save_to_local_storage(&self) -> Result<(), ConfigError> {
        let window = web_sys::window()
            .ok_or_else(|| ConfigError::StorageError("No window object available".to_string()))?;

        let storage = window
            .local_storage()
            .map_err(|e| ConfigError::StorageError(format!("localStorage access error: {:?}", e)))?
            .ok_or_else(|| ConfigError::StorageError("localStorage not available".to_string()))?;

        let json = self.to_json()?;

        storage
            .set_item(Self::LOCALSTORAGE_KEY, &json)
            .map_err(|e| {
                ConfigError::StorageError(format!("Failed to save to localStorage: {:?}", e))
            })?;

        log::info!("Saved configuration to localStorage");
        Ok(())
    }

    /// Load from the platform's config store. On first run the defaults are
    /// written there so they can be edited; an unreadable entry is left as is.
    pub fn load_or_init() -> Self {
        #[cfg(not(target_arch = "wasm32"))]
        {
            match Self::default_path() {
                Some(path) => Self::load_or_init_at(&path),
                None => {
                    log::warn!("No config directory available, using defaults");
                    Self::default()
                }
            }
        }
        #[cfg(target_arch = "wasm32")]
        {
            let stored = web_sys::window()
                .and_then(|window| window.local_storage().ok().flatten())
                .and_then(|storage| storage.get_item(Self::LOCALSTORAGE_KEY).ok().flatten());
            if stored.is_some() {
                return Self::load_from_local_storage().unwrap_or_default();
            }
            let config = Self::default();
            if let Err(e) = config.save_to_local_storage() {
                log::warn!("{}", e);
            }
            config
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// JSON parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Configuration version is newer than supported
    #[error(
        "Configuration file version {file_version} is newer than supported version {supported_version}"
    )]
    VersionTooNew {
        file_version: u32,
        supported_version: u32,
    },

    /// I/O error when reading/writing config
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Storage error (localStorage in WASM)
    #[error("Storage error: {0}")]
    StorageError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.version, CONFIG_VERSION);
        assert_eq!(config.base_url, "http://127.0.0.1:5000");
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.log_level, LogLevel::Info);
    }

    #[test]
    fn test_json_round_trip() {
        let config = AppConfig {
            base_url: "https://labels.example.org/api".to_string(),
            log_level: LogLevel::Debug,
            ..AppConfig::default()
        };
        let json = config.to_json().unwrap();
        assert!(json.contains("\"debug\""));
        assert_eq!(AppConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config = AppConfig::from_json(r#"{ "version": 1 }"#).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_newer_version_is_rejected() {
        let err = AppConfig::from_json(r#"{ "version": 99 }"#).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::VersionTooNew {
                file_version: 99,
                supported_version: CONFIG_VERSION
            }
        ));
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        assert!(matches!(
            AppConfig::from_json("not json"),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn scratch_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir()
            .join(format!("labelweb-test-{}-{}", std::process::id(), name))
            .join(AppConfig::default_filename())
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn test_first_run_writes_defaults() {
        let path = scratch_path("first-run");
        let _ = std::fs::remove_file(&path);

        let config = AppConfig::load_or_init_at(&path);
        assert_eq!(config, AppConfig::default());
        assert!(path.exists());

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(AppConfig::from_json(&written).unwrap(), config);
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn test_existing_config_is_loaded_not_overwritten() {
        let path = scratch_path("existing");
        let edited = AppConfig {
            base_url: "http://labels.internal:8080".to_string(),
            request_timeout_secs: 3,
            ..AppConfig::default()
        };
        edited.save_to_path(&path).unwrap();

        assert_eq!(AppConfig::load_or_init_at(&path), edited);
        let on_disk = std::fs::read_to_string(&path).unwrap();
        assert!(on_disk.contains("labels.internal"));
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn test_unreadable_config_falls_back_without_overwriting() {
        let path = scratch_path("broken");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{ not json").unwrap();

        assert_eq!(AppConfig::load_or_init_at(&path), AppConfig::default());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ not json");
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_log_level_mapping() {
        assert_eq!(LogLevel::Warn.to_level_filter(), log::LevelFilter::Warn);
        assert_eq!(LogLevel::Trace.to_level(), log::Level::Trace);
    }
}
