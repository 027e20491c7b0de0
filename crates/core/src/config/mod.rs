//! Registry configuration
//!
//! Controls the diagnostics stream and the printer. Stored as TOML; a
//! missing file is created with defaults on first load.
//!
//! # Example
//!
//! ```ignore
//! use reflkit_core::{ReflectConfig, Registry};
//!
//! let config = ReflectConfig::load(reflkit_core::config::config_path())?;
//! let registry = Registry::with_config(config);
//! ```

mod loader;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub use loader::{config_path, CONFIG_ENV, DEFAULT_CONFIG_FILE};

/// Configuration system errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read or write config file
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML content
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Failed to serialize config to TOML
    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),
}

/// Result type for config operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Printer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JsonConfig {
    /// Put each map entry on its own line
    pub indent: bool,

    /// Spaces per nesting level when indenting
    pub indent_width: usize,
}

impl Default for JsonConfig {
    fn default() -> Self {
        Self {
            indent: true,
            indent_width: 2,
        }
    }
}

/// Registry-wide settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReflectConfig {
    /// Config version for future migration support
    pub version: u32,

    /// Prepended to every diagnostic line
    pub error_prefix: String,

    /// Emit diagnostics for soft failures
    pub show_errors: bool,

    /// Also write diagnostics to stderr
    pub echo_stderr: bool,

    /// Diagnostics kept in memory for `Diagnostics::recent`
    pub history_limit: usize,

    pub json: JsonConfig,
}

impl Default for ReflectConfig {
    fn default() -> Self {
        Self {
            version: 1,
            error_prefix: "[reflkit] ".to_string(),
            show_errors: true,
            echo_stderr: false,
            history_limit: 64,
            json: JsonConfig::default(),
        }
    }
}

impl ReflectConfig {
    /// Load config from file, creating default if missing.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();

        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config = Self::from_toml_str(&content)?;
            tracing::debug!("Loaded reflkit config from {:?}", path);
            Ok(config)
        } else {
            let default = Self::default();
            default.save(path)?;
            tracing::info!("Created default reflkit config at {:?}", path);
            Ok(default)
        }
    }

    /// Load from the resolved default location
    pub fn load_default() -> ConfigResult<Self> {
        Self::load(config_path())
    }

    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Save config to file.
    ///
    /// Creates parent directories if they don't exist.
    pub fn save(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        tracing::debug!("Saved reflkit config to {:?}", path);
        Ok(())
    }

    /// Reload config from file.
    pub fn reload(&mut self, path: impl AsRef<Path>) -> ConfigResult<()> {
        let path: PathBuf = path.as_ref().to_path_buf();
        let content = std::fs::read_to_string(&path)?;
        *self = Self::from_toml_str(&content)?;
        tracing::debug!("Reloaded reflkit config from {:?}", path);
        Ok(())
    }
}
