//! Bootstrap configuration loading and path resolution
//!
//! Settings are resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing config file is not an error: the loader runs on defaults.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Application directory name used under the platform config/data dirs
pub const APP_DIR_NAME: &str = "epi-ingest";

/// Default fraction of rows a new dataset may lose relative to the live table
pub const DEFAULT_MAX_DROP_FRACTION: f64 = 0.1;

/// Bootstrap configuration loaded from TOML
///
/// Every field is optional; unset values fall through to environment
/// variables or compiled defaults.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TomlConfig {
    /// Path to the SQLite database file
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Directory holding raw source payloads between runs
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    /// Directory receiving `case-data.json` and `intervention-data.json`
    #[serde(default)]
    pub debug_output_dir: Option<PathBuf>,

    /// Largest tolerated fractional row drop before a load is rejected
    #[serde(default)]
    pub max_drop_fraction: Option<f64>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Source URL overrides keyed by source name
    #[serde(default)]
    pub sources: BTreeMap<String, String>,
}

/// Where the loaded configuration came from
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigOrigin {
    /// Parsed from this file
    File(PathBuf),
    /// No config file exists
    Defaults,
    /// A discovered file could not be read or parsed; defaults are in effect
    Unreadable { path: PathBuf, reason: String },
}

impl ConfigOrigin {
    /// Report the origin once logging is up
    pub fn log(&self) {
        match self {
            ConfigOrigin::File(path) => info!("Loaded configuration: {}", path.display()),
            ConfigOrigin::Defaults => info!("No config file found, using defaults"),
            ConfigOrigin::Unreadable { path, reason } => warn!(
                "Ignoring unreadable config file {}: {}. Using defaults.",
                path.display(),
                reason
            ),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
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

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read configuration from an explicit path
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Load configuration with graceful degradation
    ///
    /// An explicit path must exist and parse. Without one, the platform
    /// config locations are searched; absence of any file, or an unreadable
    /// discovered file, yields defaults. Callers report the returned origin
    /// once logging is configured.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, ConfigOrigin)> {
        if let Some(path) = explicit {
            let config = Self::from_file(path)?;
            return Ok((config, ConfigOrigin::File(path.to_path_buf())));
        }

        match default_config_file() {
            Some(path) => match Self::from_file(&path) {
                Ok(config) => Ok((config, ConfigOrigin::File(path))),
                Err(e) => Ok((
                    Self::default(),
                    ConfigOrigin::Unreadable {
                        path,
                        reason: e.to_string(),
                    },
                )),
            },
            None => Ok((Self::default(), ConfigOrigin::Defaults)),
        }
    }

    fn validate(&self) -> Result<()> {
        if let Some(fraction) = self.max_drop_fraction {
            if !(0.0..=1.0).contains(&fraction) {
                return Err(Error::Config(format!(
                    "max_drop_fraction must be within 0.0..=1.0, got {}",
                    fraction
                )));
            }
        }
        Ok(())
    }

    /// Configured drop threshold, or the compiled default
    pub fn max_drop_fraction(&self) -> f64 {
        self.max_drop_fraction.unwrap_or(DEFAULT_MAX_DROP_FRACTION)
    }
}

/// Resolve an optional path setting by CLI → ENV → TOML priority
pub fn resolve_optional_path(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    toml_value: Option<&Path>,
) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: TOML config file
    toml_value.map(Path::to_path_buf)
}

/// Resolve the database path, falling back to the platform data directory
pub fn resolve_database_path(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    toml_value: Option<&Path>,
) -> PathBuf {
    resolve_optional_path(cli_arg, env_var_name, toml_value)
        .unwrap_or_else(default_database_path)
}

/// First existing config file among the platform locations
///
/// Linux checks `~/.config/epi-ingest/config.toml`, then
/// `/etc/epi-ingest/config.toml`.
pub fn default_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join("config.toml"));

    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc").join(APP_DIR_NAME).join("config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// OS-dependent default database location
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from("./epi_data"))
        .join("epi.db")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_yields_defaults() {
        let config = TomlConfig::from_toml_str("").unwrap();
        assert!(config.database_path.is_none());
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.max_drop_fraction(), DEFAULT_MAX_DROP_FRACTION);
        assert!(config.sources.is_empty());
    }

    #[test]
    fn test_out_of_range_drop_fraction_rejected() {
        let result = TomlConfig::from_toml_str("max_drop_fraction = 1.5");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_default_database_path_ends_with_db_file() {
        let path = default_database_path();
        assert_eq!(path.file_name().unwrap(), "epi.db");
    }
}
