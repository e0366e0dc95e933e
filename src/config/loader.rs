//! Config file loader and serialization.

use super::OrchestratorConfig;
use crate::error::ConfigError;
use std::fs;
use std::path::{Path, PathBuf};

/// Supported on-disk formats, picked by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
}

/// Get the per-user config path: ~/.config/wasm-builder/config.json
pub fn get_global_config_path() -> Result<PathBuf, ConfigError> {
    let config_dir = dirs::config_dir().ok_or_else(|| {
        ConfigError::ValidationFailed("Cannot determine config directory".to_string())
    })?;

    Ok(config_dir.join("wasm-builder").join("config.json"))
}

/// Validate config path (.json or .toml extension required).
pub fn validate_config_path(path: &Path) -> Result<ConfigFormat, ConfigError> {
    if path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationFailed(
            "Configuration path cannot be empty".to_string(),
        ));
    }

    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => Ok(ConfigFormat::Json),
        Some("toml") => Ok(ConfigFormat::Toml),
        Some(ext) => Err(ConfigError::ValidationFailed(format!(
            "Configuration file must have .json or .toml extension, got .{}",
            ext
        ))),
        None => Err(ConfigError::ValidationFailed(
            "Configuration file must have .json or .toml extension".to_string(),
        )),
    }
}

/// Load config from a JSON or TOML file. Missing fields take their defaults.
pub fn load_config_from_file(path: &Path) -> Result<OrchestratorConfig, ConfigError> {
    let format = validate_config_path(path)?;

    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ConfigError::FileNotFound(format!(
                "Configuration file not found at: {}",
                path.display()
            ))
        } else {
            ConfigError::IoError(e)
        }
    })?;

    let config = match format {
        ConfigFormat::Json => serde_json::from_str(&content)?,
        ConfigFormat::Toml => toml::from_str(&content)?,
    };

    Ok(config)
}

/// Save config to a JSON or TOML file, creating parent directories.
pub fn save_config_to_file(config: &OrchestratorConfig, path: &Path) -> Result<(), ConfigError> {
    let format = validate_config_path(path)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let content = match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Toml => toml::to_string_pretty(config).map_err(|e| {
            ConfigError::ValidationFailed(format!("Failed to serialize TOML: {}", e))
        })?,
    };

    fs::write(path, content)?;
    Ok(())
}
