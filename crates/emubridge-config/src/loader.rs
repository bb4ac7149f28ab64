//! Implements the `BridgeConfig::load()` algorithm:
//! 1. Start from defaults
//! 2. Overlay the config file, if one exists
//! 3. Apply env var fallbacks for unset fields
//! 4. Validate

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::env::{EMUBRIDGE_CONFIG, apply_env_fallbacks};
use crate::error::{ConfigError, ConfigResult};
use crate::types::BridgeConfig;
use crate::validate;

/// Maximum allowed config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// Load the configuration from an optional file plus environment fallbacks.
///
/// A missing file is not an error; the defaults are used instead.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file is malformed, an environment
/// variable is invalid, or the merged result fails validation.
pub fn load(path: Option<&Path>, env_vars: &HashMap<String, String>) -> ConfigResult<BridgeConfig> {
    let mut config = match path {
        Some(path) => try_load_file(path)?.unwrap_or_default(),
        None => BridgeConfig::default(),
    };

    let env_count = apply_env_fallbacks(&mut config, env_vars)?;
    if env_count > 0 {
        debug!(count = env_count, "applied environment variable fallbacks");
    }

    validate::validate(&config)?;
    Ok(config)
}

/// Load a config from a specific file path (no environment fallbacks).
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read or parsed.
pub fn load_file(path: &Path) -> ConfigResult<BridgeConfig> {
    let config = try_load_file(path)?.ok_or_else(|| ConfigError::ReadError {
        path: path.display().to_string(),
        source: std::io::Error::from(std::io::ErrorKind::NotFound),
    })?;
    validate::validate(&config)?;
    Ok(config)
}

/// Location of the config file: `$EMUBRIDGE_CONFIG`, else the per-user
/// config directory.
#[must_use]
pub fn config_file_path(env_vars: &HashMap<String, String>) -> Option<PathBuf> {
    if let Some(explicit) = env_vars.get(EMUBRIDGE_CONFIG).filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(explicit));
    }
    directories::ProjectDirs::from("", "", "emubridge")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Try to load a file, returning `None` if the file doesn't exist.
///
/// Uses a single read operation to avoid TOCTOU races.
fn try_load_file(path: &Path) -> ConfigResult<Option<BridgeConfig>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "config file not found, skipping");
            return Ok(None);
        },
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: path.display().to_string(),
                source: e,
            });
        },
    };

    if content.len() as u64 > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!(
                "config file is {} bytes, exceeding the {} byte limit",
                content.len(),
                MAX_CONFIG_FILE_SIZE
            ),
        });
    }

    let config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })?;

    info!(path = %path.display(), "loaded config file");
    Ok(Some(config))
}
