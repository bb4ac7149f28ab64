use std::collections::HashMap;
use std::path::PathBuf;

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::types::BridgeConfig;

/// Packaged distribution archive.
pub const EMUBRIDGE_PKG: &str = "EMUBRIDGE_PKG";
/// Build output tree.
pub const EMUBRIDGE_BUILD_DIR: &str = "EMUBRIDGE_BUILD_DIR";
/// Standalone single-file executable.
pub const EMUBRIDGE_BIN: &str = "EMUBRIDGE_BIN";
/// Binaries directory override, relative to the engine root.
pub const EMUBRIDGE_BUILD_OUTPUT: &str = "EMUBRIDGE_BUILD_OUTPUT";
/// Host runtime flavor.
pub const EMUBRIDGE_RUNTIME: &str = "EMUBRIDGE_RUNTIME";
/// Skip bootstrapping.
pub const EMUBRIDGE_SKIP_LOAD: &str = "EMUBRIDGE_SKIP_LOAD";
/// Root of the system install.
pub const EMUBRIDGE_INSTALL_ROOT: &str = "EMUBRIDGE_INSTALL_ROOT";
/// Log filter directive.
pub const EMUBRIDGE_LOG: &str = "EMUBRIDGE_LOG";
/// Explicit config file path.
pub const EMUBRIDGE_CONFIG: &str = "EMUBRIDGE_CONFIG";

/// Snapshot the `EMUBRIDGE_*` variables of the process environment.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars()
        .filter(|(key, _)| key.starts_with("EMUBRIDGE_"))
        .collect()
}

/// Fill fields the config file left unset from environment variables.
///
/// Empty values count as unset. Returns the number of fields filled.
///
/// # Errors
///
/// Returns [`ConfigError::ValidationError`] naming the variable if a boolean
/// variable cannot be interpreted.
pub fn apply_env_fallbacks(
    config: &mut BridgeConfig,
    env_vars: &HashMap<String, String>,
) -> ConfigResult<usize> {
    let get = |name: &str| env_vars.get(name).filter(|v| !v.is_empty());
    let mut applied = 0usize;

    let mut fill_path = |slot: &mut Option<PathBuf>, name: &str| {
        if slot.is_none()
            && let Some(value) = get(name)
        {
            debug!(var = name, "using environment fallback");
            *slot = Some(PathBuf::from(value));
            applied = applied.saturating_add(1);
        }
    };

    fill_path(&mut config.source.package, EMUBRIDGE_PKG);
    fill_path(&mut config.source.build_dir, EMUBRIDGE_BUILD_DIR);
    fill_path(&mut config.source.binary, EMUBRIDGE_BIN);
    fill_path(&mut config.source.build_output, EMUBRIDGE_BUILD_OUTPUT);
    fill_path(&mut config.source.install_root, EMUBRIDGE_INSTALL_ROOT);

    if config.runtime.is_none()
        && let Some(value) = get(EMUBRIDGE_RUNTIME)
    {
        config.runtime = Some(value.trim().to_ascii_lowercase());
        applied = applied.saturating_add(1);
    }

    if !config.skip_bootstrap
        && let Some(value) = get(EMUBRIDGE_SKIP_LOAD)
    {
        config.skip_bootstrap = parse_flag(EMUBRIDGE_SKIP_LOAD, value)?;
        applied = applied.saturating_add(1);
    }

    if config.log.level.is_none()
        && let Some(value) = get(EMUBRIDGE_LOG)
    {
        config.log.level = Some(value.clone());
        applied = applied.saturating_add(1);
    }

    Ok(applied)
}

fn parse_flag(name: &str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::ValidationError {
            field: name.to_owned(),
            message: format!("expected a boolean, got '{other}'"),
        }),
    }
}
