#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
//! Bootstrap configuration for emubridge.
//!
//! The configuration is read once per process, before the engine is
//! located. It names at most one distribution source of the engine, the host
//! runtime flavor, an optional binaries-directory override, a skip flag and
//! the log settings.
//!
//! # Usage
//!
//! ```rust,no_run
//! use emubridge_config::BridgeConfig;
//!
//! // Defaults → config file → EMUBRIDGE_* environment variables.
//! let config = BridgeConfig::load().unwrap();
//! if let Some(dir) = &config.source.build_dir {
//!     println!("Using build tree {}", dir.display());
//! }
//! ```
//!
//! # Precedence
//!
//! 1. **Config file** (`$EMUBRIDGE_CONFIG`, else `<user config dir>/emubridge/config.toml`)
//! 2. **Environment variables** (`EMUBRIDGE_*`), fallback for unset fields only
//! 3. **Defaults**
//!
//! Whether the chosen source selectors are consistent is *not* checked here.
//! The runtime locator rejects ambiguous sources before touching the
//! filesystem.

/// Environment variable names and fallback resolution.
pub mod env;
/// Configuration error types.
pub mod error;
/// Configuration file discovery and loading.
pub mod loader;
/// Configuration struct definitions.
pub mod types;
/// Configuration validation rules.
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use types::*;

impl BridgeConfig {
    /// Load configuration from the default file location and the process
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the config file is malformed or the
    /// result fails validation.
    pub fn load() -> ConfigResult<Self> {
        let env_vars = env::collect_env_vars();
        let path = loader::config_file_path(&env_vars);
        loader::load(path.as_deref(), &env_vars)
    }

    /// Build a configuration from environment variables only.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a variable holds an invalid value.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_env_map(&env::collect_env_vars())
    }

    /// Build a configuration from an explicit variable map.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a variable holds an invalid value.
    pub fn from_env_map(env_vars: &std::collections::HashMap<String, String>) -> ConfigResult<Self> {
        loader::load(None, env_vars)
    }
}
