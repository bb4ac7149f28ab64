use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default root of a system-wide engine install.
pub const DEFAULT_INSTALL_ROOT: &str = "/opt/renode";

/// Log filter used when neither the file nor the environment sets one.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Top-level bootstrap configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    /// Where the engine comes from.
    pub source: SourceConfig,
    /// Host runtime flavor name (`mono` or `coreclr`). `None` picks the
    /// source's default.
    pub runtime: Option<String>,
    /// Skip bootstrapping entirely (the caller has already loaded the engine).
    pub skip_bootstrap: bool,
    /// Logging settings.
    pub log: LogSettings,
}

/// Source selectors plus layout overrides.
///
/// At most one of `package`, `build_dir`, `binary` and `installed` may be
/// set. When none is set the system install is used.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceConfig {
    /// Packaged distribution archive.
    pub package: Option<PathBuf>,
    /// Build output tree.
    pub build_dir: Option<PathBuf>,
    /// Standalone single-file executable.
    pub binary: Option<PathBuf>,
    /// Explicitly request the system install.
    pub installed: bool,
    /// Binaries directory, relative to the engine root. Overrides pattern
    /// based discovery.
    pub build_output: Option<PathBuf>,
    /// Root of the system install. `None` means [`DEFAULT_INSTALL_ROOT`].
    pub install_root: Option<PathBuf>,
}

impl SourceConfig {
    /// The install root in effect.
    #[must_use]
    pub fn effective_install_root(&self) -> PathBuf {
        self.install_root
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_INSTALL_ROOT))
    }

    /// Names of the source selectors that are set, in declaration order.
    #[must_use]
    pub fn selected(&self) -> Vec<&'static str> {
        let mut selected = Vec::new();
        if self.package.is_some() {
            selected.push("package");
        }
        if self.build_dir.is_some() {
            selected.push("build_dir");
        }
        if self.binary.is_some() {
            selected.push("binary");
        }
        if self.installed {
            selected.push("installed");
        }
        selected
    }
}

/// The `[log]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogSettings {
    /// Filter directive, e.g. `info` or `emubridge_host=debug`. `None`
    /// means [`DEFAULT_LOG_LEVEL`].
    pub level: Option<String>,
    /// Output format: `pretty`, `compact`, `json` or `full`.
    pub format: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: None,
            format: "compact".to_owned(),
        }
    }
}

impl LogSettings {
    /// The filter directive in effect.
    #[must_use]
    pub fn effective_level(&self) -> &str {
        self.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_select_nothing() {
        let config = BridgeConfig::default();
        assert!(config.source.selected().is_empty());
        assert_eq!(
            config.source.effective_install_root(),
            PathBuf::from("/opt/renode")
        );
        assert_eq!(config.log.effective_level(), "info");
        assert!(!config.skip_bootstrap);
    }

    #[test]
    fn selected_lists_every_source() {
        let source = SourceConfig {
            package: Some("renode.pkg.tar".into()),
            binary: Some("renode".into()),
            installed: true,
            ..Default::default()
        };
        assert_eq!(source.selected(), vec!["package", "binary", "installed"]);
    }

    #[test]
    fn parses_full_file() {
        let config: BridgeConfig = toml::from_str(
            r#"
            runtime = "coreclr"

            [source]
            build_dir = "/src/renode"
            build_output = "output/bin/Debug"

            [log]
            level = "debug"
            format = "json"
        "#,
        )
        .unwrap();

        assert_eq!(config.runtime.as_deref(), Some("coreclr"));
        assert_eq!(config.source.build_dir, Some(PathBuf::from("/src/renode")));
        assert_eq!(
            config.source.build_output,
            Some(PathBuf::from("output/bin/Debug"))
        );
        assert_eq!(config.log.format, "json");
        assert_eq!(config.log.level.as_deref(), Some("debug"));
    }

    #[test]
    fn rejects_unknown_keys() {
        let result: Result<BridgeConfig, _> = toml::from_str("[source]\nbuild_directory = \"x\"");
        assert!(result.is_err());
    }
}
