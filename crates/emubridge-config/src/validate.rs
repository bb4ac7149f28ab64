use crate::error::{ConfigError, ConfigResult};
use crate::types::BridgeConfig;

const LOG_FORMATS: &[&str] = &["pretty", "compact", "json", "full"];

/// Check field-level rules.
///
/// Source ambiguity and runtime support are checked by the runtime locator,
/// which owns those error kinds.
///
/// # Errors
///
/// Returns [`ConfigError::ValidationError`] naming the first offending field.
pub fn validate(config: &BridgeConfig) -> ConfigResult<()> {
    if let Some(output) = &config.source.build_output
        && output.is_absolute()
    {
        return Err(ConfigError::ValidationError {
            field: "source.build_output".to_owned(),
            message: format!(
                "'{}' must be relative to the engine root",
                output.display()
            ),
        });
    }

    if let Some(root) = &config.source.install_root
        && !root.has_root()
    {
        return Err(ConfigError::ValidationError {
            field: "source.install_root".to_owned(),
            message: format!("'{}' must be an absolute path", root.display()),
        });
    }

    if config.runtime.as_deref().is_some_and(|r| r.trim().is_empty()) {
        return Err(ConfigError::ValidationError {
            field: "runtime".to_owned(),
            message: "must not be empty".to_owned(),
        });
    }

    if !LOG_FORMATS.contains(&config.log.format.as_str()) {
        return Err(ConfigError::ValidationError {
            field: "log.format".to_owned(),
            message: format!(
                "'{}' is not one of {}",
                config.log.format,
                LOG_FORMATS.join(", ")
            ),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(validate(&BridgeConfig::default()).is_ok());
    }

    #[test]
    fn absolute_build_output_rejected() {
        let mut config = BridgeConfig::default();
        config.source.build_output = Some(PathBuf::from("/abs/bin"));
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("source.build_output"));
    }

    #[test]
    fn unknown_log_format_rejected() {
        let mut config = BridgeConfig::default();
        config.log.format = "xml".to_owned();
        assert!(validate(&config).is_err());
    }
}
