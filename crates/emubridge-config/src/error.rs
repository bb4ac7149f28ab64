use thiserror::Error;

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path of the file.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The config file is not valid TOML or does not match the schema.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path of the file.
        path: String,
        /// Underlying parse error.
        source: toml::de::Error,
    },

    /// A field holds a value that is not allowed.
    #[error("invalid value for {field}: {message}")]
    ValidationError {
        /// Field or environment variable name.
        field: String,
        /// Why the value was rejected.
        message: String,
    },
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
