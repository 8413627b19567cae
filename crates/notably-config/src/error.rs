//! Configuration error types.

/// Result type alias for config operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur during configuration loading and resolution.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read a config file.
    #[error("failed to read config file '{path}': {source}")]
    ReadFile {
        path: String,
        source: std::io::Error,
    },

    /// Failed to write a config file.
    #[error("failed to write config file '{path}': {source}")]
    WriteFile {
        path: String,
        source: std::io::Error,
    },

    /// Failed to parse TOML.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Failed to serialize config.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// API key not found through any resolution method.
    #[error(
        "API key not found for backend '{backend}'. Set the {env_var} environment variable or api_key in [llm]"
    )]
    ApiKeyNotFound { backend: String, env_var: String },

    /// No platform directory available and none configured.
    #[error("cannot determine {0} directory; set it explicitly")]
    NoDirectory(&'static str),

    /// A value is out of range.
    #[error("invalid value for '{field}': {message}")]
    Invalid { field: String, message: String },
}
