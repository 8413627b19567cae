//! Configuration system for Notably.
//!
//! Provides TOML-based configuration with:
//! - `[llm]`, `[storage]`, and `[logging]` sections
//! - Config file layering (user config + project-local overrides)
//! - API key resolution (env var, then config file)

pub mod discovery;
pub mod error;
pub mod secrets;
pub mod types;

pub use discovery::{
    APP_NAME, CONFIG_DIR_ENV, ConfigSource, LoadedConfig, PROJECT_CONFIG_FILE, USER_CONFIG_FILE,
    load_config, load_config_file,
    load_config_with_options, save_config, user_config_dir, user_config_path,
};
pub use error::{ConfigError, Result};
pub use secrets::{ResolvedSecret, SecretSource, require_api_key, resolve_api_key};
pub use types::*;
