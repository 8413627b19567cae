//! Configuration types mapping to the TOML schema.
//!
//! ```toml
//! [llm]        # generation service
//! [storage]    # where notes are kept
//! [logging]    # log file output
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, Result};

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5";

/// Output token budget used when none is configured.
pub const DEFAULT_MAX_TOKENS: u32 = 8192;

/// HTTP timeout used when none is configured.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Storage key used when none is configured.
pub const DEFAULT_NOTES_KEY: &str = "notably-notes";

/// Persisted content cap used when none is configured.
pub const DEFAULT_CONTENT_LIMIT: usize = 5000;

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// All sections are optional so that partial configs (e.g., project-local
/// overrides) can be loaded and merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotablyConfig {
    /// Generation service settings.
    pub llm: Option<LlmConfig>,

    /// Note storage settings.
    pub storage: Option<StorageConfig>,

    /// Log output settings.
    pub logging: Option<LoggingConfig>,
}

impl NotablyConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one (other takes priority).
    ///
    /// Sections replace whole sections, matching how a project file
    /// overrides the user file.
    pub fn merge(&mut self, other: NotablyConfig) {
        if other.llm.is_some() {
            self.llm = other.llm;
        }

        if other.storage.is_some() {
            self.storage = other.storage;
        }

        if other.logging.is_some() {
            self.logging = other.logging;
        }
    }

    /// The `[llm]` section, or defaults.
    pub fn llm(&self) -> LlmConfig {
        self.llm.clone().unwrap_or_default()
    }

    /// The `[storage]` section, or defaults.
    pub fn storage(&self) -> StorageConfig {
        self.storage.clone().unwrap_or_default()
    }

    /// The `[logging]` section, or defaults.
    pub fn logging(&self) -> LoggingConfig {
        self.logging.clone().unwrap_or_default()
    }

    /// A starter config with every section filled in with defaults.
    pub fn starter() -> Self {
        Self {
            llm: Some(LlmConfig {
                backend: Some(Backend::Anthropic),
                model: Some(DEFAULT_MODEL.to_string()),
                max_tokens: Some(DEFAULT_MAX_TOKENS),
                timeout_secs: Some(DEFAULT_TIMEOUT_SECS),
                ..Default::default()
            }),
            storage: Some(StorageConfig {
                notes_key: Some(DEFAULT_NOTES_KEY.to_string()),
                content_limit: Some(DEFAULT_CONTENT_LIMIT),
                ..Default::default()
            }),
            logging: Some(LoggingConfig::default()),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// LLM Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration for the generation backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Backend provider.
    pub backend: Option<Backend>,
    /// Model identifier.
    pub model: Option<String>,
    /// Custom API base URL (for proxies, custom endpoints).
    pub base_url: Option<String>,
    /// API key (prefer the env var; warns if set here).
    pub api_key: Option<String>,
    /// Output token budget per request.
    pub max_tokens: Option<u32>,
    /// HTTP request timeout in seconds.
    pub timeout_secs: Option<u64>,
}

impl LlmConfig {
    /// Returns true if an API key is stored directly in the config file.
    pub fn has_plaintext_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    pub fn effective_backend(&self) -> Backend {
        self.backend.unwrap_or_default()
    }

    pub fn effective_model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    pub fn effective_max_tokens(&self) -> Result<u32> {
        match self.max_tokens {
            Some(0) => Err(ConfigError::Invalid {
                field: "llm.max_tokens".to_string(),
                message: "must be greater than zero".to_string(),
            }),
            Some(n) => Ok(n),
            None => Ok(DEFAULT_MAX_TOKENS),
        }
    }

    pub fn effective_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }
}

/// Supported generation backends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Anthropic,
}

impl Backend {
    /// Environment variable name for this backend's API key.
    pub fn env_var(&self) -> &'static str {
        match self {
            Backend::Anthropic => "ANTHROPIC_API_KEY",
        }
    }

    /// Human-readable name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Backend::Anthropic => "Anthropic",
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Storage Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "NOTABLY_DATA_DIR";

/// Where and how notes are persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the note blob.
    ///
    /// Can be overridden by the `NOTABLY_DATA_DIR` environment variable.
    pub data_dir: Option<PathBuf>,
    /// Key the collection is stored under.
    pub notes_key: Option<String>,
    /// Per-note cap on persisted content, in characters.
    pub content_limit: Option<usize>,
}

impl StorageConfig {
    /// Get the effective data directory, checking the environment first.
    ///
    /// Resolution order:
    /// 1. `NOTABLY_DATA_DIR` environment variable
    /// 2. Configured `data_dir` value
    /// 3. Platform data directory (`~/.local/share/notably` on Linux)
    pub fn effective_data_dir(&self) -> Result<PathBuf> {
        if let Ok(dir) = std::env::var(DATA_DIR_ENV)
            && !dir.is_empty()
        {
            return Ok(PathBuf::from(dir));
        }
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        dirs::data_dir()
            .map(|d| d.join(crate::discovery::APP_NAME))
            .ok_or(ConfigError::NoDirectory("data"))
    }

    pub fn effective_notes_key(&self) -> &str {
        self.notes_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .unwrap_or(DEFAULT_NOTES_KEY)
    }

    pub fn effective_content_limit(&self) -> usize {
        self.content_limit.unwrap_or(DEFAULT_CONTENT_LIMIT)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Logging Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Logging configuration section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Whether to write a JSON log file alongside console output.
    pub file: bool,
    /// Directory for log files. Defaults to `<config dir>/logs`.
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: true,
            directory: None,
        }
    }
}
