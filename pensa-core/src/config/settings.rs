//! Settings configuration loaded from TOML files.
//!
//! This module handles non-sensitive configuration stored in TOML format
//! in the XDG config directory (~/.config/pensa/config.toml).

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::knowledge::{KnowledgeSettings, KnowledgeSourceSpec};

/// Environment variable that relocates the config directory.
pub const CONFIG_DIR_ENV: &str = "PENSA_CONFIG_DIR";

/// Default TOML configuration file content
const DEFAULT_CONFIG_TOML: &str = r#"# pensa configuration file
# Located at: ~/.config/pensa/config.toml

[logging]
# error, warn, info, debug, trace (RUST_LOG takes precedence)
level = "info"

[knowledge]
# Where knowledge documents are fetched from.
# Either an http(s) URL of the website or a local directory (static build output).
base_url = "http://127.0.0.1:3000/"

# Single merged legacy knowledge file. Set to "" to disable.
legacy_path = "/knowledge-base.json"

# Per-source fetch timeout.
fetch_timeout_seconds = 15

# Fetch all sources at once instead of one after another.
parallel_fetch = false

# Maximum number of cached queries (0 = unbounded).
cache_capacity = 0

# Results returned when the caller does not pass a limit.
default_limit = 3

# Declared sources. When omitted the built-in table is used.
# [[knowledge.sources]]
# name = "Pension Schemes"
# path = "/knowledge/pension-schemes.json"
# description = "Tier 1, Tier 2 and Tier 3 scheme rules"

[knowledge.scoring]
# keyword_boost = 0.15
# title_boost = 0.15
# category_boost = 0.10
# route_boost = 0.05
# min_token_len = 3
"#;

/// Settings loaded from TOML configuration file.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Settings {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingSettings,

    /// Knowledge base configuration
    #[serde(default)]
    pub knowledge: KnowledgeBaseSettings,
}

/// Logging settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingSettings {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Knowledge base configuration as written by the user.
///
/// Every field is optional; unset values fall back to the defaults in
/// [`KnowledgeSettings`].
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct KnowledgeBaseSettings {
    /// Website base URL or local directory holding the JSON documents
    pub base_url: Option<String>,

    /// Legacy merged knowledge file (empty string disables it)
    pub legacy_path: Option<String>,

    /// Declared knowledge sources, in priority order
    pub sources: Option<Vec<KnowledgeSourceSpec>>,

    /// Per-source fetch timeout in seconds
    pub fetch_timeout_seconds: Option<u64>,

    /// Fetch sources concurrently
    pub parallel_fetch: Option<bool>,

    /// Query cache bound (0 = unbounded)
    pub cache_capacity: Option<usize>,

    /// Default number of results per query
    pub default_limit: Option<usize>,

    /// Keyword boost overrides
    #[serde(default)]
    pub scoring: ScoringOverrides,
}

/// Keyword boost overrides
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ScoringOverrides {
    pub keyword_boost: Option<f32>,
    pub title_boost: Option<f32>,
    pub category_boost: Option<f32>,
    pub route_boost: Option<f32>,
    pub min_token_len: Option<usize>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Errors that can occur when loading settings
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Config directory not found")]
    ConfigDirNotFound,
}

impl Settings {
    /// Load settings from the TOML configuration file.
    ///
    /// If the config file doesn't exist, creates it with default values.
    /// The file is located at `~/.config/pensa/config.toml`.
    pub fn load() -> Result<Self, SettingsError> {
        let config_path = Self::config_path()?;
        Self::load_from_path(&config_path)
    }

    /// Load settings from `config.toml` inside an explicit directory.
    pub fn load_from_dir(dir: &Path) -> Result<Self, SettingsError> {
        Self::load_from_path(&dir.join("config.toml"))
    }

    fn load_from_path(config_path: &Path) -> Result<Self, SettingsError> {
        // Create default config if it doesn't exist
        if !config_path.exists() {
            tracing::info!("Creating default configuration at {:?}", config_path);
            Self::create_default_config(config_path)?;
        }

        let content = fs::read_to_string(config_path)?;
        Self::from_toml(&content)
    }

    /// Parse settings from TOML content.
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        let settings: Self = toml::from_str(content)?;
        Ok(settings)
    }

    /// Serialize settings to TOML content.
    pub fn to_toml(&self) -> Result<String, SettingsError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Get the configuration file path.
    ///
    /// Uses XDG config directory: `~/.config/pensa/config.toml`
    pub fn config_path() -> Result<PathBuf, SettingsError> {
        if let Ok(override_dir) = std::env::var(CONFIG_DIR_ENV) {
            let dir = PathBuf::from(override_dir);
            return Ok(dir.join("config.toml"));
        }

        let config_dir = dirs::config_dir()
            .ok_or(SettingsError::ConfigDirNotFound)?
            .join("pensa");

        Ok(config_dir.join("config.toml"))
    }

    fn create_default_config(path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, DEFAULT_CONFIG_TOML)?;

        Ok(())
    }

    /// Save settings to a specific file path.
    pub fn save_to_path(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = self.to_toml()?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Resolve the knowledge section into engine settings.
    pub fn knowledge_settings(&self) -> KnowledgeSettings {
        KnowledgeSettings::from(&self.knowledge)
    }
}
