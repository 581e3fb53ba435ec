//! Configuration management for pensa.
//!
//! Settings are non-sensitive and live in a TOML file. The knowledge base
//! reads public JSON documents, so there are no secrets to separate out.
//!
//! ## Settings (TOML File)
//! Located at `~/.config/pensa/config.toml` (or `$PENSA_CONFIG_DIR/config.toml`):
//! ```toml
//! [logging]
//! level = "info"
//!
//! [knowledge]
//! base_url = "https://www.example-pensions.com/"
//! legacy_path = "/knowledge-base.json"
//! fetch_timeout_seconds = 15
//! parallel_fetch = false
//! cache_capacity = 0
//! default_limit = 3
//!
//! [[knowledge.sources]]
//! name = "Pension Schemes"
//! path = "/knowledge/pension-schemes.json"
//! description = "Tier 1, Tier 2 and Tier 3 scheme rules"
//! ```

pub mod knowledge;
mod settings;

pub use knowledge::{KnowledgeSettings, KnowledgeSourceSpec, ScoringWeights, default_sources};
pub use settings::{
    KnowledgeBaseSettings, LoggingSettings, ScoringOverrides, Settings, SettingsError,
};

/// Load .env file if it exists (for development convenience).
pub fn load_dotenv() {
    let _ = dotenvy::dotenv();
}
