//! Knowledge base configuration types.
//!
//! These types define the resolved (non-optional) settings used by
//! `pensa-knowledge`. They are created from the user-facing
//! `KnowledgeBaseSettings` TOML structs via `From`.

use serde::{Deserialize, Serialize};

use super::settings::{KnowledgeBaseSettings, ScoringOverrides};

/// Statically declared knowledge collections: `(name, path, description)`.
const DEFAULT_SOURCE_TABLE: &[(&str, &str, &str)] = &[
    (
        "Company Info",
        "/knowledge/company-info.json",
        "Company background, licensing and leadership",
    ),
    (
        "Pension Schemes",
        "/knowledge/pension-schemes.json",
        "Tier 1, Tier 2 and Tier 3 scheme rules",
    ),
    (
        "Services",
        "/knowledge/services.json",
        "Administration, trusteeship and advisory services",
    ),
    (
        "FAQs",
        "/knowledge/faqs.json",
        "Frequently asked member and employer questions",
    ),
    (
        "Contact",
        "/knowledge/contact.json",
        "Offices, phone lines and support hours",
    ),
];

/// One named knowledge collection and where to fetch it from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeSourceSpec {
    pub name: String,
    /// Location relative to the knowledge base URL (or directory).
    pub path: String,
    #[serde(default)]
    pub description: String,
}

impl KnowledgeSourceSpec {
    pub fn new(
        name: impl Into<String>,
        path: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            description: description.into(),
        }
    }
}

/// The built-in source table, in declaration order.
pub fn default_sources() -> Vec<KnowledgeSourceSpec> {
    DEFAULT_SOURCE_TABLE
        .iter()
        .map(|(name, path, description)| KnowledgeSourceSpec::new(*name, *path, *description))
        .collect()
}

/// Resolved knowledge engine settings (all values filled with defaults).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeSettings {
    /// `http(s)://` base URL, `file://` URL or plain directory path.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Location of the single merged legacy file. `None` disables that stream.
    #[serde(default = "default_legacy_path")]
    pub legacy_path: Option<String>,
    #[serde(default = "default_sources")]
    pub sources: Vec<KnowledgeSourceSpec>,
    #[serde(default = "default_fetch_timeout_seconds")]
    pub fetch_timeout_seconds: u64,
    /// Fetch all declared sources concurrently instead of one after another.
    #[serde(default)]
    pub parallel_fetch: bool,
    /// `None` keeps every cached query for the life of the process.
    #[serde(default)]
    pub cache_capacity: Option<usize>,
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    #[serde(default)]
    pub scoring: ScoringWeights,
}

impl Default for KnowledgeSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            legacy_path: default_legacy_path(),
            sources: default_sources(),
            fetch_timeout_seconds: default_fetch_timeout_seconds(),
            parallel_fetch: false,
            cache_capacity: None,
            default_limit: default_limit(),
            scoring: ScoringWeights::default(),
        }
    }
}

/// Additive keyword boosts applied on top of the similarity score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    /// Added once per item keyword equal to a query token.
    #[serde(default = "default_keyword_boost")]
    pub keyword_boost: f32,
    #[serde(default = "default_title_boost")]
    pub title_boost: f32,
    #[serde(default = "default_category_boost")]
    pub category_boost: f32,
    #[serde(default = "default_route_boost")]
    pub route_boost: f32,
    /// Query words shorter than this are ignored for boosting.
    #[serde(default = "default_min_token_len")]
    pub min_token_len: usize,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            keyword_boost: default_keyword_boost(),
            title_boost: default_title_boost(),
            category_boost: default_category_boost(),
            route_boost: default_route_boost(),
            min_token_len: default_min_token_len(),
        }
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:3000/".to_string()
}

fn default_legacy_path() -> Option<String> {
    Some("/knowledge-base.json".to_string())
}

fn default_fetch_timeout_seconds() -> u64 {
    15
}

fn default_limit() -> usize {
    3
}

fn default_keyword_boost() -> f32 {
    0.15
}

fn default_title_boost() -> f32 {
    0.15
}

fn default_category_boost() -> f32 {
    0.10
}

fn default_route_boost() -> f32 {
    0.05
}

fn default_min_token_len() -> usize {
    3
}

impl From<&KnowledgeBaseSettings> for KnowledgeSettings {
    fn from(value: &KnowledgeBaseSettings) -> Self {
        let mut settings = KnowledgeSettings::default();
        if let Some(url) = &value.base_url {
            settings.base_url = url.clone();
        }
        if let Some(path) = &value.legacy_path {
            let trimmed = path.trim();
            settings.legacy_path = if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            };
        }
        if let Some(sources) = &value.sources {
            settings.sources = sources.clone();
        }
        if let Some(seconds) = value.fetch_timeout_seconds {
            settings.fetch_timeout_seconds = seconds;
        }
        if let Some(parallel) = value.parallel_fetch {
            settings.parallel_fetch = parallel;
        }
        if let Some(capacity) = value.cache_capacity {
            // 0 means "no bound", matching the page-lifetime cache.
            settings.cache_capacity = (capacity > 0).then_some(capacity);
        }
        if let Some(limit) = value.default_limit {
            settings.default_limit = limit;
        }
        apply_scoring_overrides(&mut settings.scoring, &value.scoring);
        settings
    }
}

fn apply_scoring_overrides(scoring: &mut ScoringWeights, overrides: &ScoringOverrides) {
    if let Some(boost) = overrides.keyword_boost {
        scoring.keyword_boost = boost;
    }
    if let Some(boost) = overrides.title_boost {
        scoring.title_boost = boost;
    }
    if let Some(boost) = overrides.category_boost {
        scoring.category_boost = boost;
    }
    if let Some(boost) = overrides.route_boost {
        scoring.route_boost = boost;
    }
    if let Some(len) = overrides.min_token_len {
        scoring.min_token_len = len;
    }
}
