pub mod config;

// Config re-exports
pub use config::{
    KnowledgeBaseSettings,
    KnowledgeSettings,
    KnowledgeSourceSpec,
    LoggingSettings,
    ScoringOverrides,
    ScoringWeights,
    Settings,
    SettingsError,
    load_dotenv,
};
