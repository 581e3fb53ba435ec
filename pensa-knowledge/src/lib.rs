//! Knowledge retrieval for the pensa assistant.
//!
//! Loads the site's knowledge JSON collections, fingerprints every entry and
//! answers free-text queries with the most relevant items.

pub mod cache;
pub mod embeddings;
pub mod engine;
pub mod errors;
pub mod models;
pub mod sources;

pub use pensa_core::{KnowledgeSettings, KnowledgeSourceSpec, ScoringWeights};
pub use engine::{KnowledgeEngine, LEGACY_SOURCE};
pub use errors::{KnowledgeError, KnowledgeResult};
pub use models::{
    KnowledgeItem, LoadReport, LoadedItem, RawKnowledgeEntry, ScoredItem, SourceOutcome,
    SourceStatus,
};
pub use sources::{FsFetcher, HttpFetcher, MemoryFetcher, SourceFetcher, fetcher_for};
