use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

/// A unit of retrievable knowledge in the merged index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KnowledgeItem {
    /// Unique within the merged collection (`existing_*` or `new_*`).
    pub id: String,
    pub content: String,
    pub title: Option<String>,
    pub category: Option<String>,
    pub keywords: Vec<String>,
    /// Site route the knowledge applies to. Only used for boosting.
    pub route: Option<String>,
    /// Provenance: `"existing"` for the legacy file, otherwise the source name.
    pub source: String,
    pub created_at: Option<DateTime<Utc>>,
    /// Fingerprint of `content`, computed once at index time.
    #[serde(skip)]
    pub embedding: Vec<f32>,
}

/// One entry as it appears in a knowledge JSON document.
///
/// Legacy documents only guarantee `id` and `content`; newer collections also
/// carry `category`, `title`, `keywords` and ISO-8601 timestamps.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawKnowledgeEntry {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub keywords: Option<Vec<String>>,
    #[serde(default)]
    pub route: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl RawKnowledgeEntry {
    /// `route`, falling back to the legacy `path` field.
    pub fn route(&self) -> Option<&str> {
        self.route.as_deref().or(self.path.as_deref())
    }
}

/// An entry produced by the source loader, tagged with its provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedItem {
    /// Name of the declared source this entry came from.
    pub source: String,
    /// `<source_prefix>_<raw id>`, unique across all sources.
    pub prefixed_id: String,
    /// Parsed `createdAt`, falling back to `updatedAt`.
    pub timestamp: Option<DateTime<Utc>>,
    pub entry: RawKnowledgeEntry,
}

/// A ranked item together with the parts of its score.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredItem {
    pub item: KnowledgeItem,
    pub semantic: f32,
    pub keyword_boost: f32,
    pub score: f32,
}

/// Outcome of loading every knowledge stream during initialization.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadReport {
    /// `None` when the legacy stream is disabled.
    pub legacy: Option<SourceOutcome>,
    /// One outcome per declared source, in declaration order.
    pub sources: Vec<SourceOutcome>,
}

impl LoadReport {
    /// True when at least one source is declared and none of them loaded.
    pub fn all_sources_failed(&self) -> bool {
        !self.sources.is_empty() && self.sources.iter().all(SourceOutcome::is_failed)
    }

    /// Failed sources (legacy included).
    pub fn failures(&self) -> impl Iterator<Item = &SourceOutcome> {
        self.legacy
            .iter()
            .chain(self.sources.iter())
            .filter(|outcome| outcome.is_failed())
    }

    /// Number of entries loaded across all streams.
    pub fn loaded_items(&self) -> usize {
        self.legacy
            .iter()
            .chain(self.sources.iter())
            .map(|outcome| match outcome.status {
                SourceStatus::Loaded { items, .. } => items,
                SourceStatus::Failed { .. } => 0,
            })
            .sum()
    }

    pub(crate) fn source_failure_summary(&self) -> String {
        self.sources
            .iter()
            .filter_map(|outcome| match &outcome.status {
                SourceStatus::Failed { reason } => Some(format!("{}: {}", outcome.name, reason)),
                SourceStatus::Loaded { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceOutcome {
    pub name: String,
    pub location: String,
    pub status: SourceStatus,
}

impl SourceOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self.status, SourceStatus::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceStatus {
    /// `skipped` counts array entries that did not match the item shape.
    Loaded { items: usize, skipped: usize },
    Failed { reason: String },
}

/// Accept ids written either as JSON strings or numbers.
fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    struct IdVisitor;

    impl<'de> Visitor<'de> for IdVisitor {
        type Value = String;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string or numeric id")
        }

        fn visit_str<E>(self, value: &str) -> Result<String, E>
        where
            E: de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_u64<E>(self, value: u64) -> Result<String, E>
        where
            E: de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_i64<E>(self, value: i64) -> Result<String, E>
        where
            E: de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_f64<E>(self, value: f64) -> Result<String, E>
        where
            E: de::Error,
        {
            Ok(value.to_string())
        }
    }

    deserializer.deserialize_any(IdVisitor)
}
