use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, warn};

use crate::KnowledgeSettings;
use crate::cache::{CacheKey, QueryCache};
use crate::embeddings::embed;
use crate::errors::{KnowledgeError, KnowledgeResult};
use crate::models::{KnowledgeItem, LoadReport, LoadedItem, RawKnowledgeEntry, ScoredItem};
use crate::sources::{
    LoadedKnowledge, SourceFetcher, entry_timestamp, fetcher_for, legacy_outcome,
    load_all_knowledge, load_legacy,
};

pub(crate) mod search;

/// Provenance tag for entries from the merged legacy file.
pub const LEGACY_SOURCE: &str = "existing";

/// In-memory knowledge index with a query cache.
///
/// The index is built once, on the first `initialize` or `query`, and is
/// read-only afterwards. Concurrent callers share a single in-flight
/// initialization; a failed one leaves the engine uninitialized so the next
/// call starts over.
pub struct KnowledgeEngine {
    settings: KnowledgeSettings,
    fetcher: Arc<dyn SourceFetcher>,
    index: OnceCell<KnowledgeIndex>,
    cache: Mutex<QueryCache>,
}

#[derive(Debug)]
struct KnowledgeIndex {
    items: Vec<KnowledgeItem>,
    report: LoadReport,
}

impl KnowledgeEngine {
    /// Build an engine that fetches from the configured base URL or directory.
    pub fn new(settings: KnowledgeSettings) -> KnowledgeResult<Self> {
        let fetcher = fetcher_for(&settings)?;
        Ok(Self::with_fetcher(settings, fetcher))
    }

    pub fn with_fetcher(settings: KnowledgeSettings, fetcher: Arc<dyn SourceFetcher>) -> Self {
        let cache = QueryCache::new(settings.cache_capacity);
        Self {
            settings,
            fetcher,
            index: OnceCell::new(),
            cache: Mutex::new(cache),
        }
    }

    /// Access the knowledge settings.
    pub fn settings(&self) -> &KnowledgeSettings {
        &self.settings
    }

    /// Load every knowledge stream. No-op once initialized.
    pub async fn initialize(&self) -> KnowledgeResult<()> {
        self.index().await.map(|_| ())
    }

    pub fn is_initialized(&self) -> bool {
        self.index.initialized()
    }

    /// Number of indexed items (0 before initialization).
    pub fn len(&self) -> usize {
        self.items().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }

    /// The merged collection: legacy entries first, then loaded sources.
    pub fn items(&self) -> &[KnowledgeItem] {
        self.index
            .get()
            .map(|index| index.items.as_slice())
            .unwrap_or_default()
    }

    pub fn load_report(&self) -> Option<&LoadReport> {
        self.index.get().map(|index| &index.report)
    }

    pub async fn cache_len(&self) -> usize {
        self.cache.lock().await.len()
    }

    /// Return up to `limit` items, most relevant first.
    ///
    /// Initializes on first use. Repeated `(query, limit)` pairs are served
    /// from the cache without re-ranking.
    pub async fn query(&self, text: &str, limit: usize) -> KnowledgeResult<Vec<KnowledgeItem>> {
        let index = self.index().await?;
        let normalized = search::normalize_query(text);
        let key = CacheKey::new(normalized.clone(), limit);

        if let Some(cached) = self.cache.lock().await.get(&key) {
            debug!(query = %normalized, limit, "knowledge cache hit");
            return Ok(cached);
        }

        let ranked = search::rank(&index.items, &normalized, &self.settings.scoring)?;
        let results: Vec<KnowledgeItem> = ranked
            .iter()
            .take(limit)
            .map(|scored| index.items[scored.position].clone())
            .collect();

        debug!(query = %normalized, limit, hits = results.len(), "knowledge query ranked");
        self.cache.lock().await.insert(key, results.clone());
        Ok(results)
    }

    /// [`query`](Self::query) with the configured default limit.
    pub async fn query_default(&self, text: &str) -> KnowledgeResult<Vec<KnowledgeItem>> {
        self.query(text, self.settings.default_limit).await
    }

    /// Rank like `query` but return score breakdowns. Bypasses the cache.
    pub async fn explain(&self, text: &str, limit: usize) -> KnowledgeResult<Vec<ScoredItem>> {
        let index = self.index().await?;
        let normalized = search::normalize_query(text);
        let ranked = search::rank(&index.items, &normalized, &self.settings.scoring)?;

        Ok(ranked
            .into_iter()
            .take(limit)
            .map(|scored| ScoredItem {
                item: index.items[scored.position].clone(),
                semantic: scored.semantic,
                keyword_boost: scored.keyword_boost,
                score: scored.score,
            })
            .collect())
    }

    async fn index(&self) -> KnowledgeResult<&KnowledgeIndex> {
        self.index
            .get_or_try_init(|| build_index(&self.settings, self.fetcher.as_ref()))
            .await
    }
}

impl fmt::Debug for KnowledgeEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KnowledgeEngine")
            .field("settings", &self.settings)
            .field("initialized", &self.is_initialized())
            .field("items", &self.len())
            .finish_non_exhaustive()
    }
}

async fn build_index(
    settings: &KnowledgeSettings,
    fetcher: &dyn SourceFetcher,
) -> KnowledgeResult<KnowledgeIndex> {
    let (legacy, loaded) = tokio::join!(
        load_legacy(fetcher, settings),
        load_all_knowledge(fetcher, settings)
    );
    let LoadedKnowledge {
        items: loaded_items,
        mut report,
    } = loaded;

    report.legacy = legacy_outcome(settings.legacy_path.as_deref().unwrap_or_default(), &legacy);

    let sources_failed = report.all_sources_failed();
    let legacy_entries = match legacy {
        Ok(Some(document)) => document.entries,
        // Nothing enabled loaded: fail so the next call retries.
        Ok(None) if sources_failed => {
            return Err(KnowledgeError::InitFailed {
                legacy: "disabled".to_string(),
                sources: report.source_failure_summary(),
            });
        }
        Ok(None) => Vec::new(),
        Err(e) => {
            if report.sources.is_empty() || sources_failed {
                return Err(KnowledgeError::InitFailed {
                    legacy: e.to_string(),
                    sources: report.source_failure_summary(),
                });
            }
            warn!(error = %e, "legacy knowledge base unavailable, continuing without it");
            Vec::new()
        }
    };

    let mut items = Vec::with_capacity(legacy_entries.len() + loaded_items.len());
    items.extend(legacy_entries.into_iter().map(legacy_item));
    items.extend(source_items(loaded_items));

    info!(
        items = items.len(),
        failed_sources = report.failures().count(),
        "knowledge base initialized"
    );

    Ok(KnowledgeIndex { items, report })
}

fn legacy_item(entry: RawKnowledgeEntry) -> KnowledgeItem {
    let id = format!("{}_{}", LEGACY_SOURCE, entry.id);
    let created_at = entry_timestamp(&entry);
    to_item(id, LEGACY_SOURCE.to_string(), created_at, entry)
}

/// Assign `new_<raw id>`, or `new_<source-prefixed id>` when the raw id
/// appears in more than one loaded entry.
fn source_items(loaded: Vec<LoadedItem>) -> Vec<KnowledgeItem> {
    let ids: Vec<String> = {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for item in &loaded {
            *counts.entry(item.entry.id.as_str()).or_default() += 1;
        }
        loaded
            .iter()
            .map(|item| {
                if counts.get(item.entry.id.as_str()).copied() == Some(1) {
                    format!("new_{}", item.entry.id)
                } else {
                    format!("new_{}", item.prefixed_id)
                }
            })
            .collect()
    };

    loaded
        .into_iter()
        .zip(ids)
        .map(|(item, id)| to_item(id, item.source, item.timestamp, item.entry))
        .collect()
}

fn to_item(
    id: String,
    source: String,
    created_at: Option<DateTime<Utc>>,
    entry: RawKnowledgeEntry,
) -> KnowledgeItem {
    let route = entry.route().map(str::to_string);
    let embedding = embed(&entry.content);
    KnowledgeItem {
        id,
        content: entry.content,
        title: entry.title,
        category: entry.category,
        keywords: entry.keywords.unwrap_or_default(),
        route,
        source,
        created_at,
        embedding,
    }
}
