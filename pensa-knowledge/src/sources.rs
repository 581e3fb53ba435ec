//! Knowledge source loading.
//!
//! Fetches the declared JSON collections through a [`SourceFetcher`],
//! normalizes every entry and tags it with its source. A source that fails
//! to fetch or parse is logged and skipped; the rest still load.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use futures::future::join_all;
use tracing::{debug, info, warn};
use url::Url;

use crate::KnowledgeSettings;
use crate::errors::{KnowledgeError, KnowledgeResult};
use crate::models::{LoadReport, LoadedItem, RawKnowledgeEntry, SourceOutcome, SourceStatus};
use pensa_core::KnowledgeSourceSpec;

const USER_AGENT: &str = concat!("pensa-knowledge/", env!("CARGO_PKG_VERSION"));

/// Retrieves raw knowledge documents by location (e.g. `/knowledge/faqs.json`).
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch(&self, location: &str) -> KnowledgeResult<Vec<u8>>;
}

/// Fetches documents over HTTP relative to the website base URL.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    base_url: Url,
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(base_url: &str, timeout: Duration) -> KnowledgeResult<Self> {
        let mut normalized = base_url.trim().to_string();
        if !normalized.ends_with('/') {
            normalized.push('/');
        }
        let base_url = Url::parse(&normalized)
            .map_err(|e| KnowledgeError::InvalidUrl(format!("{}: {}", base_url, e)))?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| KnowledgeError::SourceFetch(format!("reqwest client: {}", e)))?;

        Ok(Self { base_url, client })
    }

    /// Resolve a location the way a browser would against the site root.
    pub fn resolve(&self, location: &str) -> KnowledgeResult<Url> {
        self.base_url
            .join(location)
            .map_err(|e| KnowledgeError::InvalidUrl(format!("{}: {}", location, e)))
    }
}

#[async_trait]
impl SourceFetcher for HttpFetcher {
    async fn fetch(&self, location: &str) -> KnowledgeResult<Vec<u8>> {
        let url = self.resolve(location)?;
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| KnowledgeError::SourceFetch(format!("HTTP fetch {}: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(KnowledgeError::SourceFetch(format!(
                "HTTP {} for {}",
                response.status(),
                url
            )));
        }

        Ok(response.bytes().await?.to_vec())
    }
}

/// Reads documents from a directory, e.g. a static site build.
#[derive(Debug, Clone)]
pub struct FsFetcher {
    root: PathBuf,
}

impl FsFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn resolve(&self, location: &str) -> PathBuf {
        self.root.join(location.trim_start_matches('/'))
    }
}

#[async_trait]
impl SourceFetcher for FsFetcher {
    async fn fetch(&self, location: &str) -> KnowledgeResult<Vec<u8>> {
        let path = self.resolve(location);
        tokio::fs::read(&path)
            .await
            .map_err(|e| KnowledgeError::SourceFetch(format!("read {}: {}", path.display(), e)))
    }
}

/// Serves documents held in memory, e.g. bundled with `include_str!`.
#[derive(Debug, Clone, Default)]
pub struct MemoryFetcher {
    documents: HashMap<String, Vec<u8>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, location: &str, body: impl Into<Vec<u8>>) -> Self {
        self.insert(location, body);
        self
    }

    pub fn insert(&mut self, location: &str, body: impl Into<Vec<u8>>) {
        self.documents
            .insert(location.trim_start_matches('/').to_string(), body.into());
    }
}

#[async_trait]
impl SourceFetcher for MemoryFetcher {
    async fn fetch(&self, location: &str) -> KnowledgeResult<Vec<u8>> {
        self.documents
            .get(location.trim_start_matches('/'))
            .cloned()
            .ok_or_else(|| KnowledgeError::SourceFetch(format!("no document at {}", location)))
    }
}

/// Pick a fetcher for the configured base URL.
///
/// `http(s)://` goes over the network, `file://` and bare paths read from disk.
pub fn fetcher_for(settings: &KnowledgeSettings) -> KnowledgeResult<Arc<dyn SourceFetcher>> {
    let base = settings.base_url.trim();
    if base.starts_with("http://") || base.starts_with("https://") {
        let timeout = Duration::from_secs(settings.fetch_timeout_seconds);
        return Ok(Arc::new(HttpFetcher::new(base, timeout)?));
    }

    if let Some(rest) = base.strip_prefix("file://") {
        return Ok(Arc::new(FsFetcher::new(rest)));
    }

    if base.contains("://") {
        return Err(KnowledgeError::InvalidUrl(format!(
            "unsupported scheme in {}",
            base
        )));
    }

    Ok(Arc::new(FsFetcher::new(base)))
}

/// Entries parsed from one document.
#[derive(Debug, Clone, Default)]
pub struct ParsedDocument {
    pub entries: Vec<RawKnowledgeEntry>,
    /// Array elements that were not valid knowledge entries.
    pub skipped: usize,
}

impl ParsedDocument {
    fn status(&self) -> SourceStatus {
        SourceStatus::Loaded {
            items: self.entries.len(),
            skipped: self.skipped,
        }
    }
}

/// Parse a knowledge document: a JSON array of entry objects.
///
/// Anything other than an array fails the document; individual elements
/// that don't match the entry shape are skipped.
pub fn parse_document(bytes: &[u8]) -> KnowledgeResult<ParsedDocument> {
    let value: serde_json::Value = serde_json::from_slice(bytes)?;
    let serde_json::Value::Array(values) = value else {
        return Err(KnowledgeError::SourceFetch(
            "expected a JSON array of knowledge entries".to_string(),
        ));
    };

    let mut parsed = ParsedDocument::default();
    for (index, value) in values.into_iter().enumerate() {
        match serde_json::from_value::<RawKnowledgeEntry>(value) {
            Ok(entry) => parsed.entries.push(entry),
            Err(e) => {
                warn!(index, error = %e, "skipping malformed knowledge entry");
                parsed.skipped += 1;
            }
        }
    }

    Ok(parsed)
}

/// Lowercase the source name and join its words with `_`.
pub fn source_prefix(name: &str) -> String {
    name.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

/// Parse an ISO-8601 timestamp. Date-only and zone-less values are read as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// `createdAt`, falling back to `updatedAt`.
pub fn entry_timestamp(entry: &RawKnowledgeEntry) -> Option<DateTime<Utc>> {
    entry
        .created_at
        .as_deref()
        .and_then(parse_timestamp)
        .or_else(|| entry.updated_at.as_deref().and_then(parse_timestamp))
}

impl LoadedItem {
    pub fn new(source: &str, entry: RawKnowledgeEntry) -> Self {
        let timestamp = entry_timestamp(&entry);
        Self {
            source: source.to_string(),
            prefixed_id: format!("{}_{}", source_prefix(source), entry.id),
            timestamp,
            entry,
        }
    }
}

/// Everything the loader produced for the declared sources.
#[derive(Debug, Clone, Default)]
pub struct LoadedKnowledge {
    /// Newest first; undated entries last, in declaration order.
    pub items: Vec<LoadedItem>,
    pub report: LoadReport,
}

/// Fetch one document with the configured timeout applied.
pub async fn fetch_bounded(
    fetcher: &dyn SourceFetcher,
    location: &str,
    timeout: Duration,
) -> KnowledgeResult<Vec<u8>> {
    match tokio::time::timeout(timeout, fetcher.fetch(location)).await {
        Ok(result) => result,
        Err(_) => Err(KnowledgeError::Timeout {
            location: location.to_string(),
            seconds: timeout.as_secs(),
        }),
    }
}

async fn load_document(
    fetcher: &dyn SourceFetcher,
    location: &str,
    timeout: Duration,
) -> KnowledgeResult<ParsedDocument> {
    let bytes = fetch_bounded(fetcher, location, timeout).await?;
    parse_document(&bytes)
}

/// Load every declared source and merge the results.
///
/// Never fails as a whole: per-source errors end up in the report.
pub async fn load_all_knowledge(
    fetcher: &dyn SourceFetcher,
    settings: &KnowledgeSettings,
) -> LoadedKnowledge {
    let timeout = Duration::from_secs(settings.fetch_timeout_seconds);
    let sources = &settings.sources;

    let attempts: Vec<KnowledgeResult<ParsedDocument>> = if settings.parallel_fetch {
        join_all(
            sources
                .iter()
                .map(|spec| load_document(fetcher, &spec.path, timeout)),
        )
        .await
    } else {
        let mut attempts = Vec::with_capacity(sources.len());
        for spec in sources {
            attempts.push(load_document(fetcher, &spec.path, timeout).await);
        }
        attempts
    };

    let mut loaded = LoadedKnowledge::default();
    for (spec, attempt) in sources.iter().zip(attempts) {
        let status = match attempt {
            Ok(document) => {
                info!(
                    source = %spec.name,
                    items = document.entries.len(),
                    skipped = document.skipped,
                    "loaded knowledge source"
                );
                let status = document.status();
                loaded.items.extend(
                    document
                        .entries
                        .into_iter()
                        .map(|entry| LoadedItem::new(&spec.name, entry)),
                );
                status
            }
            Err(e) => {
                warn!(source = %spec.name, location = %spec.path, error = %e, "skipping knowledge source");
                SourceStatus::Failed {
                    reason: e.to_string(),
                }
            }
        };
        loaded.report.sources.push(outcome(spec, status));
    }

    // Stable: equal (or missing) timestamps keep declaration order.
    loaded.items.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    debug!(total = loaded.items.len(), "merged knowledge sources");
    loaded
}

/// Load the single merged legacy document, if one is configured.
///
/// Returns `Ok(None)` when the legacy stream is disabled.
pub async fn load_legacy(
    fetcher: &dyn SourceFetcher,
    settings: &KnowledgeSettings,
) -> KnowledgeResult<Option<ParsedDocument>> {
    let Some(location) = settings.legacy_path.as_deref() else {
        return Ok(None);
    };
    let timeout = Duration::from_secs(settings.fetch_timeout_seconds);
    let document = load_document(fetcher, location, timeout).await?;
    info!(
        items = document.entries.len(),
        skipped = document.skipped,
        "loaded legacy knowledge base"
    );
    Ok(Some(document))
}

pub(crate) fn legacy_outcome(
    location: &str,
    result: &KnowledgeResult<Option<ParsedDocument>>,
) -> Option<SourceOutcome> {
    let status = match result {
        Ok(Some(document)) => document.status(),
        Ok(None) => return None,
        Err(e) => SourceStatus::Failed {
            reason: e.to_string(),
        },
    };
    Some(SourceOutcome {
        name: "existing".to_string(),
        location: location.to_string(),
        status,
    })
}

fn outcome(spec: &KnowledgeSourceSpec, status: SourceStatus) -> SourceOutcome {
    SourceOutcome {
        name: spec.name.clone(),
        location: spec.path.clone(),
        status,
    }
}
