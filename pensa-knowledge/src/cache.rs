//! Query result cache.
//!
//! Keys are the normalized query text plus the requested limit. Entries are
//! never invalidated: a hit returns the ranking computed the first time,
//! even if the index were to change afterwards.

use std::collections::HashMap;

use crate::models::KnowledgeItem;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub query: String,
    pub limit: usize,
}

impl CacheKey {
    /// `query` must already be normalized (trimmed, lowercased).
    pub fn new(query: impl Into<String>, limit: usize) -> Self {
        Self {
            query: query.into(),
            limit,
        }
    }
}

#[derive(Debug)]
struct CacheEntry {
    results: Vec<KnowledgeItem>,
    last_used: u64,
}

/// Maps `(normalized query, limit)` to a ranked result list.
///
/// Unbounded by default. With a capacity, the least recently used entry is
/// evicted when a new key would exceed it.
#[derive(Debug, Default)]
pub struct QueryCache {
    entries: HashMap<CacheKey, CacheEntry>,
    capacity: Option<usize>,
    clock: u64,
}

impl QueryCache {
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            entries: HashMap::new(),
            capacity,
            clock: 0,
        }
    }

    pub fn get(&mut self, key: &CacheKey) -> Option<Vec<KnowledgeItem>> {
        let tick = self.tick();
        let entry = self.entries.get_mut(key)?;
        entry.last_used = tick;
        Some(entry.results.clone())
    }

    pub fn insert(&mut self, key: CacheKey, results: Vec<KnowledgeItem>) {
        if self.capacity == Some(0) {
            return;
        }
        let full = self
            .capacity
            .is_some_and(|capacity| self.entries.len() >= capacity);
        if full && !self.entries.contains_key(&key) {
            self.evict_oldest();
        }
        let tick = self.tick();
        self.entries.insert(
            key,
            CacheEntry {
                results,
                last_used: tick,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn evict_oldest(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_used)
            .map(|(key, _)| key.clone());
        if let Some(key) = oldest {
            self.entries.remove(&key);
        }
    }
}
