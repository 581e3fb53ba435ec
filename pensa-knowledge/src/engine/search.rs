use std::cmp::Ordering;

use crate::ScoringWeights;
use crate::embeddings::{cosine_similarity, embed};
use crate::errors::KnowledgeResult;
use crate::models::KnowledgeItem;

/// Score of one indexed item, by position in the collection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Scored {
    pub position: usize,
    pub semantic: f32,
    pub keyword_boost: f32,
    pub score: f32,
}

/// Trim and lowercase a raw query.
pub(crate) fn normalize_query(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Whitespace-separated words of at least `min_len` characters.
pub(crate) fn tokenize(normalized: &str, min_len: usize) -> Vec<&str> {
    normalized
        .split_whitespace()
        .filter(|word| word.chars().count() >= min_len)
        .collect()
}

/// Additive boost for keyword, title, category and route matches.
pub(crate) fn keyword_boost(
    item: &KnowledgeItem,
    tokens: &[&str],
    weights: &ScoringWeights,
) -> f32 {
    if tokens.is_empty() {
        return 0.0;
    }

    let mut boost = 0.0;

    for keyword in &item.keywords {
        let keyword = keyword.to_lowercase();
        if tokens.iter().any(|token| *token == keyword) {
            boost += weights.keyword_boost;
        }
    }

    if contains_any(item.title.as_deref(), tokens) {
        boost += weights.title_boost;
    }
    if contains_any(item.category.as_deref(), tokens) {
        boost += weights.category_boost;
    }
    if contains_any(item.route.as_deref(), tokens) {
        boost += weights.route_boost;
    }

    boost
}

fn contains_any(field: Option<&str>, tokens: &[&str]) -> bool {
    let Some(field) = field else {
        return false;
    };
    let field = field.to_lowercase();
    tokens.iter().any(|token| field.contains(token))
}

/// Score every item against `normalized` and sort best first.
///
/// The sort is stable, so equal scores keep collection order.
pub(crate) fn rank(
    items: &[KnowledgeItem],
    normalized: &str,
    weights: &ScoringWeights,
) -> KnowledgeResult<Vec<Scored>> {
    let query_embedding = embed(normalized);
    let tokens = tokenize(normalized, weights.min_token_len);

    let mut scored = Vec::with_capacity(items.len());
    for (position, item) in items.iter().enumerate() {
        let semantic = cosine_similarity(&query_embedding, &item.embedding)?;
        let keyword_boost = keyword_boost(item, &tokens, weights);
        scored.push(Scored {
            position,
            semantic,
            keyword_boost,
            score: semantic + keyword_boost,
        });
    }

    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    Ok(scored)
}
