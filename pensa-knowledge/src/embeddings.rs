//! Character-frequency fingerprints and cosine similarity.
//!
//! The fingerprint is not a semantic embedding: every UTF-16 code unit of the
//! lowercased, trimmed text increments slot `code % 100`, then the vector is
//! L2-normalized. Texts with the same character distribution score as near
//! identical regardless of word order. Scores and cached rankings depend on
//! this exact behavior, so a model-backed embedder must replace it wholesale.

use crate::errors::{KnowledgeError, KnowledgeResult};

/// Length of every vector produced by [`embed`].
pub const EMBEDDING_DIM: usize = 100;

/// Compute the fixed-length fingerprint of `text`.
///
/// Empty (or whitespace-only) input yields the all-zero vector, which is
/// returned without normalization.
pub fn embed(text: &str) -> Vec<f32> {
    let normalized = text.trim().to_lowercase();
    let mut vector = vec![0.0f32; EMBEDDING_DIM];

    for unit in normalized.encode_utf16() {
        vector[usize::from(unit) % EMBEDDING_DIM] += 1.0;
    }

    let magnitude = magnitude(&vector);
    if magnitude > 0.0 {
        for value in &mut vector {
            *value /= magnitude;
        }
    }

    vector
}

/// Cosine similarity of two vectors of equal length.
///
/// Returns `0.0` when either vector has zero magnitude. Mixed lengths mean
/// the index was built with inconsistent embeddings and fail loudly.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> KnowledgeResult<f32> {
    if a.len() != b.len() {
        return Err(KnowledgeError::EmbeddingDimMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a = magnitude(a);
    let norm_b = magnitude(b);

    if norm_a > 0.0 && norm_b > 0.0 {
        Ok(dot / (norm_a * norm_b))
    } else {
        Ok(0.0)
    }
}

fn magnitude(vector: &[f32]) -> f32 {
    vector.iter().map(|x| x * x).sum::<f32>().sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    #[test]
    fn test_embed_has_fixed_dimension() {
        let long = "x".repeat(10_000);
        for text in ["", "a", "Tier 2 contributions are 5%", long.as_str()] {
            assert_eq!(embed(text).len(), EMBEDDING_DIM);
        }
    }

    #[test]
    fn test_embed_is_deterministic() {
        let text = "How do I withdraw my Tier 2 benefits?";
        assert_eq!(embed(text), embed(text));
    }

    #[test]
    fn test_embed_is_unit_length() {
        for text in ["pension", "  Tier 3 is voluntary  ", "ÉPARGNE retraite", "€ 100"] {
            let norm = magnitude(&embed(text));
            assert!((norm - 1.0).abs() < EPS, "norm of {text:?} was {norm}");
        }
    }

    #[test]
    fn test_embed_empty_is_zero_vector() {
        assert!(embed("").iter().all(|v| *v == 0.0));
        assert!(embed("   \n\t").iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_embed_normalizes_case_and_whitespace() {
        assert_eq!(embed("  Pension Schemes "), embed("pension schemes"));
    }

    #[test]
    fn test_embed_slot_is_code_unit_mod_dim() {
        // 'e' = 101 -> slot 1, 'd' = 100 -> slot 0
        let vector = embed("ed");
        let expected = 1.0 / 2.0f32.sqrt();
        assert!((vector[0] - expected).abs() < EPS);
        assert!((vector[1] - expected).abs() < EPS);
        assert_eq!(vector.iter().filter(|v| **v > 0.0).count(), 2);
    }

    #[test]
    fn test_embed_counts_surrogate_pairs_separately() {
        // U+1F600 encodes as 0xD83D 0xDE00 -> slots 55357 % 100 and 56832 % 100.
        let vector = embed("\u{1F600}");
        assert!(vector[57] > 0.0);
        assert!(vector[32] > 0.0);
        assert_eq!(vector.iter().filter(|v| **v > 0.0).count(), 2);
    }

    #[test]
    fn test_embed_ignores_word_order() {
        let a = embed("tier two pension");
        let b = embed("pension two tier");
        let similarity = cosine_similarity(&a, &b).unwrap();
        assert!((similarity - 1.0).abs() < EPS);
    }

    #[test]
    fn test_cosine_self_similarity() {
        let v = embed("voluntary contributions");
        assert!((cosine_similarity(&v, &v).unwrap() - 1.0).abs() < EPS);

        let raw = [3.0, 4.0, 0.0];
        assert!((cosine_similarity(&raw, &raw).unwrap() - 1.0).abs() < EPS);
    }

    #[test]
    fn test_cosine_orthogonal_and_opposite() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).unwrap(), 0.0);
        let opposite = cosine_similarity(&[1.0, 2.0], &[-1.0, -2.0]).unwrap();
        assert!((opposite + 1.0).abs() < EPS);
    }

    #[test]
    fn test_cosine_zero_vector_is_zero() {
        let zero = embed("");
        let v = embed("tier");
        assert_eq!(cosine_similarity(&zero, &v).unwrap(), 0.0);
        assert_eq!(cosine_similarity(&zero, &zero).unwrap(), 0.0);
    }

    #[test]
    fn test_cosine_dimension_mismatch() {
        let err = cosine_similarity(&[1.0, 2.0, 3.0], &[1.0, 2.0]).unwrap_err();
        assert!(matches!(
            err,
            KnowledgeError::EmbeddingDimMismatch {
                expected: 3,
                actual: 2
            }
        ));
    }
}
