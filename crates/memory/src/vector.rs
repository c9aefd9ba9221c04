//! Vector similarity and result ranking.

use mastermind_core::knowledge::KnowledgeItem;
use std::cmp::Ordering;

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1] where 1 = identical, 0 = orthogonal, -1 = opposite.
/// Returns 0.0 if either vector is zero-length, empty, or the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        return 0.0;
    }

    (dot / denom) as f32
}

/// Retrieval order: importance desc, relevance desc, newest first, then ID.
pub fn retrieval_order(a: &KnowledgeItem, b: &KnowledgeItem) -> Ordering {
    b.importance
        .partial_cmp(&a.importance)
        .unwrap_or(Ordering::Equal)
        .then_with(|| b.relevance.partial_cmp(&a.relevance).unwrap_or(Ordering::Equal))
        .then_with(|| b.created_at.cmp(&a.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

/// Score every item against `query_embedding`, sort by [`retrieval_order`],
/// and keep the first `limit`.
pub fn rank(mut items: Vec<KnowledgeItem>, query_embedding: &[f32], limit: usize) -> Vec<KnowledgeItem> {
    for item in &mut items {
        item.relevance = cosine_similarity(&item.embedding, query_embedding);
    }
    items.sort_by(retrieval_order);
    items.truncate(limit);
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use mastermind_core::Tier;

    fn item(id: &str, importance: f32, embedding: Vec<f32>) -> KnowledgeItem {
        let mut it = KnowledgeItem::new(id, embedding, "general", importance, Tier::ShortTerm);
        it.id = id.to_string();
        it
    }

    #[test]
    fn cosine_identical_vectors() {
        let v = vec![1.0, 2.0, 3.0];
        let sim = cosine_similarity(&v, &v);
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_orthogonal_vectors() {
        let sim = cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]);
        assert!(sim.abs() < 1e-6);
    }

    #[test]
    fn cosine_opposite_vectors() {
        let sim = cosine_similarity(&[1.0, 2.0], &[-1.0, -2.0]);
        assert!((sim + 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn importance_dominates_relevance() {
        let query = vec![1.0, 0.0];
        let ranked = rank(
            vec![
                item("relevant", 0.5, vec![1.0, 0.0]),
                item("important", 0.9, vec![0.0, 1.0]),
            ],
            &query,
            10,
        );
        assert_eq!(ranked[0].id, "important");
        assert!((ranked[1].relevance - 1.0).abs() < 1e-6);
    }

    #[test]
    fn relevance_breaks_importance_ties() {
        let query = vec![1.0, 0.0];
        let ranked = rank(
            vec![
                item("far", 0.6, vec![0.0, 1.0]),
                item("near", 0.6, vec![1.0, 0.1]),
            ],
            &query,
            10,
        );
        assert_eq!(ranked[0].id, "near");
        assert_eq!(ranked[1].id, "far");
    }

    #[test]
    fn full_ties_fall_back_to_recency_then_id() {
        let query = vec![1.0, 0.0];
        let mut a = item("a", 0.6, vec![1.0, 0.0]);
        let mut b = item("b", 0.6, vec![1.0, 0.0]);
        let c = item("c", 0.6, vec![1.0, 0.0]);
        a.created_at = c.created_at;
        b.created_at = c.created_at;
        let mut newest = item("z", 0.6, vec![1.0, 0.0]);
        newest.created_at = c.created_at + chrono::Duration::seconds(1);

        let ranked = rank(vec![c, b, newest, a], &query, 10);
        let ids: Vec<&str> = ranked.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["z", "a", "b", "c"]);
    }

    #[test]
    fn rank_truncates() {
        let ranked = rank(
            vec![item("a", 0.9, vec![]), item("b", 0.8, vec![]), item("c", 0.7, vec![])],
            &[],
            2,
        );
        assert_eq!(ranked.len(), 2);
    }
}
