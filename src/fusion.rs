//! Combine semantic and edit-distance result lists into one ranking.

use crate::fuzzy::SimilarTask;
use std::cmp::Ordering;

/// Default weight given to the semantic side of a fused score.
pub const DEFAULT_SEMANTIC_WEIGHT: f64 = 0.65;

/// Merge two scored result lists into one ranking.
///
/// A task present in both lists scores `semantic * weight + fuzzy *
/// (1 - weight)`; a task present in only one list keeps its weighted
/// component alone, so single-source matches are never inflated to a
/// full-confidence score. Ties keep input order (semantic entries first),
/// making the output deterministic.
pub fn combine(semantic: &[SimilarTask], fuzzy: &[SimilarTask], weight: f64) -> Vec<SimilarTask> {
    let weight = weight.clamp(0.0, 1.0);
    let mut combined: Vec<SimilarTask> = Vec::with_capacity(semantic.len() + fuzzy.len());

    for entry in semantic {
        let fuzzy_score = fuzzy
            .iter()
            .find(|f| f.id == entry.id)
            .map(|f| f.score)
            .unwrap_or(0.0);
        combined.push(SimilarTask {
            id: entry.id.clone(),
            title: entry.title.clone(),
            score: entry.score * weight + fuzzy_score * (1.0 - weight),
        });
    }

    for entry in fuzzy {
        if semantic.iter().any(|s| s.id == entry.id) {
            continue;
        }
        combined.push(SimilarTask {
            id: entry.id.clone(),
            title: entry.title.clone(),
            score: entry.score * (1.0 - weight),
        });
    }

    // sort_by is stable: equal scores keep insertion order
    combined.sort_by(|x, y| y.score.partial_cmp(&x.score).unwrap_or(Ordering::Equal));
    combined
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::TaskId;

    fn entry(id: &str, score: f64) -> SimilarTask {
        SimilarTask {
            id: TaskId::parse(id).unwrap(),
            title: format!("Task {}", id),
            score,
        }
    }

    #[test]
    fn test_combine_weights_both_sources() {
        let semantic = vec![entry("1", 0.8)];
        let fuzzy = vec![entry("1", 0.6)];

        let combined = combine(&semantic, &fuzzy, 0.65);
        assert_eq!(combined.len(), 1);
        let expected = 0.8 * 0.65 + 0.6 * 0.35;
        assert!((combined[0].score - expected).abs() < 1e-12);
    }

    #[test]
    fn test_combine_single_source_keeps_weighted_component() {
        let semantic = vec![entry("1", 0.8)];
        let fuzzy = vec![entry("2", 0.9)];

        let combined = combine(&semantic, &fuzzy, 0.65);
        assert_eq!(combined.len(), 2);

        let sem = combined.iter().find(|e| e.id.to_string() == "1").unwrap();
        let fuz = combined.iter().find(|e| e.id.to_string() == "2").unwrap();
        assert!((sem.score - 0.8 * 0.65).abs() < 1e-12);
        assert!((fuz.score - 0.9 * 0.35).abs() < 1e-12);
    }

    #[test]
    fn test_combine_empty_fuzzy_preserves_semantic_order() {
        let semantic = vec![entry("1", 0.9), entry("2", 0.7), entry("3", 0.5)];

        let combined = combine(&semantic, &[], 0.65);
        let ids: Vec<String> = combined.iter().map(|e| e.id.to_string()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
        for (before, after) in semantic.iter().zip(&combined) {
            assert!((after.score - before.score * 0.65).abs() < 1e-12);
        }
    }

    #[test]
    fn test_combine_deduplicates_by_id() {
        let semantic = vec![entry("1", 0.5), entry("2", 0.5)];
        let fuzzy = vec![entry("2", 0.5), entry("3", 0.5)];

        let combined = combine(&semantic, &fuzzy, 0.5);
        assert_eq!(combined.len(), 3);
    }

    #[test]
    fn test_combine_sorted_descending_with_stable_ties() {
        let semantic = vec![entry("1", 0.4), entry("2", 0.4)];
        let fuzzy = vec![entry("3", 0.9)];

        let combined = combine(&semantic, &fuzzy, 0.5);
        let ids: Vec<String> = combined.iter().map(|e| e.id.to_string()).collect();
        // 3 scores 0.45; 1 and 2 tie at 0.2 in input order
        assert_eq!(ids, vec!["3", "1", "2"]);
    }

    #[test]
    fn test_combine_is_deterministic() {
        let semantic = vec![entry("1", 0.7), entry("2", 0.7), entry("3", 0.1)];
        let fuzzy = vec![entry("2", 0.4), entry("4", 0.4)];

        let first = combine(&semantic, &fuzzy, DEFAULT_SEMANTIC_WEIGHT);
        let second = combine(&semantic, &fuzzy, DEFAULT_SEMANTIC_WEIGHT);
        assert_eq!(first, second);
    }

    #[test]
    fn test_combine_clamps_weight() {
        let semantic = vec![entry("1", 0.8)];
        let combined = combine(&semantic, &[], 2.0);
        assert!((combined[0].score - 0.8).abs() < 1e-12);
    }
}
