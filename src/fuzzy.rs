//! Edit-distance similarity scoring over task titles and descriptions.

use crate::id::TaskId;
use crate::text::{normalize, normalize_joined};
use crate::types::Task;
use serde::Serialize;
use std::cmp::Ordering;

/// Default minimum score for `fuzzy_search` results.
pub const DEFAULT_THRESHOLD: f64 = 0.4;

/// A scored match against the task corpus.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SimilarTask {
    pub id: TaskId,
    pub title: String,
    /// Similarity in [0, 1]; 1.0 means identical after normalization.
    pub score: f64,
}

/// Which task fields participate in scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FuzzyKey {
    Title,
    Description,
}

/// Options for `fuzzy_search`.
#[derive(Debug, Clone)]
pub struct FuzzyOptions {
    /// Results scoring below this are dropped.
    pub threshold: f64,
    /// Fields to score; a task's score is the best across its keys.
    pub keys: Vec<FuzzyKey>,
}

impl Default for FuzzyOptions {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            keys: vec![FuzzyKey::Title, FuzzyKey::Description],
        }
    }
}

/// Similarity between two strings in [0, 1].
///
/// The score is the better of a whole-string normalized edit distance and a
/// damped per-token alignment, both over normalized text. Exactly 1.0 only
/// when the strings are identical after normalization. Symmetric, and
/// O(len(a) * len(b)) per pair.
pub fn similarity(a: &str, b: &str) -> f64 {
    let joined_a = normalize_joined(a);
    let joined_b = normalize_joined(b);

    if joined_a == joined_b {
        return 1.0;
    }
    if joined_a.is_empty() || joined_b.is_empty() {
        return 0.0;
    }

    let chars_a: Vec<char> = joined_a.chars().collect();
    let chars_b: Vec<char> = joined_b.chars().collect();
    let max_len = chars_a.len().max(chars_b.len());
    let whole = 1.0 - levenshtein(&chars_a, &chars_b) as f64 / max_len as f64;

    // Token alignment lets a short query land on a long title, damped by
    // the length mismatch and capped so it can never claim exact equality
    let token = 0.95 * token_similarity(&normalize(a), &normalize(b));

    whole.max(token)
}

/// Rank a task corpus against a query.
///
/// Results below `opts.threshold` are dropped; the rest are sorted by
/// descending score with ties kept in corpus order, so output is
/// deterministic for a given input.
pub fn fuzzy_search(tasks: &[Task], query: &str, opts: &FuzzyOptions) -> Vec<SimilarTask> {
    let mut results: Vec<SimilarTask> = tasks
        .iter()
        .filter_map(|task| {
            let mut score: f64 = 0.0;
            for key in &opts.keys {
                let field = match key {
                    FuzzyKey::Title => Some(task.title.as_str()),
                    FuzzyKey::Description => task.description.as_deref(),
                };
                if let Some(text) = field {
                    score = score.max(similarity(query, text));
                }
            }
            if score >= opts.threshold {
                Some(SimilarTask {
                    id: task.id.clone(),
                    title: task.title.clone(),
                    score,
                })
            } else {
                None
            }
        })
        .collect();

    // sort_by is stable: equal scores keep corpus order
    results.sort_by(|x, y| y.score.partial_cmp(&x.score).unwrap_or(Ordering::Equal));
    results
}

/// Two-row Levenshtein over char slices.
fn levenshtein(a: &[char], b: &[char]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            current[j + 1] = substitution.min(prev[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut prev, &mut current);
    }

    prev[b.len()]
}

/// Average best per-token match between the shorter and longer token list,
/// damped by the length ratio so a one-word query cannot fully claim a
/// ten-word title.
fn token_similarity(a: &[String], b: &[String]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let (shorter, longer) = if a.len() <= b.len() { (a, b) } else { (b, a) };

    let total: f64 = shorter
        .iter()
        .map(|s| {
            let sc: Vec<char> = s.chars().collect();
            longer
                .iter()
                .map(|l| {
                    let lc: Vec<char> = l.chars().collect();
                    let max_len = sc.len().max(lc.len());
                    if max_len == 0 {
                        return 0.0;
                    }
                    1.0 - levenshtein(&sc, &lc) as f64 / max_len as f64
                })
                .fold(0.0, f64::max)
        })
        .sum();

    let avg = total / shorter.len() as f64;
    avg * (shorter.len() as f64 / longer.len() as f64).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Priority, Readiness, Status};
    use chrono::Utc;

    fn make_task(id: &str, title: &str, description: Option<&str>) -> Task {
        let now = Utc::now();
        let id = TaskId::parse(id).unwrap();
        Task {
            parent_id: id.parent(),
            id,
            title: title.to_string(),
            description: description.map(String::from),
            body: None,
            status: Status::Todo,
            readiness: Readiness::Ready,
            priority: Priority::Medium,
            tags: vec![],
            metadata: serde_json::json!({}),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_identical_after_normalization_scores_one() {
        assert_eq!(similarity("Implement Login!", "implement   login"), 1.0);
    }

    #[test]
    fn test_near_match_scores_high() {
        let score = similarity("Implement login form", "Implement login page");
        assert!(score >= 0.4, "score was {}", score);
        assert!(score < 1.0);
    }

    #[test]
    fn test_unrelated_scores_low() {
        let near = similarity("Implement login form", "Implement login page");
        let far = similarity("Implement login form", "Quarterly revenue report");
        assert!(far < near);
    }

    #[test]
    fn test_similarity_is_symmetric() {
        let ab = similarity("fix auth bug", "auth bug in login");
        let ba = similarity("auth bug in login", "fix auth bug");
        assert!((ab - ba).abs() < 1e-12);
    }

    #[test]
    fn test_empty_vs_nonempty() {
        assert_eq!(similarity("", "something"), 0.0);
        assert_eq!(similarity("", ""), 1.0);
    }

    #[test]
    fn test_levenshtein_basics() {
        let a: Vec<char> = "kitten".chars().collect();
        let b: Vec<char> = "sitting".chars().collect();
        assert_eq!(levenshtein(&a, &b), 3);
        assert_eq!(levenshtein(&a, &a), 0);
        assert_eq!(levenshtein(&a, &[]), 6);
    }

    #[test]
    fn test_short_query_hits_long_title() {
        let score = similarity("login", "Implement login page");
        assert!(score >= 0.4, "score was {}", score);
    }

    #[test]
    fn test_fuzzy_search_threshold_filters() {
        let tasks = vec![
            make_task("1", "Implement login page", None),
            make_task("2", "Quarterly revenue report", None),
        ];

        let results = fuzzy_search(&tasks, "Implement login form", &FuzzyOptions::default());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id.to_string(), "1");
        assert!(results.iter().all(|r| r.score >= DEFAULT_THRESHOLD));
    }

    #[test]
    fn test_fuzzy_search_raising_threshold_yields_subset() {
        let tasks = vec![
            make_task("1", "Implement login page", None),
            make_task("2", "Implement logout page", None),
            make_task("3", "Login form styling", None),
        ];

        let low = fuzzy_search(
            &tasks,
            "implement login form",
            &FuzzyOptions {
                threshold: 0.2,
                ..Default::default()
            },
        );
        let high = fuzzy_search(
            &tasks,
            "implement login form",
            &FuzzyOptions {
                threshold: 0.6,
                ..Default::default()
            },
        );

        for result in &high {
            assert!(low.iter().any(|r| r.id == result.id));
        }
        assert!(high.len() <= low.len());
    }

    #[test]
    fn test_fuzzy_search_sorted_descending_stable() {
        let tasks = vec![
            make_task("1", "alpha", None),
            make_task("2", "exact match", None),
            make_task("3", "alpha", None),
        ];

        let results = fuzzy_search(
            &tasks,
            "exact match",
            &FuzzyOptions {
                threshold: 0.0,
                ..Default::default()
            },
        );

        assert_eq!(results[0].id.to_string(), "2");
        // equal scores keep corpus order
        assert_eq!(results[1].id.to_string(), "1");
        assert_eq!(results[2].id.to_string(), "3");
    }

    #[test]
    fn test_fuzzy_search_scores_description() {
        let tasks = vec![make_task(
            "1",
            "Misc chore",
            Some("Implement the login form for the portal"),
        )];

        let with_desc = fuzzy_search(&tasks, "implement login form", &FuzzyOptions::default());
        assert_eq!(with_desc.len(), 1);

        let title_only = fuzzy_search(
            &tasks,
            "implement login form",
            &FuzzyOptions {
                threshold: DEFAULT_THRESHOLD,
                keys: vec![FuzzyKey::Title],
            },
        );
        assert!(title_only.is_empty());
    }
}
