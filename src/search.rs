//! Query-facing search over the store: extraction, filtering, similarity.

use crate::extract::{extract_filters, ExtractedFilters, Vocabulary};
use crate::fusion::combine;
use crate::fuzzy::{fuzzy_search, FuzzyOptions, SimilarTask, DEFAULT_THRESHOLD};
use crate::store::{Store, StoreError};
use crate::types::{Priority, Readiness, Status, Task};

/// Explicit structural filters, merged over whatever a query's text implies.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskFilters {
    pub status: Option<Status>,
    pub readiness: Option<Readiness>,
    pub priority: Option<Priority>,
    pub tags: Vec<String>,
}

impl TaskFilters {
    /// Merge explicit filters over extracted hints; explicit values win
    /// field by field.
    fn merge(&self, extracted: &ExtractedFilters) -> TaskFilters {
        TaskFilters {
            status: self.status.or(extracted.status),
            readiness: self.readiness.or(extracted.readiness),
            priority: self.priority.or(extracted.priority),
            tags: if self.tags.is_empty() {
                extracted.tags.clone()
            } else {
                self.tags.clone()
            },
        }
    }

    fn matches(&self, task: &Task) -> bool {
        if let Some(status) = self.status
            && task.status != status
        {
            return false;
        }
        if let Some(readiness) = self.readiness
            && task.readiness != readiness
        {
            return false;
        }
        if let Some(priority) = self.priority
            && task.priority != priority
        {
            return false;
        }
        self.tags.iter().all(|tag| task.tags.contains(tag))
    }
}

/// Search and similarity operations layered over [`Store`].
pub trait StoreSearchExt {
    /// Natural-language search with the default vocabulary.
    fn search(&self, query: &str, filters: &TaskFilters) -> Result<Vec<Task>, StoreError>;

    /// Natural-language search with a caller-provided vocabulary.
    fn search_with_vocabulary(
        &self,
        query: &str,
        filters: &TaskFilters,
        vocab: &Vocabulary,
    ) -> Result<Vec<Task>, StoreError>;

    /// Find tasks whose title or description resembles `title`.
    fn find_similar(&self, title: &str, threshold: f64) -> Result<Vec<SimilarTask>, StoreError>;

    /// Like `find_similar`, but fused with an externally computed semantic
    /// ranking. With an empty `semantic` list this is a dampened
    /// `find_similar`.
    fn find_similar_fused(
        &self,
        title: &str,
        semantic: &[SimilarTask],
        weight: f64,
        threshold: f64,
    ) -> Result<Vec<SimilarTask>, StoreError>;
}

impl StoreSearchExt for Store {
    fn search(&self, query: &str, filters: &TaskFilters) -> Result<Vec<Task>, StoreError> {
        self.search_with_vocabulary(query, filters, &Vocabulary::default())
    }

    fn search_with_vocabulary(
        &self,
        query: &str,
        filters: &TaskFilters,
        vocab: &Vocabulary,
    ) -> Result<Vec<Task>, StoreError> {
        let extracted = extract_filters(query, vocab);
        let merged = filters.merge(&extracted);

        let candidates: Vec<Task> = self
            .list()?
            .into_iter()
            .filter(|task| merged.matches(task))
            .collect();

        // Leftover content words rank the candidates; without any, the
        // structural filters alone define the result
        if extracted.terms.is_empty() {
            return Ok(candidates);
        }

        let needle = extracted.terms.join(" ");
        let ranked = fuzzy_search(&candidates, &needle, &FuzzyOptions::default());
        let tasks = ranked
            .iter()
            .filter_map(|hit| candidates.iter().find(|t| t.id == hit.id).cloned())
            .collect();
        Ok(tasks)
    }

    fn find_similar(&self, title: &str, threshold: f64) -> Result<Vec<SimilarTask>, StoreError> {
        let tasks = self.list()?;
        let opts = FuzzyOptions {
            threshold,
            ..Default::default()
        };
        Ok(fuzzy_search(&tasks, title, &opts))
    }

    fn find_similar_fused(
        &self,
        title: &str,
        semantic: &[SimilarTask],
        weight: f64,
        threshold: f64,
    ) -> Result<Vec<SimilarTask>, StoreError> {
        // Score everything and let the fused threshold decide
        let fuzzy = self.find_similar(title, 0.0)?;
        let fused = combine(semantic, &fuzzy, weight);
        Ok(fused.into_iter().filter(|e| e.score >= threshold).collect())
    }
}

/// Default cutoff for similarity lookups, re-exported for callers that
/// do not construct [`FuzzyOptions`] themselves.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = DEFAULT_THRESHOLD;
