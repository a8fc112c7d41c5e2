//! Entity extraction: structured filter hints from free-text queries.
//!
//! Matching is token-set containment against a curated synonym vocabulary,
//! never substring matching, so "donee" cannot match "done". Vocabulary is
//! data, not code: callers may extend or replace the tables.

use crate::text::normalize;
use crate::types::{Priority, Readiness, Status};
use std::collections::HashSet;

/// Filter hints extracted from a query.
///
/// Tokens that matched nothing land in `terms` for fallback full-text
/// matching. An all-empty result is a normal outcome, not an error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedFilters {
    pub status: Option<Status>,
    pub readiness: Option<Readiness>,
    pub priority: Option<Priority>,
    pub tags: Vec<String>,
    pub action_types: Vec<String>,
    pub terms: Vec<String>,
}

impl ExtractedFilters {
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.readiness.is_none()
            && self.priority.is_none()
            && self.tags.is_empty()
            && self.action_types.is_empty()
            && self.terms.is_empty()
    }
}

/// Normalized synonym phrase: one or more adjacent tokens.
type Phrase = Vec<String>;

/// Synonym tables driving extraction. All phrases are stored normalized
/// through the same tokenizer the queries go through.
pub struct Vocabulary {
    status: Vec<(Status, Vec<Phrase>)>,
    readiness: Vec<(Readiness, Vec<Phrase>)>,
    priority: Vec<(Priority, Vec<Phrase>)>,
    actions: Vec<(String, Vec<Phrase>)>,
    tags: Vec<(String, Vec<Phrase>)>,
    stopwords: HashSet<String>,
}

impl Vocabulary {
    /// An empty vocabulary; extraction with it only produces `terms`.
    pub fn empty() -> Self {
        Self {
            status: Vec::new(),
            readiness: Vec::new(),
            priority: Vec::new(),
            actions: Vec::new(),
            tags: Vec::new(),
            stopwords: HashSet::new(),
        }
    }

    pub fn add_status_synonym(&mut self, status: Status, phrase: &str) {
        add_phrase(&mut self.status, status, phrase);
    }

    pub fn add_readiness_synonym(&mut self, readiness: Readiness, phrase: &str) {
        add_phrase(&mut self.readiness, readiness, phrase);
    }

    pub fn add_priority_synonym(&mut self, priority: Priority, phrase: &str) {
        add_phrase(&mut self.priority, priority, phrase);
    }

    pub fn add_action_synonym(&mut self, action: &str, phrase: &str) {
        add_phrase(&mut self.actions, action.to_string(), phrase);
    }

    pub fn add_tag_synonym(&mut self, tag: &str, phrase: &str) {
        add_phrase(&mut self.tags, tag.to_string(), phrase);
    }

    /// Words dropped from `terms` when they match nothing (query filler).
    pub fn add_stopword(&mut self, word: &str) {
        for token in normalize(word) {
            self.stopwords.insert(token);
        }
    }
}

fn add_phrase<K: PartialEq>(table: &mut Vec<(K, Vec<Phrase>)>, key: K, phrase: &str) {
    let tokens = normalize(phrase);
    if tokens.is_empty() {
        return;
    }
    if let Some((_, phrases)) = table.iter_mut().find(|(k, _)| *k == key) {
        phrases.push(tokens);
    } else {
        table.push((key, vec![tokens]));
    }
}

impl Default for Vocabulary {
    fn default() -> Self {
        let mut v = Self::empty();

        for phrase in ["todo", "to do", "pending", "backlog", "not started", "unstarted", "open"] {
            v.add_status_synonym(Status::Todo, phrase);
        }
        for phrase in [
            "in progress",
            "started",
            "active",
            "doing",
            "ongoing",
            "underway",
            "wip",
            "working on",
        ] {
            v.add_status_synonym(Status::InProgress, phrase);
        }
        for phrase in ["done", "complete", "completed", "finished", "closed", "shipped"] {
            v.add_status_synonym(Status::Done, phrase);
        }

        for phrase in ["draft", "drafts", "rough", "unrefined"] {
            v.add_readiness_synonym(Readiness::Draft, phrase);
        }
        for phrase in ["ready", "actionable", "unblocked"] {
            v.add_readiness_synonym(Readiness::Ready, phrase);
        }
        for phrase in ["blocked", "stuck", "waiting", "held up", "on hold"] {
            v.add_readiness_synonym(Readiness::Blocked, phrase);
        }

        for phrase in ["high priority", "top priority", "urgent", "critical", "important", "asap"] {
            v.add_priority_synonym(Priority::High, phrase);
        }
        for phrase in ["medium priority", "normal priority"] {
            v.add_priority_synonym(Priority::Medium, phrase);
        }
        for phrase in ["low priority", "minor", "trivial", "someday", "nice to have"] {
            v.add_priority_synonym(Priority::Low, phrase);
        }

        for (action, phrases) in [
            ("create", &["create", "add", "implement", "build"][..]),
            ("fix", &["fix", "repair", "debug", "resolve", "patch"]),
            ("update", &["update", "modify", "change", "improve", "refactor"]),
            ("remove", &["remove", "delete", "drop"]),
            ("test", &["test", "verify", "validate"]),
            ("document", &["document", "docs"]),
        ] {
            for phrase in phrases {
                v.add_action_synonym(action, phrase);
            }
        }

        for (tag, phrases) in [
            ("frontend", &["frontend", "front end", "ui"][..]),
            ("backend", &["backend", "back end", "server"]),
            ("api", &["api"]),
            ("database", &["database", "db"]),
            ("auth", &["auth", "authentication"]),
            ("docs", &["documentation"]),
        ] {
            for phrase in phrases {
                v.add_tag_synonym(tag, phrase);
            }
        }

        for word in [
            "show", "me", "all", "the", "a", "an", "task", "tasks", "please", "find", "search",
            "list", "get", "give", "what", "which", "are", "is", "of", "for", "with", "my", "that",
            "this", "these", "those", "them", "i", "we", "you", "to", "in", "on", "at", "by",
            "and", "or", "everything", "anything", "things", "stuff", "items",
        ] {
            v.add_stopword(word);
        }

        v
    }
}

/// Extract structured filter hints from a free-text query.
///
/// Multi-word synonyms match as adjacent token runs; each consumed token is
/// claimed exactly once, longest phrases first. A query that matches nothing
/// returns an empty filter set with the content words in `terms`.
pub fn extract_filters(query: &str, vocab: &Vocabulary) -> ExtractedFilters {
    let tokens = normalize(query);
    let mut consumed = vec![false; tokens.len()];
    let mut filters = ExtractedFilters::default();

    filters.status = match_category(&tokens, &mut consumed, &vocab.status);
    filters.readiness = match_category(&tokens, &mut consumed, &vocab.readiness);
    filters.priority = match_category(&tokens, &mut consumed, &vocab.priority);
    filters.action_types = match_all(&tokens, &mut consumed, &vocab.actions);
    filters.tags = match_all(&tokens, &mut consumed, &vocab.tags);

    for (i, token) in tokens.iter().enumerate() {
        if !consumed[i] && !vocab.stopwords.contains(token) && !filters.terms.contains(token) {
            filters.terms.push(token.clone());
        }
    }

    filters
}

/// Convenience wrapper over the default vocabulary.
pub fn extract_filters_default(query: &str) -> ExtractedFilters {
    extract_filters(query, &Vocabulary::default())
}

/// First matching entry wins; longer phrases are tried before shorter ones.
fn match_category<K: Copy>(
    tokens: &[String],
    consumed: &mut [bool],
    table: &[(K, Vec<Phrase>)],
) -> Option<K> {
    let mut candidates: Vec<(&K, &Phrase)> = table
        .iter()
        .flat_map(|(key, phrases)| phrases.iter().map(move |p| (key, p)))
        .collect();
    candidates.sort_by_key(|(_, p)| std::cmp::Reverse(p.len()));

    for (key, phrase) in candidates {
        if consume_phrase(tokens, consumed, phrase) {
            return Some(*key);
        }
    }
    None
}

/// Collect every matching entry key, deduplicated, longest phrases first.
fn match_all(
    tokens: &[String],
    consumed: &mut [bool],
    table: &[(String, Vec<Phrase>)],
) -> Vec<String> {
    let mut candidates: Vec<(&String, &Phrase)> = table
        .iter()
        .flat_map(|(key, phrases)| phrases.iter().map(move |p| (key, p)))
        .collect();
    candidates.sort_by_key(|(_, p)| std::cmp::Reverse(p.len()));

    let mut matched = Vec::new();
    for (key, phrase) in candidates {
        if consume_phrase(tokens, consumed, phrase) && !matched.contains(key) {
            matched.push(key.clone());
        }
    }
    matched
}

/// Mark the first unconsumed occurrence of `phrase` as consumed.
fn consume_phrase(tokens: &[String], consumed: &mut [bool], phrase: &Phrase) -> bool {
    if phrase.is_empty() || phrase.len() > tokens.len() {
        return false;
    }
    for start in 0..=(tokens.len() - phrase.len()) {
        let window = &tokens[start..start + phrase.len()];
        let free = consumed[start..start + phrase.len()].iter().all(|c| !c);
        if free && window == phrase.as_slice() {
            for slot in &mut consumed[start..start + phrase.len()] {
                *slot = true;
            }
            return true;
        }
    }
    false
}
