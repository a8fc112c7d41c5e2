//! Dotted-path task identifiers.
//!
//! A task id is a path of positive integers joined by dots ("3", "3.2",
//! "3.2.1"). The path encodes the hierarchy: the parent of "3.2.1" is "3.2",
//! and its position among its siblings is the last segment.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A parsed dotted-path identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(Vec<u32>);

/// Error returned for malformed dotted ids.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseIdError {
    input: String,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "malformed task id '{}': expected dot-separated positive integers",
            self.input
        )
    }
}

impl std::error::Error for ParseIdError {}

impl TaskId {
    /// Build an id from raw segments. Segments must be >= 1.
    pub fn from_segments(segments: Vec<u32>) -> Option<Self> {
        if segments.is_empty() || segments.iter().any(|&s| s == 0) {
            return None;
        }
        Some(Self(segments))
    }

    /// Parse a dotted id string.
    pub fn parse(input: &str) -> Result<Self, ParseIdError> {
        let err = || ParseIdError {
            input: input.to_string(),
        };
        let segments: Vec<u32> = input
            .split('.')
            .map(|s| s.parse::<u32>().map_err(|_| err()))
            .collect::<Result<_, _>>()?;
        Self::from_segments(segments).ok_or_else(err)
    }

    /// The path segments, outermost first.
    pub fn segments(&self) -> &[u32] {
        &self.0
    }

    /// Number of path segments (1 for a root task).
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// True if this is a root-level id (single segment).
    pub fn is_root(&self) -> bool {
        self.0.len() == 1
    }

    /// The sibling position: the last path segment.
    pub fn last_index(&self) -> u32 {
        *self.0.last().unwrap_or(&0)
    }

    /// The parent id, or None for a root task.
    pub fn parent(&self) -> Option<TaskId> {
        if self.0.len() > 1 {
            Some(TaskId(self.0[..self.0.len() - 1].to_vec()))
        } else {
            None
        }
    }

    /// The id of this task's child at the given sibling position.
    pub fn child(&self, index: u32) -> TaskId {
        let mut segments = self.0.clone();
        segments.push(index);
        TaskId(segments)
    }

    /// The sibling id with the last segment replaced.
    pub fn with_last_index(&self, index: u32) -> TaskId {
        let mut segments = self.0.clone();
        *segments.last_mut().unwrap() = index;
        TaskId(segments)
    }

    /// True if `self` is strictly below `ancestor` in the hierarchy.
    pub fn is_descendant_of(&self, ancestor: &TaskId) -> bool {
        self.0.len() > ancestor.0.len() && self.0.starts_with(&ancestor.0)
    }

    /// True if `self` is `other` or a descendant of it.
    pub fn is_or_descends_from(&self, other: &TaskId) -> bool {
        self == other || self.is_descendant_of(other)
    }

    /// Rewrite the leading `old` prefix to `new`, keeping the tail.
    ///
    /// Returns None when `self` does not start with `old`. This is the
    /// primitive the renumbering algorithm is built on.
    pub fn reprefix(&self, old: &TaskId, new: &TaskId) -> Option<TaskId> {
        if !self.is_or_descends_from(old) {
            return None;
        }
        let mut segments = new.0.clone();
        segments.extend_from_slice(&self.0[old.0.len()..]);
        Some(TaskId(segments))
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for segment in &self.0 {
            if !first {
                write!(f, ".")?;
            }
            write!(f, "{}", segment)?;
            first = false;
        }
        Ok(())
    }
}

impl FromStr for TaskId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskId::parse(s)
    }
}

impl Serialize for TaskId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TaskId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        TaskId::parse(&s).map_err(serde::de::Error::custom)
    }
}
