//! Core data types for the task hierarchy.

use crate::id::TaskId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The core unit of work.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    /// Dotted-path identifier encoding the hierarchy, e.g. "3.2.1"
    pub id: TaskId,

    /// Short description of the work
    pub title: String,

    /// Optional one-line description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Optional long-form body (markdown)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,

    /// Current state
    pub status: Status,

    /// Whether the task is actionable yet
    pub readiness: Readiness,

    /// Scheduling weight
    pub priority: Priority,

    /// Freeform tags for filtering
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Parent id; always equals `id` minus its last segment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<TaskId>,

    /// Arbitrary JSON object, patched via the metadata engine
    #[serde(default = "empty_metadata", skip_serializing_if = "Value::is_null")]
    pub metadata: Value,

    /// When created
    pub created_at: DateTime<Utc>,

    /// Last modification
    pub updated_at: DateTime<Utc>,
}

fn empty_metadata() -> Value {
    Value::Object(serde_json::Map::new())
}

/// Task status states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    Todo,
    InProgress,
    Done,
}

impl Status {
    /// The wire/database word for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Todo => "todo",
            Status::InProgress => "in-progress",
            Status::Done => "done",
        }
    }

    /// Parse the wire word. Unrecognized values are rejected, not coerced.
    pub fn parse(s: &str) -> Option<Status> {
        match s {
            "todo" => Some(Status::Todo),
            "in-progress" => Some(Status::InProgress),
            "done" => Some(Status::Done),
            _ => None,
        }
    }
}

/// Task readiness states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Readiness {
    Draft,
    Ready,
    Blocked,
}

impl Readiness {
    pub fn as_str(&self) -> &'static str {
        match self {
            Readiness::Draft => "draft",
            Readiness::Ready => "ready",
            Readiness::Blocked => "blocked",
        }
    }

    pub fn parse(s: &str) -> Option<Readiness> {
        match s {
            "draft" => Some(Readiness::Draft),
            "ready" => Some(Readiness::Ready),
            "blocked" => Some(Readiness::Blocked),
            _ => None,
        }
    }
}

/// Scheduling priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }

    pub fn parse(s: &str) -> Option<Priority> {
        match s {
            "high" => Some(Priority::High),
            "medium" => Some(Priority::Medium),
            "low" => Some(Priority::Low),
            _ => None,
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

/// Relationships between tasks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Dependency {
    /// The task that has the dependency
    pub from_id: TaskId,

    /// The task being depended on
    pub to_id: TaskId,

    /// Type of relationship
    pub kind: DepKind,

    /// When the edge was created
    pub created_at: DateTime<Utc>,
}

/// Types of relationships between tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DepKind {
    /// from_id is a child of to_id; derived from parent ids
    Child,

    /// from_id comes after to_id (ordering/blocking constraint)
    After,

    /// Informational grouping, no ordering semantics
    Sibling,
}

impl DepKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DepKind::Child => "child",
            DepKind::After => "after",
            DepKind::Sibling => "sibling",
        }
    }

    pub fn parse(s: &str) -> Option<DepKind> {
        match s {
            "child" => Some(DepKind::Child),
            "after" => Some(DepKind::After),
            "sibling" => Some(DepKind::Sibling),
            _ => None,
        }
    }

    /// Returns true if this edge type participates in cycle detection.
    pub fn is_ordering(&self) -> bool {
        matches!(self, DepKind::After)
    }
}

/// Validation errors for tasks.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    EmptyTitle,
    TitleTooLong,
    InvalidCharacters,
    ParentMismatch { id: String, parent_id: String },
    MetadataNotObject,
    InvalidTag(String),
    InvalidTimestamp,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::EmptyTitle => write!(f, "title cannot be empty"),
            ValidationError::TitleTooLong => write!(f, "title exceeds 500 characters"),
            ValidationError::InvalidCharacters => write!(f, "title contains control characters"),
            ValidationError::ParentMismatch { id, parent_id } => {
                write!(
                    f,
                    "parent id '{}' does not match id '{}' minus its last segment",
                    parent_id, id
                )
            }
            ValidationError::MetadataNotObject => {
                write!(f, "metadata must be a JSON object")
            }
            ValidationError::InvalidTag(tag) => {
                write!(
                    f,
                    "invalid tag '{}': must be alphanumeric with hyphens/underscores",
                    tag
                )
            }
            ValidationError::InvalidTimestamp => write!(f, "updated_at cannot be before created_at"),
        }
    }
}

impl std::error::Error for ValidationError {}

impl Task {
    /// Validate the task's fields and structural invariants.
    pub fn validate(&self) -> Result<(), ValidationError> {
        // Title: required, non-blank, 1-500 chars, no control characters
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        if self.title.len() > 500 {
            return Err(ValidationError::TitleTooLong);
        }
        if self.title.chars().any(|c| c.is_control()) {
            return Err(ValidationError::InvalidCharacters);
        }

        // Prefix invariant: parent_id is id minus its last segment
        if self.parent_id != self.id.parent() {
            return Err(ValidationError::ParentMismatch {
                id: self.id.to_string(),
                parent_id: self
                    .parent_id
                    .as_ref()
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| "(none)".to_string()),
            });
        }

        // Metadata: a JSON object at the root, nothing else
        if !self.metadata.is_object() {
            return Err(ValidationError::MetadataNotObject);
        }

        // Tags: alphanumeric + hyphens/underscores, no spaces
        for tag in &self.tags {
            if tag.is_empty()
                || !tag.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_')
            {
                return Err(ValidationError::InvalidTag(tag.clone()));
            }
        }

        // Timestamps: updated_at >= created_at
        if self.updated_at < self.created_at {
            return Err(ValidationError::InvalidTimestamp);
        }

        Ok(())
    }
}
