//! Tasktree: hierarchical task tracking with dotted-path ids.
//!
//! Tasks live in a tree addressed by dotted ids like `1.2.3`. Ids double as
//! positions: deleting or moving a task renumbers its former siblings so the
//! numbering stays contiguous, and dependency edges follow the renames.
//! Search layers a synonym-driven query extractor and an edit-distance
//! matcher over the store.
//!
//! # Example
//!
//! ```no_run
//! use tasktree::{NewTask, Store, StoreSearchExt, TaskFilters};
//! use std::path::Path;
//!
//! // Initialize a new store
//! let mut store = Store::init(Path::new(".")).unwrap();
//!
//! // Create a root task and a child under it
//! let root = store.create(NewTask::new("Ship the login flow")).unwrap();
//! let mut child = NewTask::new("Implement login page");
//! child.parent = Some(root.id.clone());
//! let page = store.create(child).unwrap();
//! assert_eq!(page.id.to_string(), "1.1");
//!
//! // Check for near-duplicates before adding more work
//! let similar = store.find_similar("Implement login form", 0.4).unwrap();
//! assert_eq!(similar[0].id, page.id);
//!
//! // Plain-language search
//! let todo = store.search("show me all todo tasks", &TaskFilters::default()).unwrap();
//! assert_eq!(todo.len(), 2);
//! ```

mod id;
mod storage;
mod store;
mod types;

pub mod extract;
pub mod fusion;
pub mod fuzzy;
pub mod metadata;
pub mod search;
pub mod text;
pub mod tree;

// Re-export public API
pub use extract::{extract_filters, extract_filters_default, ExtractedFilters, Vocabulary};
pub use fusion::{combine, DEFAULT_SEMANTIC_WEIGHT};
pub use fuzzy::{fuzzy_search, similarity, FuzzyKey, FuzzyOptions, SimilarTask};
pub use id::{ParseIdError, TaskId};
pub use search::{StoreSearchExt, TaskFilters, DEFAULT_SIMILARITY_THRESHOLD};
pub use store::{MetaOp, NewTask, Store, StoreError, TaskPatch};
pub use tree::{build_hierarchy, TaskNode};
pub use types::{
    DepKind, Dependency, Priority, Readiness, Status, Task, ValidationError,
};
