//! Shared test infrastructure for tasktree integration tests.
//!
//! Provides TestEnv helper for consistent test setup/teardown.

#![allow(dead_code)]

use tasktree::{DepKind, Dependency, NewTask, Store, Task, TaskId};
use tempfile::TempDir;

/// Test environment with automatic cleanup.
pub struct TestEnv {
    pub temp_dir: TempDir,
    pub store: Store,
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl TestEnv {
    /// Create a new test environment with an initialized store.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = Store::init(temp_dir.path()).expect("Failed to init store");
        Self { temp_dir, store }
    }

    /// Create a root task with default fields.
    pub fn create_task(&mut self, title: &str) -> Task {
        self.store
            .create(NewTask::new(title))
            .expect("Failed to create task")
    }

    /// Create a task as the last child of `parent`.
    pub fn create_child(&mut self, parent: &Task, title: &str) -> Task {
        let mut new = NewTask::new(title);
        new.parent = Some(parent.id.clone());
        self.store.create(new).expect("Failed to create child")
    }

    /// Create a task with tags.
    pub fn create_task_with_tags(&mut self, title: &str, tags: &[&str]) -> Task {
        let mut new = NewTask::new(title);
        new.tags = tags.iter().map(|t| t.to_string()).collect();
        self.store.create(new).expect("Failed to create task")
    }

    /// Create a task with a description.
    pub fn create_task_with_desc(&mut self, title: &str, description: &str) -> Task {
        let mut new = NewTask::new(title);
        new.description = Some(description.to_string());
        self.store.create(new).expect("Failed to create task")
    }

    /// Add an ordering dependency (from runs after to).
    pub fn add_after_dep(&mut self, from: &Task, to: &Task) -> Dependency {
        self.store
            .add_dependency(&from.id, &to.id, DepKind::After)
            .expect("Failed to add dependency")
    }

    /// Parse an id, panicking on malformed input.
    pub fn id(&self, s: &str) -> TaskId {
        TaskId::parse(s).expect("Failed to parse id")
    }

    /// Assert the full id listing, in hierarchy order.
    pub fn assert_ids(&self, expected: &[&str]) {
        let ids: Vec<String> = self
            .store
            .list()
            .expect("Failed to list tasks")
            .iter()
            .map(|t| t.id.to_string())
            .collect();
        assert_eq!(ids, expected, "Unexpected id listing");
    }

    /// Assert that an ordering edge exists between the given ids.
    pub fn assert_after_edge(&self, from: &str, to: &str) {
        let deps = self
            .store
            .dependencies()
            .expect("Failed to list dependencies");
        assert!(
            deps.iter().any(|d| d.kind == DepKind::After
                && d.from_id.to_string() == from
                && d.to_id.to_string() == to),
            "Expected edge {} after {}. Edges: {:?}",
            from,
            to,
            deps
        );
    }

    /// Fetch a task by id string, panicking if absent.
    pub fn get(&self, id: &str) -> Task {
        self.store
            .get(&self.id(id))
            .expect("Failed to get task")
            .unwrap_or_else(|| panic!("Task {} not found", id))
    }
}
