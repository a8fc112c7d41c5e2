//! High-level task store: CRUD, hierarchical id assignment, renumbering.
//!
//! All mutations run as one SQLite transaction, so the hierarchy invariants
//! (parent/prefix consistency, contiguous sibling numbering, no dangling
//! dependency references) hold after every committed operation.

use crate::id::{ParseIdError, TaskId};
use crate::metadata;
use crate::storage::Storage;
use crate::types::{DepKind, Dependency, Priority, Readiness, Status, Task, ValidationError};
use chrono::Utc;
use rusqlite::Connection;
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;

/// Errors that can occur during store operations.
#[derive(Debug)]
pub enum StoreError {
    /// Unknown task id or metadata path.
    NotFound(String),
    /// Bad enum value, malformed id, or invalid field content.
    InvalidInput(String),
    /// The operation would create a dangling or cyclic dependency edge.
    Dependency(String),
    /// Backing-store failure; the transaction was rolled back.
    Storage(rusqlite::Error),
    /// Catch-all for everything else.
    General(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::NotFound(what) => write!(f, "not found: {}", what),
            StoreError::InvalidInput(msg) => write!(f, "invalid input: {}", msg),
            StoreError::Dependency(msg) => write!(f, "dependency error: {}", msg),
            StoreError::Storage(e) => write!(f, "storage error: {}", e),
            StoreError::General(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Storage(e) => Some(e),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Storage(e)
    }
}

impl From<ValidationError> for StoreError {
    fn from(e: ValidationError) -> Self {
        StoreError::InvalidInput(e.to_string())
    }
}

impl From<ParseIdError> for StoreError {
    fn from(e: ParseIdError) -> Self {
        StoreError::InvalidInput(e.to_string())
    }
}

/// Fields for a new task. Position is chosen via `parent` / `after`.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub body: Option<String>,
    pub status: Option<Status>,
    pub readiness: Option<Readiness>,
    pub priority: Option<Priority>,
    pub tags: Vec<String>,
    pub metadata: Option<Value>,
    /// Create as the last child of this task.
    pub parent: Option<TaskId>,
    /// Create immediately after this sibling, shifting later siblings up.
    pub after: Option<TaskId>,
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }
}

/// Partial update for an existing task. None fields are left untouched;
/// the double Option distinguishes "leave as is" from "clear".
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub body: Option<Option<String>>,
    pub status: Option<Status>,
    pub readiness: Option<Readiness>,
    pub priority: Option<Priority>,
    pub tags: Option<Vec<String>>,
    pub metadata: Option<Value>,
}

/// Metadata patch operation selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaOp {
    Set,
    Append,
    Remove,
}

/// The main task store.
pub struct Store {
    storage: Storage,
}

impl Store {
    /// Initialize a new store in the given directory.
    pub fn init(root: &Path) -> Result<Self, StoreError> {
        let storage = Storage::init(root)?;
        Ok(Self { storage })
    }

    /// Open an existing store.
    pub fn open(root: &Path) -> Result<Self, StoreError> {
        let storage = Storage::open(root)?;
        Ok(Self { storage })
    }

    pub(crate) fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Create a new task, assigning its id from the requested position.
    pub fn create(&mut self, new: NewTask) -> Result<Task, StoreError> {
        self.storage.in_transaction(|conn| {
            let now = Utc::now();

            // Resolve the target scope and sibling index before any write
            let (parent, index, after) = match (&new.parent, &new.after) {
                (explicit_parent, Some(after)) => {
                    if !Storage::task_exists(conn, after)? {
                        return Err(StoreError::NotFound(format!("task {}", after)));
                    }
                    let parent = after.parent();
                    if explicit_parent.is_some() && *explicit_parent != parent {
                        return Err(StoreError::InvalidInput(format!(
                            "'after' task {} is not a child of the requested parent",
                            after
                        )));
                    }
                    (parent, after.last_index() + 1, Some(after.clone()))
                }
                (Some(parent), None) => {
                    if !Storage::task_exists(conn, parent)? {
                        return Err(StoreError::NotFound(format!("task {}", parent)));
                    }
                    let index = Storage::max_child_index(conn, Some(parent))? + 1;
                    (Some(parent.clone()), index, None)
                }
                (None, None) => {
                    let index = Storage::max_child_index(conn, None)? + 1;
                    (None, index, None)
                }
            };

            let id = match &parent {
                Some(parent) => parent.child(index),
                None => TaskId::from_segments(vec![index]).ok_or_else(|| {
                    StoreError::General("sibling index overflow".to_string())
                })?,
            };

            let task = Task {
                id: id.clone(),
                title: new.title.clone(),
                description: new.description.clone(),
                body: new.body.clone(),
                status: new.status.unwrap_or(Status::Todo),
                readiness: new.readiness.unwrap_or(Readiness::Draft),
                priority: new.priority.unwrap_or_default(),
                tags: new.tags.clone(),
                parent_id: parent.clone(),
                metadata: new
                    .metadata
                    .clone()
                    .unwrap_or_else(|| Value::Object(serde_json::Map::new())),
                created_at: now,
                updated_at: now,
            };

            // Fail fast: nothing is written until the task validates
            task.validate()?;

            if let Some(after) = &after {
                make_room_after(conn, parent.as_ref(), after.last_index())?;
            }

            Storage::insert_task(conn, &task)?;

            if let Some(parent) = &parent {
                Storage::insert_dep(
                    conn,
                    &Dependency {
                        from_id: id.clone(),
                        to_id: parent.clone(),
                        kind: DepKind::Child,
                        created_at: now,
                    },
                )?;
            }

            Ok(task)
        })
    }

    /// Get a task by id.
    pub fn get(&self, id: &TaskId) -> Result<Option<Task>, StoreError> {
        Storage::get_task(self.storage.conn(), id)
    }

    /// List every task in hierarchy order.
    pub fn list(&self) -> Result<Vec<Task>, StoreError> {
        Storage::list_tasks(self.storage.conn())
    }

    /// Apply a partial patch to a task.
    pub fn update(&mut self, id: &TaskId, patch: TaskPatch) -> Result<Task, StoreError> {
        self.storage.in_transaction(|conn| {
            let existing = Storage::get_task(conn, id)?
                .ok_or_else(|| StoreError::NotFound(format!("task {}", id)))?;

            let updated = Task {
                id: existing.id,
                title: patch.title.unwrap_or(existing.title),
                description: match patch.description {
                    Some(d) => d,
                    None => existing.description,
                },
                body: match patch.body {
                    Some(b) => b,
                    None => existing.body,
                },
                status: patch.status.unwrap_or(existing.status),
                readiness: patch.readiness.unwrap_or(existing.readiness),
                priority: patch.priority.unwrap_or(existing.priority),
                tags: patch.tags.unwrap_or(existing.tags),
                parent_id: existing.parent_id,
                metadata: patch.metadata.unwrap_or(existing.metadata),
                created_at: existing.created_at,
                updated_at: Utc::now(),
            };

            updated.validate()?;
            Storage::update_task_row(conn, &updated)?;
            Ok(updated)
        })
    }

    /// Remove a task and its whole subtree, renumbering former siblings.
    ///
    /// Every later sibling (and its descendants, and every dependency edge
    /// referencing them) is decremented by one, in the same transaction.
    pub fn remove(&mut self, id: &TaskId) -> Result<Task, StoreError> {
        self.storage.in_transaction(|conn| {
            let task = Storage::get_task(conn, id)?
                .ok_or_else(|| StoreError::NotFound(format!("task {}", id)))?;

            // Drop the subtree and every edge that references it
            let all = Storage::list_tasks(conn)?;
            for doomed in all.iter().filter(|t| t.id.is_or_descends_from(id)) {
                Storage::delete_deps_touching(conn, &doomed.id)?;
                Storage::delete_task_row(conn, &doomed.id)?;
            }

            close_gap(conn, task.id.parent().as_ref(), task.id.last_index())?;

            Ok(task)
        })
    }

    /// Move a task (with its subtree) under a new parent, appended as the
    /// last child. `None` moves it to the root scope.
    pub fn reparent(&mut self, id: &TaskId, new_parent: Option<&TaskId>) -> Result<Task, StoreError> {
        self.storage.in_transaction(|conn| {
            let task = Storage::get_task(conn, id)?
                .ok_or_else(|| StoreError::NotFound(format!("task {}", id)))?;

            if task.parent_id.as_ref() == new_parent {
                return Ok(task);
            }
            if let Some(parent) = new_parent {
                if !Storage::task_exists(conn, parent)? {
                    return Err(StoreError::NotFound(format!("task {}", parent)));
                }
                if parent.is_or_descends_from(id) {
                    return Err(StoreError::Dependency(format!(
                        "cannot move {} under its own subtree",
                        id
                    )));
                }
            }

            let old_parent = task.id.parent();
            let old_index = task.id.last_index();

            let new_index = Storage::max_child_index(conn, new_parent)? + 1;
            let new_id = match new_parent {
                Some(parent) => parent.child(new_index),
                None => TaskId::from_segments(vec![new_index]).ok_or_else(|| {
                    StoreError::General("sibling index overflow".to_string())
                })?,
            };

            if let Some(old_parent) = &old_parent {
                Storage::delete_dep(conn, id, old_parent, DepKind::Child)?;
            }
            shift_subtree(conn, id, &new_id)?;
            if let Some(parent) = new_parent {
                Storage::insert_dep(
                    conn,
                    &Dependency {
                        from_id: new_id.clone(),
                        to_id: parent.clone(),
                        kind: DepKind::Child,
                        created_at: Utc::now(),
                    },
                )?;
            }

            // Close the gap the move left behind; the moved subtree may
            // shift again if its new home sits under a renumbered sibling
            let remaps = close_gap(conn, old_parent.as_ref(), old_index)?;
            let final_id = apply_remaps(&new_id, &remaps);

            Storage::get_task(conn, &final_id)?
                .ok_or_else(|| StoreError::General(format!("task {} lost during reparent", final_id)))
        })
    }

    /// Move a task (with its subtree) to the position immediately after the
    /// given sibling, shifting later siblings up.
    pub fn move_after(&mut self, id: &TaskId, sibling: &TaskId) -> Result<Task, StoreError> {
        self.storage.in_transaction(|conn| {
            let task = Storage::get_task(conn, id)?
                .ok_or_else(|| StoreError::NotFound(format!("task {}", id)))?;
            if !Storage::task_exists(conn, sibling)? {
                return Err(StoreError::NotFound(format!("task {}", sibling)));
            }
            if sibling.is_or_descends_from(id) {
                return Err(StoreError::Dependency(format!(
                    "cannot move {} after a task in its own subtree",
                    id
                )));
            }

            let target_parent = sibling.parent();
            if task.id.parent() == target_parent && task.id.last_index() == sibling.last_index() + 1 {
                return Ok(task);
            }

            let old_parent = task.id.parent();
            let old_index = task.id.last_index();

            // Stage the subtree at the free slot past the end of the target
            // scope, then renumber both scopes around it
            let stage_index = Storage::max_child_index(conn, target_parent.as_ref())? + 1;
            let stage_id = match &target_parent {
                Some(parent) => parent.child(stage_index),
                None => TaskId::from_segments(vec![stage_index]).ok_or_else(|| {
                    StoreError::General("sibling index overflow".to_string())
                })?,
            };

            if let Some(old_parent) = &old_parent {
                Storage::delete_dep(conn, id, old_parent, DepKind::Child)?;
            }
            shift_subtree(conn, id, &stage_id)?;

            let remaps = close_gap(conn, old_parent.as_ref(), old_index)?;
            let stage_id = apply_remaps(&stage_id, &remaps);
            let sibling_id = apply_remaps(sibling, &remaps);
            let target_parent = sibling_id.parent();

            let room_remaps =
                make_room_after(conn, target_parent.as_ref(), sibling_id.last_index())?;
            let stage_id = apply_remaps(&stage_id, &room_remaps);

            let final_id = sibling_id.with_last_index(sibling_id.last_index() + 1);
            shift_subtree(conn, &stage_id, &final_id)?;

            if let Some(parent) = &target_parent {
                Storage::insert_dep(
                    conn,
                    &Dependency {
                        from_id: final_id.clone(),
                        to_id: parent.clone(),
                        kind: DepKind::Child,
                        created_at: Utc::now(),
                    },
                )?;
            }

            Storage::get_task(conn, &final_id)?
                .ok_or_else(|| StoreError::General(format!("task {} lost during move", final_id)))
        })
    }

    /// Read the metadata value at a dot path.
    pub fn get_metadata(&self, id: &TaskId, path: &str) -> Result<Option<Value>, StoreError> {
        let task = self
            .get(id)?
            .ok_or_else(|| StoreError::NotFound(format!("task {}", id)))?;
        Ok(metadata::get_path(&task.metadata, path).cloned())
    }

    /// Patch a task's metadata at a dot path.
    ///
    /// `Set` and `Append` require a value; `Remove` ignores it and is a
    /// no-op for missing paths.
    pub fn update_metadata(
        &mut self,
        id: &TaskId,
        path: &str,
        value: Option<Value>,
        op: MetaOp,
    ) -> Result<Task, StoreError> {
        if path.is_empty() || path.split('.').any(|k| k.is_empty()) {
            return Err(StoreError::InvalidInput(format!(
                "malformed metadata path '{}'",
                path
            )));
        }

        self.storage.in_transaction(|conn| {
            let existing = Storage::get_task(conn, id)?
                .ok_or_else(|| StoreError::NotFound(format!("task {}", id)))?;

            let patched = match op {
                MetaOp::Set => {
                    let value = value.clone().ok_or_else(|| {
                        StoreError::InvalidInput("'set' requires a value".to_string())
                    })?;
                    metadata::set_path(&existing.metadata, path, value)
                }
                MetaOp::Append => {
                    let value = value.clone().ok_or_else(|| {
                        StoreError::InvalidInput("'append' requires a value".to_string())
                    })?;
                    metadata::append_path(&existing.metadata, path, value)
                }
                MetaOp::Remove => metadata::remove_path(&existing.metadata, path),
            };

            let updated = Task {
                metadata: patched,
                updated_at: Utc::now(),
                ..existing
            };
            updated.validate()?;
            Storage::update_task_row(conn, &updated)?;
            Ok(updated)
        })
    }

    /// All tasks strictly below the given id in the hierarchy.
    pub fn get_descendants(&self, id: &TaskId) -> Result<Vec<Task>, StoreError> {
        if !Storage::task_exists(self.storage.conn(), id)? {
            return Err(StoreError::NotFound(format!("task {}", id)));
        }
        let all = Storage::list_tasks(self.storage.conn())?;
        Ok(all
            .into_iter()
            .filter(|t| t.id.is_descendant_of(id))
            .collect())
    }

    /// The subgraph reachable from a root: hierarchy children plus explicit
    /// dependency edges, in visit order.
    ///
    /// A visited set guards against cycles introduced by malformed edges;
    /// traversal terminates rather than looping.
    pub fn get_subgraph_nodes(&self, root: &TaskId) -> Result<Vec<Task>, StoreError> {
        let conn = self.storage.conn();
        if !Storage::task_exists(conn, root)? {
            return Err(StoreError::NotFound(format!("task {}", root)));
        }

        let mut visited: HashSet<TaskId> = HashSet::new();
        let mut queue = vec![root.clone()];
        let mut nodes = Vec::new();

        while let Some(id) = queue.pop() {
            if !visited.insert(id.clone()) {
                continue;
            }
            let Some(task) = Storage::get_task(conn, &id)? else {
                // Dangling reference in an edge; skip rather than fail
                log::warn!("dependency edge references missing task {}", id);
                continue;
            };

            for child in Storage::list_children(conn, Some(&id))? {
                queue.push(child.id);
            }
            for dep in Storage::deps_from(conn, &id, None)? {
                if dep.kind != DepKind::Child {
                    queue.push(dep.to_id);
                }
            }

            nodes.push(task);
        }

        Ok(nodes)
    }

    /// Add a dependency edge between tasks. Idempotent for existing edges.
    pub fn add_dependency(
        &mut self,
        from_id: &TaskId,
        to_id: &TaskId,
        kind: DepKind,
    ) -> Result<Dependency, StoreError> {
        self.storage.in_transaction(|conn| {
            if from_id == to_id {
                return Err(StoreError::Dependency(
                    "cannot create an edge from a task to itself".to_string(),
                ));
            }
            if !Storage::task_exists(conn, from_id)? {
                return Err(StoreError::NotFound(format!("task {}", from_id)));
            }
            if !Storage::task_exists(conn, to_id)? {
                return Err(StoreError::NotFound(format!("task {}", to_id)));
            }

            // Child edges are derived from parent ids; reject contradictions
            if kind == DepKind::Child && from_id.parent().as_ref() != Some(to_id) {
                return Err(StoreError::Dependency(format!(
                    "{} is not a child of {} in the hierarchy",
                    from_id, to_id
                )));
            }

            let dep = Dependency {
                from_id: from_id.clone(),
                to_id: to_id.clone(),
                kind,
                created_at: Utc::now(),
            };

            if Storage::dep_exists(conn, from_id, to_id, kind)? {
                return Ok(dep);
            }

            if kind.is_ordering() && would_create_cycle(conn, from_id, to_id)? {
                return Err(StoreError::Dependency(format!(
                    "edge {} -> {} would create a cycle",
                    from_id, to_id
                )));
            }

            Storage::insert_dep(conn, &dep)?;
            Ok(dep)
        })
    }

    /// Remove a dependency edge.
    pub fn remove_dependency(
        &mut self,
        from_id: &TaskId,
        to_id: &TaskId,
        kind: DepKind,
    ) -> Result<(), StoreError> {
        self.storage
            .in_transaction(|conn| Storage::delete_dep(conn, from_id, to_id, kind))
    }

    /// List all dependency edges.
    pub fn dependencies(&self) -> Result<Vec<Dependency>, StoreError> {
        Storage::list_deps(self.storage.conn())
    }

    /// Every edge touching the given task on either side.
    pub fn dependencies_of(&self, id: &TaskId) -> Result<Vec<Dependency>, StoreError> {
        Storage::deps_touching(self.storage.conn(), id)
    }
}

/// Rename a whole subtree from one prefix to another, rewriting every task
/// row and every dependency reference. The target prefix must be vacant.
fn shift_subtree(conn: &Connection, old_root: &TaskId, new_root: &TaskId) -> Result<(), StoreError> {
    let all = Storage::list_tasks(conn)?;
    for task in all.iter().filter(|t| t.id.is_or_descends_from(old_root)) {
        let Some(new_id) = task.id.reprefix(old_root, new_root) else {
            continue;
        };
        Storage::rename_task(conn, &task.id, &new_id)?;
        Storage::rewrite_dep_refs(conn, &task.id, &new_id)?;
    }
    Ok(())
}

/// After a removal at `removed_index`, decrement every later sibling (and
/// its subtree) by one. Processed in ascending order so each target slot has
/// just been vacated. Returns the applied (old, new) prefix remaps.
fn close_gap(
    conn: &Connection,
    parent: Option<&TaskId>,
    removed_index: u32,
) -> Result<Vec<(TaskId, TaskId)>, StoreError> {
    let children = Storage::list_children(conn, parent)?;
    let mut remaps = Vec::new();
    for child in children {
        let idx = child.id.last_index();
        if idx > removed_index {
            let new_id = child.id.with_last_index(idx - 1);
            shift_subtree(conn, &child.id, &new_id)?;
            remaps.push((child.id, new_id));
        }
    }
    Ok(remaps)
}

/// Shift every sibling above `index` up by one to open a slot at
/// `index + 1`. Processed in descending order so each target slot is free.
fn make_room_after(
    conn: &Connection,
    parent: Option<&TaskId>,
    index: u32,
) -> Result<Vec<(TaskId, TaskId)>, StoreError> {
    let children = Storage::list_children(conn, parent)?;
    let mut remaps = Vec::new();
    for child in children.into_iter().rev() {
        let idx = child.id.last_index();
        if idx > index {
            let new_id = child.id.with_last_index(idx + 1);
            shift_subtree(conn, &child.id, &new_id)?;
            remaps.push((child.id, new_id));
        }
    }
    Ok(remaps)
}

/// Re-point an id through a set of disjoint sibling prefix remaps.
fn apply_remaps(id: &TaskId, remaps: &[(TaskId, TaskId)]) -> TaskId {
    for (old, new) in remaps {
        if let Some(remapped) = id.reprefix(old, new) {
            return remapped;
        }
    }
    id.clone()
}

/// DFS from `to_id` over ordering edges; reaching `from_id` means the new
/// edge would close a cycle.
fn would_create_cycle(
    conn: &Connection,
    from_id: &TaskId,
    to_id: &TaskId,
) -> Result<bool, StoreError> {
    let mut visited = HashSet::new();
    let mut stack = vec![to_id.clone()];

    while let Some(node) = stack.pop() {
        if node == *from_id {
            return Ok(true);
        }
        if visited.insert(node.clone()) {
            for dep in Storage::deps_from(conn, &node, Some(DepKind::After))? {
                stack.push(dep.to_id);
            }
        }
    }

    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_test_store() -> (TempDir, Store) {
        let temp_dir = TempDir::new().unwrap();
        let store = Store::init(temp_dir.path()).unwrap();
        (temp_dir, store)
    }

    fn id(s: &str) -> TaskId {
        TaskId::parse(s).unwrap()
    }

    fn all_ids(store: &Store) -> Vec<String> {
        store
            .list()
            .unwrap()
            .iter()
            .map(|t| t.id.to_string())
            .collect()
    }

    #[test]
    fn test_create_assigns_root_ids() {
        let (_temp_dir, mut store) = setup_test_store();

        let a = store.create(NewTask::new("First")).unwrap();
        let b = store.create(NewTask::new("Second")).unwrap();

        assert_eq!(a.id.to_string(), "1");
        assert_eq!(b.id.to_string(), "2");
        assert_eq!(a.status, Status::Todo);
        assert_eq!(a.readiness, Readiness::Draft);
        assert_eq!(a.priority, Priority::Medium);
    }

    #[test]
    fn test_create_child_ids() {
        let (_temp_dir, mut store) = setup_test_store();

        let root = store.create(NewTask::new("Root")).unwrap();
        let child = store
            .create(NewTask {
                parent: Some(root.id.clone()),
                ..NewTask::new("Child")
            })
            .unwrap();
        let grandchild = store
            .create(NewTask {
                parent: Some(child.id.clone()),
                ..NewTask::new("Grandchild")
            })
            .unwrap();

        assert_eq!(child.id.to_string(), "1.1");
        assert_eq!(child.parent_id, Some(root.id.clone()));
        assert_eq!(grandchild.id.to_string(), "1.1.1");

        // child edges are maintained automatically
        let deps = store.dependencies().unwrap();
        assert!(deps
            .iter()
            .any(|d| d.from_id == child.id && d.to_id == root.id && d.kind == DepKind::Child));
    }

    #[test]
    fn test_create_after_shifts_siblings() {
        let (_temp_dir, mut store) = setup_test_store();

        let root = store.create(NewTask::new("Root")).unwrap();
        for title in ["A", "B", "C"] {
            store
                .create(NewTask {
                    parent: Some(root.id.clone()),
                    ..NewTask::new(title)
                })
                .unwrap();
        }

        // insert after 1.1: B and C shift up
        let inserted = store
            .create(NewTask {
                after: Some(id("1.1")),
                ..NewTask::new("A-and-a-half")
            })
            .unwrap();

        assert_eq!(inserted.id.to_string(), "1.2");
        let titles: Vec<String> = Storage::list_children(store.storage().conn(), Some(&root.id))
            .unwrap()
            .iter()
            .map(|t| t.title.clone())
            .collect();
        assert_eq!(titles, vec!["A", "A-and-a-half", "B", "C"]);
    }

    #[test]
    fn test_create_with_missing_parent() {
        let (_temp_dir, mut store) = setup_test_store();
        let result = store.create(NewTask {
            parent: Some(id("42")),
            ..NewTask::new("Orphan")
        });
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_create_validates_before_write() {
        let (_temp_dir, mut store) = setup_test_store();
        let result = store.create(NewTask::new(""));
        assert!(matches!(result, Err(StoreError::InvalidInput(_))));
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_update_partial_patch() {
        let (_temp_dir, mut store) = setup_test_store();

        let task = store
            .create(NewTask {
                description: Some("original".to_string()),
                ..NewTask::new("Task")
            })
            .unwrap();

        let updated = store
            .update(
                &task.id,
                TaskPatch {
                    status: Some(Status::InProgress),
                    description: Some(None),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.title, "Task");
        assert_eq!(updated.status, Status::InProgress);
        assert_eq!(updated.description, None);
    }

    #[test]
    fn test_update_missing_task() {
        let (_temp_dir, mut store) = setup_test_store();
        let result = store.update(&id("9"), TaskPatch::default());
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_remove_renumbers_root_siblings() {
        let (_temp_dir, mut store) = setup_test_store();

        let a = store.create(NewTask::new("One")).unwrap();
        let b = store.create(NewTask::new("Two")).unwrap();
        let c = store.create(NewTask::new("Three")).unwrap();
        store.add_dependency(&c.id, &a.id, DepKind::After).unwrap();

        store.remove(&b.id).unwrap();

        assert_eq!(all_ids(&store), vec!["1", "2"]);
        let renamed = store.get(&id("2")).unwrap().unwrap();
        assert_eq!(renamed.title, "Three");

        // the edge that referenced "3" now references "2"
        let deps = store.dependencies().unwrap();
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].from_id.to_string(), "2");
        assert_eq!(deps[0].to_id.to_string(), "1");
    }

    #[test]
    fn test_remove_renumbers_descendants() {
        let (_temp_dir, mut store) = setup_test_store();

        let root = store.create(NewTask::new("Root")).unwrap();
        for title in ["A", "B", "C"] {
            store
                .create(NewTask {
                    parent: Some(root.id.clone()),
                    ..NewTask::new(title)
                })
                .unwrap();
        }
        // grandchildren under C (1.3)
        store
            .create(NewTask {
                parent: Some(id("1.3")),
                ..NewTask::new("C-sub")
            })
            .unwrap();

        store.remove(&id("1.1")).unwrap();

        assert_eq!(all_ids(&store), vec!["1", "1.1", "1.2", "1.2.1"]);
        assert_eq!(store.get(&id("1.2.1")).unwrap().unwrap().title, "C-sub");
        assert_eq!(
            store.get(&id("1.2.1")).unwrap().unwrap().parent_id,
            Some(id("1.2"))
        );
    }

    #[test]
    fn test_remove_subtree_drops_edges() {
        let (_temp_dir, mut store) = setup_test_store();

        let a = store.create(NewTask::new("A")).unwrap();
        let b = store.create(NewTask::new("B")).unwrap();
        let child = store
            .create(NewTask {
                parent: Some(a.id.clone()),
                ..NewTask::new("A-child")
            })
            .unwrap();
        store.add_dependency(&b.id, &child.id, DepKind::After).unwrap();

        store.remove(&a.id).unwrap();

        // no dangling references to the removed subtree
        let deps = store.dependencies().unwrap();
        assert!(deps.is_empty());
        assert_eq!(all_ids(&store), vec!["1"]);
        assert_eq!(store.get(&id("1")).unwrap().unwrap().title, "B");
    }

    #[test]
    fn test_remove_missing_task() {
        let (_temp_dir, mut store) = setup_test_store();
        let result = store.remove(&id("4"));
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_contiguity_after_mixed_operations() {
        let (_temp_dir, mut store) = setup_test_store();

        for i in 0..5 {
            store.create(NewTask::new(format!("Task {}", i))).unwrap();
        }
        store.remove(&id("2")).unwrap();
        store.remove(&id("4")).unwrap();
        store.create(NewTask::new("New")).unwrap();

        // root indices must be 1..n with no gaps
        let indices: Vec<u32> = store
            .list()
            .unwrap()
            .iter()
            .filter(|t| t.id.is_root())
            .map(|t| t.id.last_index())
            .collect();
        assert_eq!(indices, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_reparent_moves_subtree() {
        let (_temp_dir, mut store) = setup_test_store();

        let a = store.create(NewTask::new("A")).unwrap();
        let b = store.create(NewTask::new("B")).unwrap();
        store
            .create(NewTask {
                parent: Some(b.id.clone()),
                ..NewTask::new("B-child")
            })
            .unwrap();

        let moved = store.reparent(&b.id, Some(&a.id)).unwrap();

        assert_eq!(moved.id.to_string(), "1.1");
        assert_eq!(all_ids(&store), vec!["1", "1.1", "1.1.1"]);
        assert_eq!(store.get(&id("1.1.1")).unwrap().unwrap().title, "B-child");
    }

    #[test]
    fn test_reparent_rejects_own_subtree() {
        let (_temp_dir, mut store) = setup_test_store();

        let a = store.create(NewTask::new("A")).unwrap();
        let child = store
            .create(NewTask {
                parent: Some(a.id.clone()),
                ..NewTask::new("Child")
            })
            .unwrap();

        let result = store.reparent(&a.id, Some(&child.id));
        assert!(matches!(result, Err(StoreError::Dependency(_))));
    }

    #[test]
    fn test_reparent_to_root() {
        let (_temp_dir, mut store) = setup_test_store();

        let a = store.create(NewTask::new("A")).unwrap();
        let child = store
            .create(NewTask {
                parent: Some(a.id.clone()),
                ..NewTask::new("Child")
            })
            .unwrap();

        let moved = store.reparent(&child.id, None).unwrap();
        assert_eq!(moved.id.to_string(), "2");
        assert_eq!(moved.parent_id, None);
    }

    #[test]
    fn test_move_after_within_scope() {
        let (_temp_dir, mut store) = setup_test_store();

        for title in ["A", "B", "C", "D"] {
            store.create(NewTask::new(title)).unwrap();
        }

        // move D (4) after A (1): A, D, B, C
        store.move_after(&id("4"), &id("1")).unwrap();

        let titles: Vec<String> = store.list().unwrap().iter().map(|t| t.title.clone()).collect();
        assert_eq!(titles, vec!["A", "D", "B", "C"]);
        assert_eq!(all_ids(&store), vec!["1", "2", "3", "4"]);
    }

    #[test]
    fn test_move_after_earlier_to_later() {
        let (_temp_dir, mut store) = setup_test_store();

        for title in ["A", "B", "C", "D"] {
            store.create(NewTask::new(title)).unwrap();
        }

        // move A (1) after C: B, C, A, D
        store.move_after(&id("1"), &id("3")).unwrap();

        let titles: Vec<String> = store.list().unwrap().iter().map(|t| t.title.clone()).collect();
        assert_eq!(titles, vec!["B", "C", "A", "D"]);
        assert_eq!(all_ids(&store), vec!["1", "2", "3", "4"]);
    }

    #[test]
    fn test_move_after_across_scopes() {
        let (_temp_dir, mut store) = setup_test_store();

        let a = store.create(NewTask::new("A")).unwrap();
        store
            .create(NewTask {
                parent: Some(a.id.clone()),
                ..NewTask::new("A1")
            })
            .unwrap();
        let b = store.create(NewTask::new("B")).unwrap();

        // move B after A1: becomes 1.2
        let moved = store.move_after(&b.id, &id("1.1")).unwrap();
        assert_eq!(moved.id.to_string(), "1.2");
        assert_eq!(all_ids(&store), vec!["1", "1.1", "1.2"]);
    }

    #[test]
    fn test_metadata_patch_ops() {
        let (_temp_dir, mut store) = setup_test_store();

        let task = store.create(NewTask::new("Task")).unwrap();

        store
            .update_metadata(
                &task.id,
                "details.complexity",
                Some(serde_json::json!(8)),
                MetaOp::Set,
            )
            .unwrap();
        assert_eq!(
            store.get_metadata(&task.id, "details.complexity").unwrap(),
            Some(serde_json::json!(8))
        );

        store
            .update_metadata(&task.id, "notes", Some(serde_json::json!("n1")), MetaOp::Append)
            .unwrap();
        assert_eq!(
            store.get_metadata(&task.id, "notes").unwrap(),
            Some(serde_json::json!(["n1"]))
        );

        store
            .update_metadata(&task.id, "details.complexity", None, MetaOp::Remove)
            .unwrap();
        assert_eq!(store.get_metadata(&task.id, "details.complexity").unwrap(), None);
    }

    #[test]
    fn test_metadata_requires_value_for_set() {
        let (_temp_dir, mut store) = setup_test_store();
        let task = store.create(NewTask::new("Task")).unwrap();
        let result = store.update_metadata(&task.id, "key", None, MetaOp::Set);
        assert!(matches!(result, Err(StoreError::InvalidInput(_))));
    }

    #[test]
    fn test_metadata_rejects_bad_path() {
        let (_temp_dir, mut store) = setup_test_store();
        let task = store.create(NewTask::new("Task")).unwrap();
        for path in ["", "a..b", ".a"] {
            let result =
                store.update_metadata(&task.id, path, Some(serde_json::json!(1)), MetaOp::Set);
            assert!(matches!(result, Err(StoreError::InvalidInput(_))), "path '{}'", path);
        }
    }

    #[test]
    fn test_get_descendants() {
        let (_temp_dir, mut store) = setup_test_store();

        let root = store.create(NewTask::new("Root")).unwrap();
        store
            .create(NewTask {
                parent: Some(root.id.clone()),
                ..NewTask::new("Child")
            })
            .unwrap();
        store
            .create(NewTask {
                parent: Some(id("1.1")),
                ..NewTask::new("Grandchild")
            })
            .unwrap();
        store.create(NewTask::new("Unrelated")).unwrap();

        let descendants = store.get_descendants(&root.id).unwrap();
        let ids: Vec<String> = descendants.iter().map(|t| t.id.to_string()).collect();
        assert_eq!(ids, vec!["1.1", "1.1.1"]);
    }

    #[test]
    fn test_subgraph_follows_edges_and_guards_cycles() {
        let (_temp_dir, mut store) = setup_test_store();

        let a = store.create(NewTask::new("A")).unwrap();
        let b = store.create(NewTask::new("B")).unwrap();
        let c = store.create(NewTask::new("C")).unwrap();

        store.add_dependency(&a.id, &b.id, DepKind::After).unwrap();
        // sibling edges are not cycle-checked; a mutual pair must not hang
        store.add_dependency(&b.id, &c.id, DepKind::Sibling).unwrap();
        store.add_dependency(&c.id, &b.id, DepKind::Sibling).unwrap();

        let nodes = store.get_subgraph_nodes(&a.id).unwrap();
        let mut ids: Vec<String> = nodes.iter().map(|t| t.id.to_string()).collect();
        ids.sort();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_add_dependency_rejects_self_edge() {
        let (_temp_dir, mut store) = setup_test_store();
        let a = store.create(NewTask::new("A")).unwrap();
        let result = store.add_dependency(&a.id, &a.id, DepKind::After);
        assert!(matches!(result, Err(StoreError::Dependency(_))));
    }

    #[test]
    fn test_add_dependency_rejects_cycle() {
        let (_temp_dir, mut store) = setup_test_store();

        let a = store.create(NewTask::new("A")).unwrap();
        let b = store.create(NewTask::new("B")).unwrap();
        let c = store.create(NewTask::new("C")).unwrap();

        store.add_dependency(&a.id, &b.id, DepKind::After).unwrap();
        store.add_dependency(&b.id, &c.id, DepKind::After).unwrap();
        let result = store.add_dependency(&c.id, &a.id, DepKind::After);
        assert!(matches!(result, Err(StoreError::Dependency(_))));
    }

    #[test]
    fn test_add_dependency_rejects_bad_child_edge() {
        let (_temp_dir, mut store) = setup_test_store();

        let a = store.create(NewTask::new("A")).unwrap();
        let b = store.create(NewTask::new("B")).unwrap();
        let result = store.add_dependency(&a.id, &b.id, DepKind::Child);
        assert!(matches!(result, Err(StoreError::Dependency(_))));
    }

    #[test]
    fn test_add_dependency_missing_endpoint() {
        let (_temp_dir, mut store) = setup_test_store();
        let a = store.create(NewTask::new("A")).unwrap();
        let result = store.add_dependency(&a.id, &id("9"), DepKind::After);
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_add_dependency_idempotent() {
        let (_temp_dir, mut store) = setup_test_store();

        let a = store.create(NewTask::new("A")).unwrap();
        let b = store.create(NewTask::new("B")).unwrap();

        store.add_dependency(&a.id, &b.id, DepKind::After).unwrap();
        store.add_dependency(&a.id, &b.id, DepKind::After).unwrap();

        let after_edges: Vec<_> = store
            .dependencies()
            .unwrap()
            .into_iter()
            .filter(|d| d.kind == DepKind::After)
            .collect();
        assert_eq!(after_edges.len(), 1);
    }
}
