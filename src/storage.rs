//! SQLite persistence for tasks and dependency edges.
//!
//! The database is the single source of truth. Every compound mutation the
//! store performs (renumbering cascades included) runs through
//! [`Storage::in_transaction`], so readers never observe a partially
//! rewritten hierarchy.

use crate::id::TaskId;
use crate::store::StoreError;
use crate::types::{DepKind, Dependency, Priority, Readiness, Status, Task};
use rusqlite::{Connection, OptionalExtension, params};
use std::fs;
use std::path::Path;

/// Storage directory name.
const TASKTREE_DIR: &str = ".tasktree";

/// SQLite database file.
const DB_FILE: &str = "tasks.db";

/// Storage handle wrapping the SQLite connection.
pub struct Storage {
    db: Connection,
}

impl Storage {
    /// Initialize storage in the given directory.
    pub fn init(root: &Path) -> Result<Self, StoreError> {
        let dir = root.join(TASKTREE_DIR);
        fs::create_dir_all(&dir)
            .map_err(|e| StoreError::General(format!("failed to create {}: {}", dir.display(), e)))?;

        let db = Connection::open(dir.join(DB_FILE))?;
        let storage = Self { db };
        storage.init_schema()?;
        Ok(storage)
    }

    /// Open existing storage.
    pub fn open(root: &Path) -> Result<Self, StoreError> {
        let dir = root.join(TASKTREE_DIR);
        if !dir.exists() {
            return Err(StoreError::General(format!(
                "no {} directory found in {}. Run 'tt init' first.",
                TASKTREE_DIR,
                root.display()
            )));
        }

        let db = Connection::open(dir.join(DB_FILE))?;
        let storage = Self { db };
        storage.init_schema()?;
        Ok(storage)
    }

    /// Initialize the SQLite schema.
    fn init_schema(&self) -> Result<(), StoreError> {
        self.db.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS tasks (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT,
                body TEXT,
                status TEXT NOT NULL CHECK (status IN ('todo', 'in-progress', 'done')),
                readiness TEXT NOT NULL CHECK (readiness IN ('draft', 'ready', 'blocked')),
                priority TEXT NOT NULL CHECK (priority IN ('high', 'medium', 'low')),
                tags TEXT NOT NULL DEFAULT '[]',
                parent_id TEXT,
                metadata TEXT NOT NULL DEFAULT '{}',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_tasks_parent ON tasks(parent_id);
            CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks(status);

            CREATE TABLE IF NOT EXISTS dependencies (
                from_id TEXT NOT NULL,
                to_id TEXT NOT NULL,
                kind TEXT NOT NULL CHECK (kind IN ('child', 'after', 'sibling')),
                created_at TEXT NOT NULL,
                PRIMARY KEY (from_id, to_id, kind)
            );
            CREATE INDEX IF NOT EXISTS idx_deps_to ON dependencies(to_id);
            CREATE INDEX IF NOT EXISTS idx_deps_kind ON dependencies(kind);
        "#,
        )?;

        Ok(())
    }

    /// Read-only access to the underlying connection.
    pub(crate) fn conn(&self) -> &Connection {
        &self.db
    }

    /// Run `f` inside a single transaction.
    ///
    /// An error from `f` drops the transaction, rolling back every statement
    /// it issued; success commits them all at once.
    pub(crate) fn in_transaction<T>(
        &mut self,
        f: impl FnOnce(&Connection) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let tx = self.db.transaction()?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }

    /// Get a task by id.
    pub(crate) fn get_task(conn: &Connection, id: &TaskId) -> Result<Option<Task>, StoreError> {
        let mut stmt = conn.prepare(
            r#"
            SELECT id, title, description, body, status, readiness, priority,
                   tags, parent_id, metadata, created_at, updated_at
            FROM tasks WHERE id = ?
            "#,
        )?;

        let task = stmt
            .query_row(params![id.to_string()], Self::row_to_task)
            .optional()?;
        Ok(task)
    }

    /// Check whether a task exists.
    pub(crate) fn task_exists(conn: &Connection, id: &TaskId) -> Result<bool, StoreError> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM tasks WHERE id = ?",
            params![id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Insert a new task row.
    pub(crate) fn insert_task(conn: &Connection, task: &Task) -> Result<(), StoreError> {
        conn.execute(
            r#"
            INSERT INTO tasks (id, title, description, body, status, readiness, priority,
                               tags, parent_id, metadata, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                task.id.to_string(),
                task.title,
                task.description,
                task.body,
                task.status.as_str(),
                task.readiness.as_str(),
                task.priority.as_str(),
                serde_json::to_string(&task.tags)
                    .map_err(|e| StoreError::General(format!("failed to serialize tags: {}", e)))?,
                task.parent_id.as_ref().map(|p| p.to_string()),
                serde_json::to_string(&task.metadata)
                    .map_err(|e| StoreError::General(format!("failed to serialize metadata: {}", e)))?,
                task.created_at.to_rfc3339(),
                task.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Overwrite every mutable field of an existing task row.
    pub(crate) fn update_task_row(conn: &Connection, task: &Task) -> Result<(), StoreError> {
        conn.execute(
            r#"
            UPDATE tasks
            SET title = ?, description = ?, body = ?, status = ?, readiness = ?,
                priority = ?, tags = ?, metadata = ?, updated_at = ?
            WHERE id = ?
            "#,
            params![
                task.title,
                task.description,
                task.body,
                task.status.as_str(),
                task.readiness.as_str(),
                task.priority.as_str(),
                serde_json::to_string(&task.tags)
                    .map_err(|e| StoreError::General(format!("failed to serialize tags: {}", e)))?,
                serde_json::to_string(&task.metadata)
                    .map_err(|e| StoreError::General(format!("failed to serialize metadata: {}", e)))?,
                task.updated_at.to_rfc3339(),
                task.id.to_string(),
            ],
        )?;
        Ok(())
    }

    /// Delete a single task row.
    pub(crate) fn delete_task_row(conn: &Connection, id: &TaskId) -> Result<(), StoreError> {
        conn.execute("DELETE FROM tasks WHERE id = ?", params![id.to_string()])?;
        Ok(())
    }

    /// Move a task row to a new id, rewriting its parent pointer.
    pub(crate) fn rename_task(
        conn: &Connection,
        old: &TaskId,
        new: &TaskId,
    ) -> Result<(), StoreError> {
        conn.execute(
            "UPDATE tasks SET id = ?, parent_id = ? WHERE id = ?",
            params![
                new.to_string(),
                new.parent().map(|p| p.to_string()),
                old.to_string()
            ],
        )?;
        Ok(())
    }

    /// List every task, sorted in hierarchy order (segment-wise id order).
    pub(crate) fn list_tasks(conn: &Connection) -> Result<Vec<Task>, StoreError> {
        let mut stmt = conn.prepare(
            r#"
            SELECT id, title, description, body, status, readiness, priority,
                   tags, parent_id, metadata, created_at, updated_at
            FROM tasks
            "#,
        )?;

        let mut tasks: Vec<Task> = stmt
            .query_map([], Self::row_to_task)?
            .collect::<rusqlite::Result<_>>()?;
        // Textual ORDER BY would put "10" before "2"; sort parsed ids instead
        tasks.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(tasks)
    }

    /// List the direct children of a parent (None = root scope), in sibling order.
    pub(crate) fn list_children(
        conn: &Connection,
        parent: Option<&TaskId>,
    ) -> Result<Vec<Task>, StoreError> {
        let mut tasks = match parent {
            Some(parent) => {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT id, title, description, body, status, readiness, priority,
                           tags, parent_id, metadata, created_at, updated_at
                    FROM tasks WHERE parent_id = ?
                    "#,
                )?;
                stmt.query_map(params![parent.to_string()], Self::row_to_task)?
                    .collect::<rusqlite::Result<Vec<Task>>>()?
            }
            None => {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT id, title, description, body, status, readiness, priority,
                           tags, parent_id, metadata, created_at, updated_at
                    FROM tasks WHERE parent_id IS NULL
                    "#,
                )?;
                stmt.query_map([], Self::row_to_task)?
                    .collect::<rusqlite::Result<Vec<Task>>>()?
            }
        };
        tasks.sort_by_key(|t| t.id.last_index());
        Ok(tasks)
    }

    /// Highest sibling index under a parent (0 when the scope is empty).
    pub(crate) fn max_child_index(
        conn: &Connection,
        parent: Option<&TaskId>,
    ) -> Result<u32, StoreError> {
        let children = Self::list_children(conn, parent)?;
        Ok(children.iter().map(|t| t.id.last_index()).max().unwrap_or(0))
    }

    /// Insert a dependency edge (idempotent on the (from, to, kind) key).
    pub(crate) fn insert_dep(conn: &Connection, dep: &Dependency) -> Result<(), StoreError> {
        conn.execute(
            r#"
            INSERT OR REPLACE INTO dependencies (from_id, to_id, kind, created_at)
            VALUES (?, ?, ?, ?)
            "#,
            params![
                dep.from_id.to_string(),
                dep.to_id.to_string(),
                dep.kind.as_str(),
                dep.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Delete a specific dependency edge.
    pub(crate) fn delete_dep(
        conn: &Connection,
        from_id: &TaskId,
        to_id: &TaskId,
        kind: DepKind,
    ) -> Result<(), StoreError> {
        conn.execute(
            "DELETE FROM dependencies WHERE from_id = ? AND to_id = ? AND kind = ?",
            params![from_id.to_string(), to_id.to_string(), kind.as_str()],
        )?;
        Ok(())
    }

    /// Check if a dependency edge exists.
    pub(crate) fn dep_exists(
        conn: &Connection,
        from_id: &TaskId,
        to_id: &TaskId,
        kind: DepKind,
    ) -> Result<bool, StoreError> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM dependencies WHERE from_id = ? AND to_id = ? AND kind = ?",
            params![from_id.to_string(), to_id.to_string(), kind.as_str()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Delete every edge that references the given id on either side.
    pub(crate) fn delete_deps_touching(conn: &Connection, id: &TaskId) -> Result<(), StoreError> {
        conn.execute(
            "DELETE FROM dependencies WHERE from_id = ? OR to_id = ?",
            params![id.to_string(), id.to_string()],
        )?;
        Ok(())
    }

    /// Point every edge that references `old` at `new` instead.
    pub(crate) fn rewrite_dep_refs(
        conn: &Connection,
        old: &TaskId,
        new: &TaskId,
    ) -> Result<(), StoreError> {
        conn.execute(
            "UPDATE dependencies SET from_id = ? WHERE from_id = ?",
            params![new.to_string(), old.to_string()],
        )?;
        conn.execute(
            "UPDATE dependencies SET to_id = ? WHERE to_id = ?",
            params![new.to_string(), old.to_string()],
        )?;
        Ok(())
    }

    /// List all dependency edges.
    pub(crate) fn list_deps(conn: &Connection) -> Result<Vec<Dependency>, StoreError> {
        let mut stmt = conn.prepare(
            "SELECT from_id, to_id, kind, created_at FROM dependencies ORDER BY from_id, to_id, kind",
        )?;
        let deps = stmt
            .query_map([], Self::row_to_dep)?
            .collect::<rusqlite::Result<_>>()?;
        Ok(deps)
    }

    /// Outgoing edges from a task, optionally restricted to one kind.
    pub(crate) fn deps_from(
        conn: &Connection,
        from_id: &TaskId,
        kind: Option<DepKind>,
    ) -> Result<Vec<Dependency>, StoreError> {
        let deps = match kind {
            Some(kind) => {
                let mut stmt = conn.prepare(
                    "SELECT from_id, to_id, kind, created_at FROM dependencies
                     WHERE from_id = ? AND kind = ? ORDER BY to_id",
                )?;
                stmt.query_map(params![from_id.to_string(), kind.as_str()], Self::row_to_dep)?
                    .collect::<rusqlite::Result<Vec<Dependency>>>()?
            }
            None => {
                let mut stmt = conn.prepare(
                    "SELECT from_id, to_id, kind, created_at FROM dependencies
                     WHERE from_id = ? ORDER BY to_id, kind",
                )?;
                stmt.query_map(params![from_id.to_string()], Self::row_to_dep)?
                    .collect::<rusqlite::Result<Vec<Dependency>>>()?
            }
        };
        Ok(deps)
    }

    /// Every edge that references the given id on either side.
    pub(crate) fn deps_touching(conn: &Connection, id: &TaskId) -> Result<Vec<Dependency>, StoreError> {
        let mut stmt = conn.prepare(
            "SELECT from_id, to_id, kind, created_at FROM dependencies
             WHERE from_id = ? OR to_id = ? ORDER BY from_id, to_id, kind",
        )?;
        let deps = stmt
            .query_map(params![id.to_string(), id.to_string()], Self::row_to_dep)?
            .collect::<rusqlite::Result<_>>()?;
        Ok(deps)
    }

    /// Convert a database row to a Task.
    fn row_to_task(row: &rusqlite::Row) -> rusqlite::Result<Task> {
        let id_str: String = row.get(0)?;
        let id = TaskId::parse(&id_str).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })?;

        let status_str: String = row.get(4)?;
        let status = Status::parse(&status_str).unwrap_or_else(|| {
            log::warn!("Unrecognized status '{}' for {}", status_str, id_str);
            Status::Todo
        });

        let readiness_str: String = row.get(5)?;
        let readiness = Readiness::parse(&readiness_str).unwrap_or_else(|| {
            log::warn!("Unrecognized readiness '{}' for {}", readiness_str, id_str);
            Readiness::Draft
        });

        let priority_str: String = row.get(6)?;
        let priority = Priority::parse(&priority_str).unwrap_or_else(|| {
            log::warn!("Unrecognized priority '{}' for {}", priority_str, id_str);
            Priority::Medium
        });

        let tags_str: String = row.get(7)?;
        let tags = serde_json::from_str(&tags_str).unwrap_or_else(|e| {
            log::warn!("Failed to parse tags for {}: {}", id_str, e);
            Vec::new()
        });

        let parent_str: Option<String> = row.get(8)?;
        let parent_id = parent_str.as_deref().and_then(|s| TaskId::parse(s).ok());

        let metadata_str: String = row.get(9)?;
        let metadata = serde_json::from_str(&metadata_str).unwrap_or_else(|e| {
            log::warn!("Failed to parse metadata for {}: {}", id_str, e);
            serde_json::Value::Object(serde_json::Map::new())
        });

        let created_at_str: String = row.get(10)?;
        let updated_at_str: String = row.get(11)?;

        Ok(Task {
            id,
            title: row.get(1)?,
            description: row.get(2)?,
            body: row.get(3)?,
            status,
            readiness,
            priority,
            tags,
            parent_id,
            metadata,
            created_at: chrono::DateTime::parse_from_rfc3339(&created_at_str)
                .map(|dt| dt.with_timezone(&chrono::Utc))
                .unwrap_or_else(|_| chrono::Utc::now()),
            updated_at: chrono::DateTime::parse_from_rfc3339(&updated_at_str)
                .map(|dt| dt.with_timezone(&chrono::Utc))
                .unwrap_or_else(|_| chrono::Utc::now()),
        })
    }

    /// Convert a database row to a Dependency.
    fn row_to_dep(row: &rusqlite::Row) -> rusqlite::Result<Dependency> {
        let from_str: String = row.get(0)?;
        let to_str: String = row.get(1)?;
        let from_id = TaskId::parse(&from_str).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })?;
        let to_id = TaskId::parse(&to_str).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
        })?;

        let kind_str: String = row.get(2)?;
        let kind = DepKind::parse(&kind_str).unwrap_or(DepKind::Sibling);

        let created_at_str: String = row.get(3)?;

        Ok(Dependency {
            from_id,
            to_id,
            kind,
            created_at: chrono::DateTime::parse_from_rfc3339(&created_at_str)
                .map(|dt| dt.with_timezone(&chrono::Utc))
                .unwrap_or_else(|_| chrono::Utc::now()),
        })
    }
}
