//! Assemble a flat task list into the tree its ids encode.

use crate::id::TaskId;
use crate::types::Task;
use serde::Serialize;

/// A task with its children, ordered by sibling index.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TaskNode {
    pub task: Task,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TaskNode>,
}

impl TaskNode {
    fn leaf(task: Task) -> Self {
        Self {
            task,
            children: Vec::new(),
        }
    }

    /// Total number of tasks in this subtree, including the root.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(TaskNode::size).sum::<usize>()
    }
}

/// Build the hierarchy from a flat list.
///
/// Output roots and every `children` list are ordered by sibling index.
/// A task whose parent is missing from the input is kept as an extra root
/// rather than dropped.
pub fn build_hierarchy(tasks: &[Task]) -> Vec<TaskNode> {
    let mut sorted: Vec<&Task> = tasks.iter().collect();
    // Hierarchy order: a parent's id always sorts before its children's
    sorted.sort_by(|a, b| a.id.cmp(&b.id));

    let mut roots: Vec<TaskNode> = Vec::new();
    for task in sorted {
        insert(&mut roots, task.clone());
    }
    roots
}

fn insert(roots: &mut Vec<TaskNode>, task: Task) {
    match task.id.parent() {
        None => roots.push(TaskNode::leaf(task)),
        Some(parent_id) => match find_node_mut(roots, &parent_id) {
            Some(parent) => parent.children.push(TaskNode::leaf(task)),
            None => {
                log::warn!("task {} has no parent in the input; keeping as root", task.id);
                roots.push(TaskNode::leaf(task));
            }
        },
    }
}

fn find_node_mut<'a>(nodes: &'a mut [TaskNode], id: &TaskId) -> Option<&'a mut TaskNode> {
    for node in nodes {
        if node.task.id == *id {
            return Some(node);
        }
        if id.is_descendant_of(&node.task.id) {
            return find_node_mut(&mut node.children, id);
        }
    }
    None
}
