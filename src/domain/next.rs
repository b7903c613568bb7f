//! Next-work selection
//!
//! Picks the single best work item: eligible subtasks of in-progress tasks
//! first, then eligible top-level tasks.

use serde::Serialize;
use std::cmp::{Ordering, Reverse};

use super::id::NodeId;
use super::store::{Node, TaskStore};
use super::task::{Priority, TaskStatus};

/// The selected unit of work
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkItem {
    pub id: NodeId,
    pub title: String,
    pub status: TaskStatus,
    pub priority: Priority,
    pub dependencies: Vec<NodeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<u32>,
}

impl From<Node<'_>> for WorkItem {
    fn from(node: Node<'_>) -> Self {
        Self {
            id: node.id(),
            title: node.title().to_string(),
            status: node.status(),
            priority: node.priority(),
            dependencies: node.dependencies().to_vec(),
            parent_id: node.parent().map(|p| p.id),
        }
    }
}

/// Number of dependencies that are missing or not yet done
fn unresolved_dependencies(store: &TaskStore, node: &Node<'_>) -> usize {
    node.dependencies()
        .iter()
        .filter(|dep| {
            store
                .resolve(**dep)
                .map(|d| !d.status().is_complete())
                .unwrap_or(true)
        })
        .count()
}

/// A node is eligible when it is not done and every dependency is done
pub fn is_eligible(store: &TaskStore, node: &Node<'_>) -> bool {
    !node.status().is_complete() && unresolved_dependencies(store, node) == 0
}

/// Higher priority, then fewer unresolved dependencies, then lowest ID
fn rank(store: &TaskStore, a: &Node<'_>, b: &Node<'_>) -> Ordering {
    let key = |n: &Node<'_>| {
        (
            Reverse(n.priority().weight()),
            unresolved_dependencies(store, n),
            n.id(),
        )
    };
    key(a).cmp(&key(b))
}

/// Returns the best eligible work item, or None if everything is done or blocked
pub fn find_next(store: &TaskStore) -> Option<WorkItem> {
    let subtasks = store
        .tasks()
        .iter()
        .filter(|task| task.status.is_active())
        .flat_map(|parent| {
            parent
                .subtasks
                .iter()
                .map(move |subtask| Node::Subtask { parent, subtask })
        })
        .filter(|node| is_eligible(store, node))
        .min_by(|a, b| rank(store, a, b));

    let best = subtasks.or_else(|| {
        store
            .tasks()
            .iter()
            .map(Node::Task)
            .filter(|node| is_eligible(store, node))
            .min_by(|a, b| rank(store, a, b))
    });

    best.map(WorkItem::from)
}
