//! In-memory task store
//!
//! Owns the full task/subtask collection of one document and provides node
//! lookup plus the structural mutation primitives the graph engine builds on.
//! Nothing here touches persistence.

use thiserror::Error;
use tracing::debug;

use super::error::ErrorKind;
use super::id::NodeId;
use super::task::{NewTask, Priority, Subtask, Task, TaskStatus, TasksDocument};

#[derive(Debug, Error, PartialEq)]
pub enum StoreError {
    #[error("Task not found: {0}")]
    NotFound(NodeId),

    #[error("Duplicate ID in document: {0}")]
    DuplicateId(NodeId),

    #[error("Task {0} has subtasks and cannot become a subtask")]
    HasSubtasks(u32),

    #[error("Task {0} cannot become a subtask of itself")]
    OwnParent(u32),

    #[error("Task {0} would have no subtask without dependencies")]
    NoIndependentSubtask(u32),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::NotFound(_) => ErrorKind::NotFound,
            StoreError::DuplicateId(_) | StoreError::NoIndependentSubtask(_) => {
                ErrorKind::Validation
            }
            StoreError::HasSubtasks(_) | StoreError::OwnParent(_) => ErrorKind::StateConflict,
        }
    }
}

/// A resolved task or subtask
#[derive(Debug, Clone, Copy)]
pub enum Node<'a> {
    Task(&'a Task),
    Subtask { parent: &'a Task, subtask: &'a Subtask },
}

impl<'a> Node<'a> {
    pub fn id(&self) -> NodeId {
        match self {
            Node::Task(task) => task.node_id(),
            Node::Subtask { parent, subtask } => NodeId::subtask(parent.id, subtask.id),
        }
    }

    pub fn title(&self) -> &'a str {
        match self {
            Node::Task(task) => &task.title,
            Node::Subtask { subtask, .. } => &subtask.title,
        }
    }

    pub fn status(&self) -> TaskStatus {
        match self {
            Node::Task(task) => task.status,
            Node::Subtask { subtask, .. } => subtask.status,
        }
    }

    pub fn priority(&self) -> Priority {
        match self {
            Node::Task(task) => task.priority,
            Node::Subtask { subtask, .. } => subtask.priority,
        }
    }

    pub fn dependencies(&self) -> &'a [NodeId] {
        match self {
            Node::Task(task) => &task.dependencies,
            Node::Subtask { subtask, .. } => &subtask.dependencies,
        }
    }

    /// Returns the parent task for subtasks
    pub fn parent(&self) -> Option<&'a Task> {
        match self {
            Node::Task(_) => None,
            Node::Subtask { parent, .. } => Some(parent),
        }
    }
}

/// In-memory view over one task document
#[derive(Debug, Clone, Default)]
pub struct TaskStore {
    doc: TasksDocument,
}

impl TaskStore {
    /// Wraps a loaded document, rejecting duplicate task or subtask IDs
    pub fn new(doc: TasksDocument) -> Result<Self, StoreError> {
        let mut seen = std::collections::HashSet::new();
        for task in &doc.tasks {
            if !seen.insert(task.node_id()) {
                return Err(StoreError::DuplicateId(task.node_id()));
            }
            for id in task.subtask_ids() {
                if !seen.insert(id) {
                    return Err(StoreError::DuplicateId(id));
                }
            }
        }

        Ok(Self { doc })
    }

    /// Builds a store from tasks, for callers that construct documents in code
    pub fn from_tasks(tasks: Vec<Task>) -> Result<Self, StoreError> {
        Self::new(TasksDocument {
            tasks,
            ..TasksDocument::default()
        })
    }

    pub fn document(&self) -> &TasksDocument {
        &self.doc
    }

    pub fn into_document(self) -> TasksDocument {
        self.doc
    }

    pub fn tasks(&self) -> &[Task] {
        &self.doc.tasks
    }

    pub(crate) fn tasks_mut(&mut self) -> &mut [Task] {
        &mut self.doc.tasks
    }

    pub fn task(&self, id: u32) -> Option<&Task> {
        self.doc.tasks.iter().find(|t| t.id == id)
    }

    fn task_mut(&mut self, id: u32) -> Option<&mut Task> {
        self.doc.tasks.iter_mut().find(|t| t.id == id)
    }

    /// Every node in document order: each task followed by its subtasks
    pub fn node_ids(&self) -> Vec<NodeId> {
        let mut ids = Vec::new();
        for task in &self.doc.tasks {
            ids.push(task.node_id());
            ids.extend(task.subtask_ids());
        }
        ids
    }

    /// Looks up a task or subtask
    pub fn resolve(&self, id: NodeId) -> Result<Node<'_>, StoreError> {
        let task = self
            .task(id.root_task())
            .ok_or(StoreError::NotFound(id))?;

        match id {
            NodeId::Task(_) => Ok(Node::Task(task)),
            NodeId::Subtask { local, .. } => task
                .subtask(local)
                .map(|subtask| Node::Subtask {
                    parent: task,
                    subtask,
                })
                .ok_or(StoreError::NotFound(id)),
        }
    }

    pub fn exists(&self, id: NodeId) -> bool {
        self.resolve(id).is_ok()
    }

    /// Returns the declared dependencies of a node
    pub fn dependencies_of(&self, id: NodeId) -> Result<&[NodeId], StoreError> {
        self.resolve(id).map(|node| node.dependencies())
    }

    pub(crate) fn dependencies_mut(&mut self, id: NodeId) -> Result<&mut Vec<NodeId>, StoreError> {
        let task = self
            .task_mut(id.root_task())
            .ok_or(StoreError::NotFound(id))?;

        match id {
            NodeId::Task(_) => Ok(&mut task.dependencies),
            NodeId::Subtask { local, .. } => task
                .subtask_mut(local)
                .map(|s| &mut s.dependencies)
                .ok_or(StoreError::NotFound(id)),
        }
    }

    /// Appends `from -> to` unless already present. Returns true if added.
    ///
    /// This is the raw primitive: it does not check that `to` exists or that
    /// the edge keeps the graph acyclic.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId) -> Result<bool, StoreError> {
        let deps = self.dependencies_mut(from)?;
        if deps.contains(&to) {
            return Ok(false);
        }
        deps.push(to);
        debug!(%from, %to, "edge added");
        Ok(true)
    }

    /// Removes every `from -> to` edge. Returns true if anything was removed.
    pub fn remove_edge(&mut self, from: NodeId, to: NodeId) -> Result<bool, StoreError> {
        let deps = self.dependencies_mut(from)?;
        let before = deps.len();
        deps.retain(|d| *d != to);
        let removed = deps.len() != before;
        if removed {
            debug!(%from, %to, "edge removed");
        }
        Ok(removed)
    }

    /// Sorts a node's dependency list into canonical order
    pub fn sort_dependencies(&mut self, id: NodeId) -> Result<(), StoreError> {
        self.dependencies_mut(id)?.sort();
        Ok(())
    }

    /// Returns the next free top-level task ID
    pub fn next_task_id(&self) -> u32 {
        self.doc.tasks.iter().map(|t| t.id).max().unwrap_or(0) + 1
    }

    /// Registers a new top-level task and returns its ID
    pub fn add_task(&mut self, new: NewTask) -> u32 {
        let id = self.next_task_id();
        let mut task = Task::new(id, new.title);
        task.description = new.description;
        task.priority = new.priority;
        self.doc.tasks.push(task);
        debug!(id, "task added");
        id
    }

    /// Registers a new subtask under `parent` and returns its node ID
    pub fn add_subtask(&mut self, parent: u32, new: NewTask) -> Result<NodeId, StoreError> {
        let task = self
            .task_mut(parent)
            .ok_or(StoreError::NotFound(NodeId::task(parent)))?;

        let local = task.next_subtask_id();
        let mut subtask = Subtask::new(local, new.title);
        subtask.description = new.description;
        subtask.priority = new.priority;
        task.subtasks.push(subtask);

        let id = NodeId::subtask(parent, local);
        debug!(%id, "subtask added");
        Ok(id)
    }

    /// Deletes a task (with its subtasks) or a subtask, purging every inbound
    /// reference to the deleted nodes. Returns the number of purged edges.
    pub fn remove_node(&mut self, id: NodeId) -> Result<usize, StoreError> {
        let removed: Vec<NodeId> = match id {
            NodeId::Task(task_id) => {
                let pos = self
                    .doc
                    .tasks
                    .iter()
                    .position(|t| t.id == task_id)
                    .ok_or(StoreError::NotFound(id))?;
                let task = self.doc.tasks.remove(pos);
                std::iter::once(id).chain(task.subtask_ids()).collect()
            }
            NodeId::Subtask { parent, local } => {
                let task = self.task_mut(parent).ok_or(StoreError::NotFound(id))?;
                let pos = task
                    .subtasks
                    .iter()
                    .position(|s| s.id == local)
                    .ok_or(StoreError::NotFound(id))?;
                task.subtasks.remove(pos);
                vec![id]
            }
        };

        let purged = self.purge_references(|dep| removed.contains(dep));
        debug!(%id, purged, "node removed");
        Ok(purged)
    }

    /// Drops every dependency matching `pred` from every node
    pub(crate) fn purge_references(&mut self, pred: impl Fn(&NodeId) -> bool) -> usize {
        let mut purged = 0;
        for task in &mut self.doc.tasks {
            let before = task.dependencies.len();
            task.dependencies.retain(|d| !pred(d));
            purged += before - task.dependencies.len();

            for subtask in &mut task.subtasks {
                let before = subtask.dependencies.len();
                subtask.dependencies.retain(|d| !pred(d));
                purged += before - subtask.dependencies.len();
            }
        }
        purged
    }

    /// Replaces every reference to `old` with `new`
    fn rewrite_references(&mut self, old: NodeId, new: NodeId) {
        let rewrite = |deps: &mut Vec<NodeId>| {
            for dep in deps.iter_mut() {
                if *dep == old {
                    *dep = new;
                }
            }
            deps.sort();
            deps.dedup();
        };

        for task in &mut self.doc.tasks {
            if task.dependencies.contains(&old) {
                rewrite(&mut task.dependencies);
            }
            for subtask in &mut task.subtasks {
                if subtask.dependencies.contains(&old) {
                    rewrite(&mut subtask.dependencies);
                }
            }
        }
    }

    /// Sets a node's status. Marking a task done also completes its subtasks.
    ///
    /// Returns every node whose status changed.
    pub fn set_status(&mut self, id: NodeId, status: TaskStatus) -> Result<Vec<NodeId>, StoreError> {
        let task = self
            .task_mut(id.root_task())
            .ok_or(StoreError::NotFound(id))?;

        let mut changed = Vec::new();
        match id {
            NodeId::Task(task_id) => {
                if task.status != status {
                    task.status = status;
                    changed.push(id);
                }
                if status.is_complete() {
                    for subtask in &mut task.subtasks {
                        if !subtask.status.is_complete() {
                            subtask.status = TaskStatus::Done;
                            changed.push(NodeId::subtask(task_id, subtask.id));
                        }
                    }
                }
            }
            NodeId::Subtask { local, .. } => {
                let subtask = task.subtask_mut(local).ok_or(StoreError::NotFound(id))?;
                if subtask.status != status {
                    subtask.status = status;
                    changed.push(id);
                }
            }
        }

        debug!(%id, %status, changed = changed.len(), "status set");
        Ok(changed)
    }

    /// Promotes a subtask to a top-level task with a fresh ID
    ///
    /// Fails if the remaining siblings would all have dependencies.
    pub fn convert_subtask_to_task(&mut self, parent: u32, local: u32) -> Result<u32, StoreError> {
        let old = NodeId::subtask(parent, local);
        let siblings = self
            .task(parent)
            .filter(|task| task.subtask(local).is_some())
            .ok_or(StoreError::NotFound(old))?
            .subtasks
            .iter()
            .filter(|s| s.id != local);
        if !startable_or_empty(siblings) {
            return Err(StoreError::NoIndependentSubtask(parent));
        }

        let new_id = self.next_task_id();
        let parent_task = self.task_mut(parent).ok_or(StoreError::NotFound(old))?;
        let pos = parent_task
            .subtasks
            .iter()
            .position(|s| s.id == local)
            .ok_or(StoreError::NotFound(old))?;
        let subtask = parent_task.subtasks.remove(pos);

        // The parent's containment edge on this subtask is meaningless once it
        // is a sibling task.
        parent_task.dependencies.retain(|d| *d != old);

        self.doc.tasks.push(Task {
            id: new_id,
            title: subtask.title,
            description: subtask.description,
            status: subtask.status,
            priority: subtask.priority,
            dependencies: subtask.dependencies,
            subtasks: Vec::new(),
            extra: subtask.extra,
        });

        let new = NodeId::task(new_id);
        self.rewrite_references(old, new);
        debug!(%old, %new, "subtask converted to task");
        Ok(new_id)
    }

    /// Demotes a task without subtasks to a subtask of `parent`
    ///
    /// A task with dependencies is refused when none of the parent's current
    /// subtasks is free of them.
    pub fn convert_task_to_subtask(&mut self, task_id: u32, parent: u32) -> Result<u32, StoreError> {
        if task_id == parent {
            return Err(StoreError::OwnParent(task_id));
        }

        let old = NodeId::task(task_id);
        let pos = self
            .doc
            .tasks
            .iter()
            .position(|t| t.id == task_id)
            .ok_or(StoreError::NotFound(old))?;
        if !self.doc.tasks[pos].subtasks.is_empty() {
            return Err(StoreError::HasSubtasks(task_id));
        }
        let parent_task = self
            .task(parent)
            .ok_or(StoreError::NotFound(NodeId::task(parent)))?;
        if !self.doc.tasks[pos].dependencies.is_empty()
            && !parent_task.subtasks.iter().any(|s| s.dependencies.is_empty())
        {
            return Err(StoreError::NoIndependentSubtask(parent));
        }

        let task = self.doc.tasks.remove(pos);
        let parent_task = self
            .task_mut(parent)
            .ok_or(StoreError::NotFound(NodeId::task(parent)))?;
        let local = parent_task.next_subtask_id();
        parent_task.subtasks.push(Subtask {
            id: local,
            title: task.title,
            description: task.description,
            status: task.status,
            priority: task.priority,
            dependencies: task.dependencies,
            extra: task.extra,
        });

        let new = NodeId::subtask(parent, local);
        self.rewrite_references(old, new);
        debug!(%old, %new, "task converted to subtask");
        Ok(local)
    }
}

/// Returns true if no subtask is given or at least one has no dependencies
fn startable_or_empty<'a>(subtasks: impl IntoIterator<Item = &'a Subtask>) -> bool {
    let mut empty = true;
    for subtask in subtasks {
        if subtask.dependencies.is_empty() {
            return true;
        }
        empty = false;
    }
    empty
}
