//! Task domain model
//!
//! Tasks are the top-level units of work in a document. Each task may own an
//! ordered list of subtasks whose IDs are local to the parent.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::id::NodeId;

/// Error for unknown status or priority names
#[derive(Debug, Error, PartialEq)]
#[error("Unknown {field} '{value}'")]
pub struct ParseFieldError {
    field: &'static str,
    value: String,
}

/// Status of a task or subtask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Done,
    Review,
    Deferred,
    Cancelled,
}

impl TaskStatus {
    /// Returns true if this status represents completion
    pub fn is_complete(&self) -> bool {
        matches!(self, TaskStatus::Done)
    }

    /// Returns true if this task is currently being worked on
    pub fn is_active(&self) -> bool {
        matches!(self, TaskStatus::InProgress)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Done => "done",
            TaskStatus::Review => "review",
            TaskStatus::Deferred => "deferred",
            TaskStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = ParseFieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(TaskStatus::Pending),
            "in-progress" | "in_progress" => Ok(TaskStatus::InProgress),
            "done" => Ok(TaskStatus::Done),
            "review" => Ok(TaskStatus::Review),
            "deferred" => Ok(TaskStatus::Deferred),
            "cancelled" => Ok(TaskStatus::Cancelled),
            _ => Err(ParseFieldError {
                field: "status",
                value: s.to_string(),
            }),
        }
    }
}

/// Priority of a task or subtask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    /// Numeric weight, higher is more urgent
    pub fn weight(&self) -> u8 {
        match self {
            Priority::High => 3,
            Priority::Medium => 2,
            Priority::Low => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = ParseFieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            _ => Err(ParseFieldError {
                field: "priority",
                value: s.to_string(),
            }),
        }
    }
}

/// Fields not modelled by the engine, carried through load/save untouched
pub type ExtraFields = serde_json::Map<String, serde_json::Value>;

/// A subtask owned by a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subtask {
    /// Local identifier, unique within the parent
    pub id: u32,

    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub status: TaskStatus,

    #[serde(default)]
    pub priority: Priority,

    #[serde(default)]
    pub dependencies: Vec<NodeId>,

    #[serde(flatten)]
    pub extra: ExtraFields,
}

impl Subtask {
    /// Creates a new pending subtask
    pub fn new(id: u32, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            description: String::new(),
            status: TaskStatus::Pending,
            priority: Priority::Medium,
            dependencies: Vec::new(),
            extra: ExtraFields::new(),
        }
    }
}

/// A top-level task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier across the document
    pub id: u32,

    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub status: TaskStatus,

    #[serde(default)]
    pub priority: Priority,

    #[serde(default)]
    pub dependencies: Vec<NodeId>,

    #[serde(default)]
    pub subtasks: Vec<Subtask>,

    #[serde(flatten)]
    pub extra: ExtraFields,
}

impl Task {
    /// Creates a new pending task with the given ID and title
    pub fn new(id: u32, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            description: String::new(),
            status: TaskStatus::Pending,
            priority: Priority::Medium,
            dependencies: Vec::new(),
            subtasks: Vec::new(),
            extra: ExtraFields::new(),
        }
    }

    /// Returns this task's node ID
    pub fn node_id(&self) -> NodeId {
        NodeId::task(self.id)
    }

    /// Finds a subtask by local ID
    pub fn subtask(&self, local: u32) -> Option<&Subtask> {
        self.subtasks.iter().find(|s| s.id == local)
    }

    /// Finds a subtask by local ID for mutation
    pub fn subtask_mut(&mut self, local: u32) -> Option<&mut Subtask> {
        self.subtasks.iter_mut().find(|s| s.id == local)
    }

    /// Returns the next free local subtask ID
    pub fn next_subtask_id(&self) -> u32 {
        self.subtasks.iter().map(|s| s.id).max().unwrap_or(0) + 1
    }

    /// Iterates over the node IDs of this task's subtasks
    pub fn subtask_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.subtasks
            .iter()
            .map(move |s| NodeId::subtask(self.id, s.id))
    }
}

/// Input for creating a task or subtask
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub priority: Priority,
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// The persisted task document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TasksDocument {
    #[serde(default)]
    pub tasks: Vec<Task>,

    #[serde(flatten)]
    pub extra: ExtraFields,
}
