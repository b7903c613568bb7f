//! Domain models for taskmap
//!
//! Contains the dependency-graph engine without any I/O concerns.

mod error;
mod id;
mod task;
mod store;
mod graph;
mod validate;
mod repair;
mod next;

pub use error::ErrorKind;
pub use id::{IdError, NodeId};
pub use task::{ExtraFields, NewTask, ParseFieldError, Priority, Subtask, Task, TaskStatus, TasksDocument};
pub use store::{Node, StoreError, TaskStore};
pub use graph::DependencyGraph;
pub use validate::{is_valid, validate, Issue, IssueKind, Scope};
pub use repair::{
    add_dependency, cleanup_containment_edges, deduplicate, ensure_subtask_progress,
    fix_dependencies, remove_dependency, repair, DependencyChange, DependencyError,
    RepairOptions, RepairReport,
};
pub use next::{find_next, is_eligible, WorkItem};
