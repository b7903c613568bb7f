//! taskmap - dependency-graph integrity for hierarchical task lists
//!
//! Tracks tasks, their subtasks and the dependency edges between them. The
//! domain layer keeps the edge set acyclic, reports and repairs broken
//! references, and selects the next eligible unit of work. Storage and the
//! CLI are thin layers around it.

pub mod domain;
pub mod storage;
pub mod cli;

pub use domain::{NodeId, Task, TaskStatus, TaskStore};
