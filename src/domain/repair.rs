//! Dependency mutation and repair
//!
//! [`add_dependency`] and [`remove_dependency`] are the only checked ways to
//! change edges. The repair passes are idempotent and run in a fixed order:
//!
//! 1. [`deduplicate`] collapses each dependency list to a set
//! 2. [`cleanup_containment_edges`] drops a parent's edges on its own subtasks
//! 3. [`ensure_subtask_progress`] keeps every subtree startable
//!
//! [`fix_dependencies`] additionally removes `missing` and `self` edges.
//! Cycles are only ever reported, never broken automatically.

use serde::Serialize;
use std::collections::HashSet;
use thiserror::Error;
use tracing::{info, warn};

use super::error::ErrorKind;
use super::graph::DependencyGraph;
use super::id::NodeId;
use super::store::TaskStore;
use super::validate::{validate, Issue, Scope};

fn format_path(path: &[NodeId]) -> String {
    path.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

#[derive(Debug, Error, PartialEq)]
pub enum DependencyError {
    #[error("Task not found: {0}")]
    NotFound(NodeId),

    #[error("Self-dependency not allowed: {0}")]
    SelfDependency(NodeId),

    #[error("Adding dependency would create a cycle: {}", format_path(.cycle))]
    CircularDependency {
        from: NodeId,
        to: NodeId,
        cycle: Vec<NodeId>,
    },

    #[error("Task {parent} would have no subtask without dependencies")]
    NoIndependentSubtask { node: NodeId, parent: u32 },
}

impl DependencyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DependencyError::NotFound(_) => ErrorKind::NotFound,
            _ => ErrorKind::Validation,
        }
    }
}

/// Outcome of a successful dependency mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyChange {
    Added,
    /// The edge already existed; nothing changed
    AlreadyPresent,
    Removed,
    /// The edge did not exist; nothing changed
    NotPresent,
}

impl DependencyChange {
    /// Returns true if the store was modified
    pub fn is_change(&self) -> bool {
        matches!(self, DependencyChange::Added | DependencyChange::Removed)
    }
}

/// Adds `node -> dependency` after checking every invariant
///
/// Checks run strictly before any mutation: the dependency must resolve, the
/// edge must not be a self-reference and must not close a cycle. On success
/// the node's dependency list is re-sorted into canonical order.
pub fn add_dependency(
    store: &mut TaskStore,
    node: NodeId,
    dependency: NodeId,
) -> Result<DependencyChange, DependencyError> {
    if !store.exists(dependency) {
        return Err(DependencyError::NotFound(dependency));
    }
    let deps = store
        .dependencies_of(node)
        .map_err(|_| DependencyError::NotFound(node))?;

    if node == dependency {
        return Err(DependencyError::SelfDependency(node));
    }

    if deps.contains(&dependency) {
        warn!(%node, %dependency, "dependency already exists");
        return Ok(DependencyChange::AlreadyPresent);
    }

    let graph = DependencyGraph::from_store(store);
    if let Some(cycle) = graph.cycle_if_added(node, dependency) {
        return Err(DependencyError::CircularDependency {
            from: node,
            to: dependency,
            cycle,
        });
    }

    if let NodeId::Subtask { parent, local } = node {
        if deps.is_empty() && !has_other_independent_subtask(store, parent, local) {
            return Err(DependencyError::NoIndependentSubtask { node, parent });
        }
    }

    store
        .add_edge(node, dependency)
        .and_then(|_| store.sort_dependencies(node))
        .map_err(|_| DependencyError::NotFound(node))?;
    info!(%node, %dependency, "dependency added");
    Ok(DependencyChange::Added)
}

fn has_other_independent_subtask(store: &TaskStore, parent: u32, local: u32) -> bool {
    store.task(parent).is_some_and(|task| {
        task.subtasks
            .iter()
            .any(|s| s.id != local && s.dependencies.is_empty())
    })
}

/// Removes `node -> dependency`; absent edges are a warning, not an error
pub fn remove_dependency(
    store: &mut TaskStore,
    node: NodeId,
    dependency: NodeId,
) -> Result<DependencyChange, DependencyError> {
    let removed = store
        .remove_edge(node, dependency)
        .map_err(|_| DependencyError::NotFound(node))?;
    if removed {
        info!(%node, %dependency, "dependency removed");
        Ok(DependencyChange::Removed)
    } else {
        warn!(%node, %dependency, "dependency does not exist");
        Ok(DependencyChange::NotPresent)
    }
}

/// Options controlling the repair passes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepairOptions {
    /// Clear one subtask's dependencies when no subtask is startable
    pub enforce_progress: bool,
}

impl Default for RepairOptions {
    fn default() -> Self {
        Self {
            enforce_progress: true,
        }
    }
}

/// What a repair or fix run changed and what is left
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RepairReport {
    /// Duplicate dependency entries collapsed
    pub duplicates_removed: usize,

    /// Parent-on-own-subtask edges removed
    pub containment_edges_removed: usize,

    /// Subtasks whose dependency list was cleared to keep their parent startable
    pub subtasks_made_independent: Vec<NodeId>,

    /// Defects removed by the auto-fix pass
    pub fixed: Vec<Issue>,

    /// Issues still present after the run
    pub remaining: Vec<Issue>,
}

impl RepairReport {
    /// Returns true if any pass modified the store
    pub fn changed(&self) -> bool {
        self.duplicates_removed > 0
            || self.containment_edges_removed > 0
            || !self.subtasks_made_independent.is_empty()
            || !self.fixed.is_empty()
    }

    /// Returns true if the re-validation found nothing
    pub fn is_clean(&self) -> bool {
        self.remaining.is_empty()
    }
}

/// Collapses each dependency list to a set, keeping first-seen order
pub fn deduplicate(store: &mut TaskStore) -> usize {
    fn dedup(deps: &mut Vec<NodeId>) -> usize {
        let mut seen = HashSet::new();
        let before = deps.len();
        deps.retain(|d| seen.insert(*d));
        before - deps.len()
    }

    let mut removed = 0;
    for task in store.tasks_mut() {
        removed += dedup(&mut task.dependencies);
        for subtask in &mut task.subtasks {
            removed += dedup(&mut subtask.dependencies);
        }
    }

    if removed > 0 {
        info!(removed, "duplicate dependencies removed");
    }
    removed
}

/// Removes dependencies a parent task declares on its own subtasks
pub fn cleanup_containment_edges(store: &mut TaskStore) -> usize {
    let mut removed = 0;
    for task in store.tasks_mut() {
        let parent = task.id;
        let before = task.dependencies.len();
        task.dependencies.retain(|d| d.parent() != Some(parent));
        removed += before - task.dependencies.len();
    }

    if removed > 0 {
        info!(removed, "redundant subtask dependencies removed");
    }
    removed
}

/// Makes sure every parent has at least one subtask with no dependencies
///
/// When none does, the lowest-id subtask that is not on a cycle has its
/// dependency list cleared. Outgoing edges of such a subtask never belong to
/// a cycle, so circular defects survive untouched. A parent whose subtasks
/// are all cycle members is left alone and shows up in re-validation.
pub fn ensure_subtask_progress(store: &mut TaskStore) -> Vec<NodeId> {
    let cyclic = DependencyGraph::from_store(store).cyclic_nodes();

    let mut changed = Vec::new();
    for task in store.tasks_mut() {
        if task.subtasks.is_empty() || task.subtasks.iter().any(|s| s.dependencies.is_empty()) {
            continue;
        }
        let parent = task.id;
        let candidate = task
            .subtasks
            .iter_mut()
            .filter(|s| !cyclic.contains(&NodeId::subtask(parent, s.id)))
            .min_by_key(|s| s.id);

        match candidate {
            Some(subtask) => {
                subtask.dependencies.clear();
                let id = NodeId::subtask(parent, subtask.id);
                warn!(subtask = %id, "cleared dependencies so task {} has a startable subtask", parent);
                changed.push(id);
            }
            None => {
                warn!(task = parent, "every subtask is on a dependency cycle; resolve it manually");
            }
        }
    }
    changed
}

/// Runs the idempotent structural passes and re-validates
pub fn repair(store: &mut TaskStore, options: RepairOptions) -> RepairReport {
    let mut report = RepairReport::default();
    run_passes(store, options, &mut report);
    report.remaining = validate(store, Scope::All);
    report
}

fn run_passes(store: &mut TaskStore, options: RepairOptions, report: &mut RepairReport) {
    report.duplicates_removed += deduplicate(store);
    report.containment_edges_removed += cleanup_containment_edges(store);
    if options.enforce_progress {
        report
            .subtasks_made_independent
            .extend(ensure_subtask_progress(store));
    }
}

/// Removes every `missing` and `self` edge, then runs the structural passes
///
/// Circular issues are left untouched and surface in
/// [`RepairReport::remaining`].
pub fn fix_dependencies(store: &mut TaskStore, options: RepairOptions) -> RepairReport {
    let mut report = RepairReport::default();

    for issue in validate(store, Scope::All) {
        let edge = match &issue {
            Issue::Missing { node, dependency } => (*node, *dependency),
            Issue::SelfDependency { node } => (*node, *node),
            Issue::Circular { node, .. } => {
                warn!(%node, "circular dependency must be resolved manually");
                continue;
            }
        };

        if let Ok(true) = store.remove_edge(edge.0, edge.1) {
            info!(%issue, "fixed");
            report.fixed.push(issue);
        }
    }

    run_passes(store, options, &mut report);
    report.remaining = validate(store, Scope::All);
    report
}
