//! Dependency validation
//!
//! Walks the store and its dependency graph and reports every defect:
//! references that do not resolve, nodes that depend on themselves, and
//! nodes that sit on a cycle.

use serde::Serialize;
use std::fmt;
use tracing::{debug, warn};

use super::graph::DependencyGraph;
use super::id::NodeId;
use super::store::TaskStore;

/// Which nodes to validate and what a dependency may reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Every node; dependencies may reference any node in the document
    All,
    /// The subtasks of one parent; dependencies must stay among siblings
    SiblingsOf(u32),
}

/// Category of a dependency defect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    Missing,
    #[serde(rename = "self")]
    SelfDependency,
    Circular,
}

/// A single dependency defect
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Issue {
    /// `node` depends on `dependency`, which does not resolve
    Missing { node: NodeId, dependency: NodeId },

    /// `node` lists itself as a dependency
    #[serde(rename = "self")]
    SelfDependency { node: NodeId },

    /// `node` is part of a cycle; `cycle` is one witness path back to it
    Circular { node: NodeId, cycle: Vec<NodeId> },
}

impl Issue {
    pub fn kind(&self) -> IssueKind {
        match self {
            Issue::Missing { .. } => IssueKind::Missing,
            Issue::SelfDependency { .. } => IssueKind::SelfDependency,
            Issue::Circular { .. } => IssueKind::Circular,
        }
    }

    /// The node that declares the defective dependency
    pub fn node(&self) -> NodeId {
        match self {
            Issue::Missing { node, .. }
            | Issue::SelfDependency { node }
            | Issue::Circular { node, .. } => *node,
        }
    }

    /// Returns true if the repair engine may remove the offending edge
    pub fn is_auto_fixable(&self) -> bool {
        !matches!(self, Issue::Circular { .. })
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Issue::Missing { node, dependency } => {
                write!(f, "{} depends on missing {}", node, dependency)
            }
            Issue::SelfDependency { node } => write!(f, "{} depends on itself", node),
            Issue::Circular { node, cycle } => {
                let path: Vec<String> = cycle.iter().map(|id| id.to_string()).collect();
                write!(f, "{} is part of a cycle: {}", node, path.join(" -> "))
            }
        }
    }
}

/// Validates the dependencies of every node in `scope`
///
/// Each member of a cycle gets its own [`Issue::Circular`] entry, so a
/// three-node cycle yields three issues.
pub fn validate(store: &TaskStore, scope: Scope) -> Vec<Issue> {
    let (nodes, graph) = match scope {
        Scope::All => (store.node_ids(), DependencyGraph::from_store(store)),
        Scope::SiblingsOf(parent) => {
            let Some(task) = store.task(parent) else {
                warn!(parent, "cannot validate siblings of missing task");
                return Vec::new();
            };
            let nodes: Vec<NodeId> = task.subtask_ids().collect();
            let graph = DependencyGraph::from_store_where(store, |id| id.parent() == Some(parent));
            (nodes, graph)
        }
    };

    let resolves = |dep: &NodeId| match scope {
        Scope::All => store.exists(*dep),
        Scope::SiblingsOf(parent) => dep.parent() == Some(parent) && store.exists(*dep),
    };

    let cyclic = graph.cyclic_nodes();
    let mut issues = Vec::new();

    for node in nodes {
        let Ok(deps) = store.dependencies_of(node) else {
            continue;
        };

        for dep in deps {
            if *dep == node {
                issues.push(Issue::SelfDependency { node });
            } else if !resolves(dep) {
                issues.push(Issue::Missing {
                    node,
                    dependency: *dep,
                });
            }
        }

        if cyclic.contains(&node) {
            // Members of a multi-node SCC always lie on a cycle through themselves
            let cycle = graph.find_cycle_containing(node).unwrap_or_default();
            debug_assert!(!cycle.is_empty(), "no witness cycle for {}", node);
            issues.push(Issue::Circular { node, cycle });
        }
    }

    debug!(?scope, issues = issues.len(), "validation finished");
    issues
}

/// Returns true if the whole document has no dependency defects
pub fn is_valid(store: &TaskStore) -> bool {
    validate(store, Scope::All).is_empty()
}
