//! Dependency graph for tasks and subtasks
//!
//! Derived from the declared dependency lists in a [`TaskStore`]. Edges point
//! from a node to each of its dependencies. Uses petgraph for storage and
//! strongly-connected-component analysis; reachability and witness-cycle
//! searches are explicit depth-first walks with a per-call visited set so
//! each query is O(V+E).

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::{BTreeSet, HashMap};

use super::id::NodeId;
use super::store::TaskStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// A dependency graph over task and subtask nodes
#[derive(Debug, Default)]
pub struct DependencyGraph {
    /// The underlying directed graph
    graph: DiGraph<NodeId, ()>,

    /// Map from NodeId to node index
    node_map: HashMap<NodeId, NodeIndex>,
}

impl DependencyGraph {
    /// Creates an empty dependency graph
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            node_map: HashMap::new(),
        }
    }

    /// Builds a graph over every node in the store
    pub fn from_store(store: &TaskStore) -> Self {
        Self::from_store_where(store, |_| true)
    }

    /// Builds a graph over the nodes accepted by `include`
    ///
    /// Dangling references, self references and edges leaving the included
    /// set are not represented; the validator reports those separately.
    pub fn from_store_where(store: &TaskStore, include: impl Fn(&NodeId) -> bool) -> Self {
        let mut graph = Self::new();

        // First pass: add all nodes
        let ids: Vec<NodeId> = store.node_ids().into_iter().filter(|id| include(id)).collect();
        for id in &ids {
            graph.add_node(*id);
        }

        // Second pass: add all edges
        for id in &ids {
            if let Ok(deps) = store.dependencies_of(*id) {
                for dep in deps {
                    graph.add_edge(*id, *dep);
                }
            }
        }

        graph
    }

    /// Adds a node to the graph
    pub fn add_node(&mut self, id: NodeId) {
        if !self.node_map.contains_key(&id) {
            let idx = self.graph.add_node(id);
            self.node_map.insert(id, idx);
        }
    }

    /// Adds `from -> to` if both nodes are present. Self-loops are ignored.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId) -> bool {
        if from == to {
            return false;
        }

        match (self.node_map.get(&from), self.node_map.get(&to)) {
            (Some(&from_idx), Some(&to_idx)) => {
                if self.graph.find_edge(from_idx, to_idx).is_none() {
                    self.graph.add_edge(from_idx, to_idx, ());
                }
                true
            }
            _ => false,
        }
    }

    /// Removes a dependency edge
    pub fn remove_edge(&mut self, from: NodeId, to: NodeId) -> bool {
        let (Some(&from_idx), Some(&to_idx)) = (self.node_map.get(&from), self.node_map.get(&to))
        else {
            return false;
        };

        if let Some(edge) = self.graph.find_edge(from_idx, to_idx) {
            self.graph.remove_edge(edge);
            true
        } else {
            false
        }
    }

    /// Returns true if the graph contains the node
    pub fn contains(&self, id: NodeId) -> bool {
        self.node_map.contains_key(&id)
    }

    /// Returns the number of nodes in the graph
    pub fn len(&self) -> usize {
        self.node_map.len()
    }

    /// Returns true if the graph is empty
    pub fn is_empty(&self) -> bool {
        self.node_map.is_empty()
    }

    /// Returns the direct dependencies of a node, sorted
    pub fn dependencies(&self, id: NodeId) -> Vec<NodeId> {
        self.neighbors_sorted(id, Direction::Outgoing)
    }

    /// Returns the nodes that depend directly on `id`, sorted
    pub fn dependents(&self, id: NodeId) -> Vec<NodeId> {
        self.neighbors_sorted(id, Direction::Incoming)
    }

    fn neighbors_sorted(&self, id: NodeId, dir: Direction) -> Vec<NodeId> {
        let Some(&idx) = self.node_map.get(&id) else {
            return vec![];
        };

        let mut ids: Vec<NodeId> = self
            .graph
            .neighbors_directed(idx, dir)
            .map(|n| self.graph[n])
            .collect();
        ids.sort();
        ids
    }

    /// Returns true if adding `from -> to` would close a cycle through `from`
    pub fn would_create_cycle(&self, from: NodeId, to: NodeId) -> bool {
        self.cycle_if_added(from, to).is_some()
    }

    /// Evaluates the candidate edge `from -> to` against the current graph
    ///
    /// Walks depth-first from `to` along dependency edges. If the walk reaches
    /// `from`, the returned path is the cycle the edge would close, starting
    /// and ending at `from`.
    pub fn cycle_if_added(&self, from: NodeId, to: NodeId) -> Option<Vec<NodeId>> {
        if from == to {
            return Some(vec![from, to]);
        }

        let start = *self.node_map.get(&to)?;
        let target = *self.node_map.get(&from)?;

        let mut visited = vec![false; self.graph.node_count()];
        let mut came_from: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        let mut stack = vec![start];
        visited[start.index()] = true;

        while let Some(idx) = stack.pop() {
            if idx == target {
                let mut path = vec![self.graph[idx]];
                let mut cursor = idx;
                while let Some(&prev) = came_from.get(&cursor) {
                    path.push(self.graph[prev]);
                    cursor = prev;
                }
                path.push(from);
                path.reverse();
                return Some(path);
            }

            for next in self.graph.neighbors(idx) {
                if !visited[next.index()] {
                    visited[next.index()] = true;
                    came_from.insert(next, idx);
                    stack.push(next);
                }
            }
        }

        None
    }

    /// Finds one cycle passing through `id`, as a path from `id` back to itself
    ///
    /// White/gray/black marking: a gray neighbor equal to the start closes the
    /// cycle; black nodes are fully explored and cannot reach the start.
    pub fn find_cycle_containing(&self, id: NodeId) -> Option<Vec<NodeId>> {
        let start = *self.node_map.get(&id)?;

        let mut colors = vec![Color::White; self.graph.node_count()];
        colors[start.index()] = Color::Gray;
        let mut stack: Vec<(NodeIndex, Vec<NodeIndex>)> = vec![(start, self.successors(start))];

        while let Some(frame) = stack.last_mut() {
            let current = frame.0;
            match frame.1.pop() {
                Some(next) if next == start => {
                    let mut cycle: Vec<NodeId> =
                        stack.iter().map(|(idx, _)| self.graph[*idx]).collect();
                    cycle.push(id);
                    return Some(cycle);
                }
                Some(next) => {
                    if colors[next.index()] == Color::White {
                        colors[next.index()] = Color::Gray;
                        stack.push((next, self.successors(next)));
                    }
                }
                None => {
                    colors[current.index()] = Color::Black;
                    stack.pop();
                }
            }
        }

        None
    }

    /// Successors in declaration order, reversed so `pop` yields the first
    fn successors(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut next: Vec<NodeIndex> = self.graph.neighbors(idx).collect();
        next.sort_by_key(|n| std::cmp::Reverse(self.graph[*n]));
        next
    }

    /// Every node that belongs to a cycle
    pub fn cyclic_nodes(&self) -> BTreeSet<NodeId> {
        tarjan_scc(&self.graph)
            .into_iter()
            .filter(|component| component.len() > 1)
            .flatten()
            .map(|idx| self.graph[idx])
            .collect()
    }

    /// Returns true if the graph has no cycles
    pub fn is_acyclic(&self) -> bool {
        !petgraph::algo::is_cyclic_directed(&self.graph)
    }
}
