//! Path finding over tree connections

use super::types::PathResult;
use crate::graph::{NodeId, Tree};
use std::collections::{HashMap, HashSet, VecDeque};

/// Query for finding a route between two nodes
///
/// Connections are directed and followed forward only. Requirements and
/// exclusions are never consulted.
#[derive(Debug, Clone)]
pub struct PathQuery {
    /// Source node ID
    pub source: NodeId,
    /// Target node ID
    pub target: NodeId,
    /// Maximum number of hops (unbounded when None)
    pub max_length: Option<usize>,
}

impl PathQuery {
    /// Create a new path query between two nodes
    pub fn between(source: NodeId, target: NodeId) -> Self {
        Self {
            source,
            target,
            max_length: None,
        }
    }

    /// Set maximum path length
    pub fn max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }

    /// Execute the query (BFS, so the path found is a shortest one)
    ///
    /// The target counts as found the moment it is dequeued; the search
    /// fails once the frontier empties.
    pub fn execute(&self, tree: &Tree) -> PathResult {
        let mut visited: HashSet<&NodeId> = HashSet::new();
        let mut queue: VecDeque<(&NodeId, usize)> = VecDeque::new();
        let mut predecessors: HashMap<&NodeId, &NodeId> = HashMap::new();

        visited.insert(&self.source);
        queue.push_back((&self.source, 0));

        while let Some((current, depth)) = queue.pop_front() {
            if current == &self.target {
                return PathResult::found(Self::reconstruct(current, &predecessors));
            }

            if self.max_length.is_some_and(|max| depth >= max) {
                continue;
            }

            let Some(node) = tree.get_node(current) else {
                continue;
            };

            for neighbor in &node.connections {
                if visited.insert(neighbor) {
                    predecessors.insert(neighbor, current);
                    queue.push_back((neighbor, depth + 1));
                }
            }
        }

        PathResult::not_found()
    }

    /// Walk predecessors back from the target
    fn reconstruct(target: &NodeId, predecessors: &HashMap<&NodeId, &NodeId>) -> Vec<NodeId> {
        let mut path = vec![target.clone()];
        let mut current = target;
        while let Some(pred) = predecessors.get(current) {
            path.push((*pred).clone());
            current = *pred;
        }
        path.reverse();
        path
    }
}
