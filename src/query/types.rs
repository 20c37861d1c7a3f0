//! Query result structures

use crate::graph::NodeId;

/// Result of a path query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathResult {
    /// Whether a path was found
    pub found: bool,
    /// Node ids from source to target (inclusive)
    pub path: Vec<NodeId>,
    /// Path length (number of hops)
    pub length: usize,
}

impl PathResult {
    pub fn not_found() -> Self {
        Self {
            found: false,
            path: Vec::new(),
            length: 0,
        }
    }

    pub fn found(path: Vec<NodeId>) -> Self {
        let length = path.len().saturating_sub(1);
        Self {
            found: true,
            path,
            length,
        }
    }
}
