//! Tree: the immutable graph of nodes shared by every character

use super::node::{Node, NodeId};
use crate::query::PathQuery;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Unique identifier for a tree
///
/// Serializes as a plain string (e.g. "passive_tree")
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TreeId(String);

impl TreeId {
    /// Create a TreeId from a string
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TreeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TreeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TreeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A thematic grouping of nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    /// Tag nodes carry in `Node::branch`
    pub id: String,
    /// Display name
    pub name: String,
    /// Member nodes
    #[serde(default)]
    pub nodes: Vec<NodeId>,
}

impl Branch {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            nodes: Vec::new(),
        }
    }

    /// Add a member node
    pub fn with_node(mut self, id: impl Into<NodeId>) -> Self {
        self.nodes.push(id.into());
        self
    }
}

/// Which edge list a dangling reference was found in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    Connection,
    Requirement,
    Exclusion,
    StartNode,
    BranchMember,
}

/// An id referenced somewhere in the tree that names no node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DanglingReference {
    /// Node (or branch id, for branch members) holding the reference
    pub holder: String,
    pub kind: ReferenceKind,
    pub missing: NodeId,
}

/// The full skill graph
///
/// Built once by a loader through `add_node`, `add_branch` and
/// `set_start_nodes`, then shared read-only (typically behind an `Arc`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tree {
    /// Unique identifier
    pub id: TreeId,
    /// Display name
    pub name: String,
    /// Nodes by id
    pub nodes: HashMap<NodeId, Node>,
    /// Thematic groupings
    #[serde(default)]
    pub branches: Vec<Branch>,
    /// Entry points
    #[serde(default)]
    pub start_nodes: Vec<NodeId>,
}

impl Tree {
    /// Create an empty tree
    pub fn new(id: impl Into<TreeId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            nodes: HashMap::new(),
            branches: Vec::new(),
            start_nodes: Vec::new(),
        }
    }

    /// Add a node, replacing any node with the same id
    pub fn add_node(&mut self, node: Node) -> NodeId {
        let id = node.id.clone();
        self.nodes.insert(id.clone(), node);
        id
    }

    /// Add a branch grouping
    pub fn add_branch(&mut self, branch: Branch) {
        self.branches.push(branch);
    }

    /// Replace the entry points
    pub fn set_start_nodes(&mut self, ids: impl IntoIterator<Item = NodeId>) {
        self.start_nodes = ids.into_iter().collect();
    }

    /// Get a node by ID
    pub fn get_node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Get all nodes
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }

    pub fn start_nodes(&self) -> &[NodeId] {
        &self.start_nodes
    }

    /// Nodes tagged with the given branch id
    pub fn nodes_in_branch<'a>(&'a self, branch: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.nodes.values().filter(move |n| n.branch == branch)
    }

    /// Neighbors reachable over one outgoing connection
    ///
    /// Connections naming unknown nodes are skipped.
    pub fn adjacent_nodes(&self, id: &NodeId) -> Vec<&Node> {
        let Some(node) = self.get_node(id) else {
            return Vec::new();
        };
        node.connections
            .iter()
            .filter_map(|c| self.get_node(c))
            .collect()
    }

    /// Whether `to` can be reached from `from` over forward connections
    ///
    /// Diagnostic only; allocation never consults connections.
    pub fn path_exists(&self, from: &NodeId, to: &NodeId) -> bool {
        PathQuery::between(from.clone(), to.clone())
            .execute(self)
            .found
    }

    /// Every id referenced by the tree that names no node
    pub fn dangling_references(&self) -> Vec<DanglingReference> {
        let mut dangling = Vec::new();
        let mut check = |holder: &str, kind: ReferenceKind, ids: &[NodeId]| {
            for id in ids {
                if !self.nodes.contains_key(id) {
                    dangling.push(DanglingReference {
                        holder: holder.to_string(),
                        kind,
                        missing: id.clone(),
                    });
                }
            }
        };

        let mut ids: Vec<&NodeId> = self.nodes.keys().collect();
        ids.sort();
        for id in ids {
            let node = &self.nodes[id];
            check(id.as_str(), ReferenceKind::Connection, &node.connections);
            check(id.as_str(), ReferenceKind::Requirement, &node.requirements);
            check(id.as_str(), ReferenceKind::Exclusion, &node.exclusions);
        }
        check(self.id.as_str(), ReferenceKind::StartNode, &self.start_nodes);
        for branch in &self.branches {
            check(&branch.id, ReferenceKind::BranchMember, &branch.nodes);
        }

        dangling
    }
}
