//! Node representation in the skill tree

use crate::effect::NodeEffect;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Unique identifier for a node within a tree
///
/// Serializes as a plain string (e.g. "str_notable_1")
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Create a NodeId from a string
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Node classification
///
/// Affects presentation and weight only; allocation mechanics are identical
/// for every kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Small connective node along a route
    #[default]
    Path,
    /// Larger node with a distinctive bonus
    Notable,
    /// Build-defining node, usually exclusive with other keystones
    Keystone,
    /// Node that grants an active skill
    Skill,
    /// Branch capstone
    Mastery,
}

/// Typed property values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Array(Vec<PropertyValue>),
    Object(HashMap<String, PropertyValue>),
}

/// Properties collection
pub type Properties = HashMap<String, PropertyValue>;

/// A vertex in the skill tree
///
/// Nodes are value objects. The three edge lists are distinct:
/// `connections` drive traversal only, `requirements` gate allocation with
/// OR semantics, and `exclusions` forbid co-allocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier within the tree
    pub id: NodeId,
    /// Display name
    pub name: String,
    /// Display description
    #[serde(default)]
    pub description: String,
    /// Classification
    #[serde(default)]
    pub kind: NodeKind,
    /// Branch tag (matches a `Branch::id`)
    #[serde(default)]
    pub branch: String,
    /// Points to allocate at level 1
    #[serde(default)]
    pub cost: u32,
    /// 0 means the node is not leveled and stays at level 1
    #[serde(default)]
    pub max_level: u32,
    /// Points per level beyond 1
    #[serde(default)]
    pub level_cost: u32,
    /// Adjacency for traversal (no gameplay constraint)
    #[serde(default)]
    pub connections: Vec<NodeId>,
    /// Any one of these allocated permits allocation; empty = no prerequisite
    #[serde(default)]
    pub requirements: Vec<NodeId>,
    /// None of these may be allocated alongside this node
    #[serde(default)]
    pub exclusions: Vec<NodeId>,
    /// Effects granted at every level without an override
    #[serde(default)]
    pub effects: Vec<NodeEffect>,
    /// Per-level effect overrides
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub level_effects: BTreeMap<u32, Vec<NodeEffect>>,
}

impl Node {
    /// Create a new node with zero cost and no edges
    pub fn new(id: impl Into<NodeId>, name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            kind,
            branch: String::new(),
            cost: 0,
            max_level: 0,
            level_cost: 0,
            connections: Vec::new(),
            requirements: Vec::new(),
            exclusions: Vec::new(),
            effects: Vec::new(),
            level_effects: BTreeMap::new(),
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the branch tag
    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    /// Set the level-1 allocation cost
    pub fn with_cost(mut self, cost: u32) -> Self {
        self.cost = cost;
        self
    }

    /// Make this a leveled node
    pub fn with_levels(mut self, max_level: u32, level_cost: u32) -> Self {
        self.max_level = max_level;
        self.level_cost = level_cost;
        self
    }

    /// Add a traversal edge
    pub fn connect_to(mut self, id: impl Into<NodeId>) -> Self {
        self.connections.push(id.into());
        self
    }

    /// Add a prerequisite (OR semantics with the other prerequisites)
    pub fn requires(mut self, id: impl Into<NodeId>) -> Self {
        self.requirements.push(id.into());
        self
    }

    /// Add a mutually exclusive node
    pub fn excludes(mut self, id: impl Into<NodeId>) -> Self {
        self.exclusions.push(id.into());
        self
    }

    /// Add a base effect
    pub fn with_effect(mut self, effect: NodeEffect) -> Self {
        self.effects.push(effect);
        self
    }

    /// Register the effects granted at a specific level
    pub fn with_level_effects(mut self, level: u32, effects: Vec<NodeEffect>) -> Self {
        self.level_effects.insert(level, effects);
        self
    }

    /// Whether the node can be leveled past 1
    pub fn is_leveled(&self) -> bool {
        self.max_level > 0
    }

    /// Highest level the node can reach once allocated
    pub fn level_cap(&self) -> u32 {
        if self.is_leveled() {
            self.max_level
        } else {
            1
        }
    }

    /// Effects granted at `level`, falling back to the base effects
    pub fn effects_at_level(&self, level: u32) -> &[NodeEffect] {
        self.level_effects
            .get(&level)
            .map(|e| e.as_slice())
            .unwrap_or(&self.effects)
    }

    /// Total points spent on this node when allocated at `level`
    ///
    /// This is also the refund for deallocating it at that level. Saturates
    /// at `u32::MAX`; see `checked_points_at_level`.
    pub fn points_at_level(&self, level: u32) -> u32 {
        self.checked_points_at_level(level).unwrap_or(u32::MAX)
    }

    /// Like `points_at_level`, but None when the total overflows `u32`
    pub fn checked_points_at_level(&self, level: u32) -> Option<u32> {
        level
            .saturating_sub(1)
            .checked_mul(self.level_cost)?
            .checked_add(self.cost)
    }
}
