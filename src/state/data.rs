//! Persistence record for a tree state

use crate::graph::{NodeId, TreeId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Flat snapshot of a ledger, produced by `TreeState::data` and consumed by
/// `TreeState::restore`. Storage is the caller's concern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeData {
    pub tree_id: TreeId,
    /// Allocated node ids and their levels
    #[serde(default)]
    pub allocated: BTreeMap<NodeId, u32>,
    #[serde(default)]
    pub available_points: u32,
    #[serde(default)]
    pub spent_points: u32,
}

impl TreeData {
    /// Empty record for a tree
    pub fn empty(tree_id: TreeId) -> Self {
        Self {
            tree_id,
            allocated: BTreeMap::new(),
            available_points: 0,
            spent_points: 0,
        }
    }
}
