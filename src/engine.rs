//! SkillTreeEngine: registry of trees and per-character states
//!
//! Constructed explicitly and owned by the application; there is no global
//! instance.

use crate::graph::{Tree, TreeId};
use crate::state::{AllocationError, RespecConfig, TreeData, TreeState};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Errors that can occur in engine operations
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Tree not found: {0}")]
    TreeNotFound(TreeId),

    #[error("State already exists for character {character} on tree {tree}")]
    StateExists { character: String, tree: TreeId },

    #[error("No state for character {character} on tree {tree}")]
    StateNotFound { character: String, tree: TreeId },

    #[error(transparent)]
    Allocation(#[from] AllocationError),
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Key for a character's state on one tree
type StateKey = (String, TreeId);

/// Holds loaded trees and the allocation state of each character
#[derive(Debug, Default)]
pub struct SkillTreeEngine {
    trees: DashMap<TreeId, Arc<Tree>>,
    states: DashMap<StateKey, Arc<TreeState>>,
    respec: RespecConfig,
}

impl SkillTreeEngine {
    /// Create an empty engine
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the respec pricing handed to every state created afterwards
    pub fn with_respec_config(mut self, config: RespecConfig) -> Self {
        self.respec = config;
        self
    }

    pub fn respec_config(&self) -> &RespecConfig {
        &self.respec
    }

    /// Register a fully built tree, replacing one with the same id
    ///
    /// States created against a replaced tree keep the old one.
    pub fn register_tree(&self, tree: Tree) -> Arc<Tree> {
        for dangling in tree.dangling_references() {
            warn!(
                tree = %tree.id,
                holder = %dangling.holder,
                kind = ?dangling.kind,
                missing = %dangling.missing,
                "Tree references unknown node"
            );
        }

        let tree = Arc::new(tree);
        info!(tree = %tree.id, nodes = tree.node_count(), "Tree registered");
        self.trees.insert(tree.id.clone(), Arc::clone(&tree));
        tree
    }

    /// Get a tree by ID
    pub fn get_tree(&self, id: &TreeId) -> Option<Arc<Tree>> {
        self.trees.get(id).map(|r| Arc::clone(r.value()))
    }

    /// List all tree IDs
    pub fn list_trees(&self) -> Vec<TreeId> {
        self.trees.iter().map(|r| r.key().clone()).collect()
    }

    /// Create a fresh state for a character on a tree
    pub fn create_state(&self, character: &str, tree_id: &TreeId) -> EngineResult<Arc<TreeState>> {
        let tree = self
            .get_tree(tree_id)
            .ok_or_else(|| EngineError::TreeNotFound(tree_id.clone()))?;

        match self.states.entry((character.to_string(), tree_id.clone())) {
            Entry::Occupied(_) => Err(EngineError::StateExists {
                character: character.to_string(),
                tree: tree_id.clone(),
            }),
            Entry::Vacant(slot) => {
                let state = Arc::new(TreeState::new(tree).with_respec_config(self.respec));
                slot.insert(Arc::clone(&state));
                info!(character, tree = %tree_id, "Tree state created");
                Ok(state)
            }
        }
    }

    /// Get a character's state on a tree
    pub fn get_state(&self, character: &str, tree_id: &TreeId) -> Option<Arc<TreeState>> {
        self.states
            .get(&(character.to_string(), tree_id.clone()))
            .map(|r| Arc::clone(r.value()))
    }

    /// Drop a character's state; returns it if present
    pub fn remove_state(&self, character: &str, tree_id: &TreeId) -> Option<Arc<TreeState>> {
        let removed = self
            .states
            .remove(&(character.to_string(), tree_id.clone()))
            .map(|(_, state)| state);
        if removed.is_some() {
            info!(character, tree = %tree_id, "Tree state removed");
        }
        removed
    }

    /// Rebuild a character's state from a stored record
    ///
    /// Replaces any existing state for that character and tree. The record
    /// is validated before anything is registered.
    pub fn restore_state(&self, character: &str, data: TreeData) -> EngineResult<Arc<TreeState>> {
        let tree_id = data.tree_id.clone();
        let tree = self
            .get_tree(&tree_id)
            .ok_or_else(|| EngineError::TreeNotFound(tree_id.clone()))?;

        let state = Arc::new(TreeState::new(tree).with_respec_config(self.respec));
        state.restore(data)?;
        self.states
            .insert((character.to_string(), tree_id.clone()), Arc::clone(&state));
        info!(character, tree = %tree_id, "Tree state restored");
        Ok(state)
    }

    /// Persistence record for a character's state
    pub fn snapshot_state(&self, character: &str, tree_id: &TreeId) -> EngineResult<TreeData> {
        self.get_state(character, tree_id)
            .map(|state| state.data())
            .ok_or_else(|| EngineError::StateNotFound {
                character: character.to_string(),
                tree: tree_id.clone(),
            })
    }

    /// Get the number of registered states
    pub fn state_count(&self) -> usize {
        self.states.len()
    }
}
