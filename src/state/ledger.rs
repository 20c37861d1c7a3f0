//! TreeState: the per-character allocation ledger
//!
//! Every mutation takes the write lock, validates completely, then commits.
//! A failed call leaves the ledger untouched. After each call:
//! - every level lies in `1..=level_cap`
//! - every allocated node with requirements has one of them allocated
//! - no allocated node has an allocated exclusion (checked both ways)
//! - `spent_points` is the sum of `points_at_level` over allocated nodes
//! - `available_points + spent_points` fits in a `u32`, so refunds are exact

use super::data::TreeData;
use super::error::{AllocationError, AllocationResult};
use super::respec::RespecConfig;
use crate::effect::{run_batch, ActiveEffect, EffectApplyError, EffectOperation, EffectTarget, NodeEffect};
use crate::graph::{Node, NodeId, Tree, TreeId};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, warn};

/// The mutable part of a TreeState
#[derive(Debug, Clone, Default)]
struct Ledger {
    allocated: BTreeMap<NodeId, u32>,
    available_points: u32,
    spent_points: u32,
}

impl Ledger {
    fn is_allocated(&self, id: &NodeId) -> bool {
        self.allocated.contains_key(id)
    }

    /// First allocated node that conflicts with allocating `node`
    ///
    /// Looks at `node`'s own exclusions and at allocated nodes excluding it.
    fn exclusion_conflict(&self, tree: &Tree, node: &Node) -> Option<NodeId> {
        if let Some(by) = node.exclusions.iter().find(|ex| self.is_allocated(ex)) {
            return Some(by.clone());
        }
        self.allocated
            .keys()
            .filter(|other| *other != &node.id)
            .find(|other| {
                tree.get_node(other)
                    .is_some_and(|n| n.exclusions.contains(&node.id))
            })
            .cloned()
    }

    fn check_allocate<'t>(&self, tree: &'t Tree, id: &NodeId) -> AllocationResult<&'t Node> {
        let node = tree
            .get_node(id)
            .ok_or_else(|| AllocationError::NodeNotFound(id.clone()))?;

        if self.is_allocated(id) {
            return Err(AllocationError::AlreadyAllocated(id.clone()));
        }

        if self.available_points < node.cost {
            return Err(AllocationError::InsufficientPoints {
                required: node.cost,
                available: self.available_points,
            });
        }

        if !node.requirements.is_empty()
            && !node.requirements.iter().any(|req| self.is_allocated(req))
        {
            return Err(AllocationError::RequirementsNotMet(id.clone()));
        }

        if let Some(by) = self.exclusion_conflict(tree, node) {
            return Err(AllocationError::Excluded {
                node: id.clone(),
                by,
            });
        }

        Ok(node)
    }

    fn check_level_up<'t>(&self, tree: &'t Tree, id: &NodeId) -> AllocationResult<(&'t Node, u32)> {
        let level = *self
            .allocated
            .get(id)
            .ok_or_else(|| AllocationError::NotAllocated(id.clone()))?;

        let node = tree
            .get_node(id)
            .ok_or_else(|| AllocationError::NodeNotFound(id.clone()))?;

        if level >= node.level_cap() {
            return Err(AllocationError::MaxLevel {
                node: id.clone(),
                max_level: node.level_cap(),
            });
        }

        if self.available_points < node.level_cost {
            return Err(AllocationError::InsufficientPoints {
                required: node.level_cost,
                available: self.available_points,
            });
        }

        Ok((node, level))
    }

    /// An allocated node that would lose its last satisfied requirement if
    /// `id` and everything in `leaving` were removed.
    ///
    /// Nodes in `leaving` are neither checked as dependents nor counted as
    /// alternatives.
    fn stranded_dependent(
        &self,
        tree: &Tree,
        id: &NodeId,
        leaving: &HashSet<&NodeId>,
    ) -> Option<NodeId> {
        self.allocated
            .keys()
            .filter(|other| *other != id && !leaving.contains(other))
            .find(|other| {
                let Some(dependent) = tree.get_node(other) else {
                    return false;
                };
                dependent.requirements.contains(id)
                    && !dependent.requirements.iter().any(|req| {
                        req != id && !leaving.contains(req) && self.is_allocated(req)
                    })
            })
            .cloned()
    }

    fn check_deallocate<'t>(
        &self,
        tree: &'t Tree,
        id: &NodeId,
        leaving: &HashSet<&NodeId>,
    ) -> AllocationResult<(&'t Node, u32)> {
        let level = *self
            .allocated
            .get(id)
            .ok_or_else(|| AllocationError::NotAllocated(id.clone()))?;

        let node = tree
            .get_node(id)
            .ok_or_else(|| AllocationError::NodeNotFound(id.clone()))?;

        if let Some(by) = self.stranded_dependent(tree, id, leaving) {
            return Err(AllocationError::Required {
                node: id.clone(),
                by,
            });
        }

        Ok((node, level))
    }

    /// Points held in total; bounded by `u32::MAX`
    fn total_points(&self) -> u32 {
        self.available_points.saturating_add(self.spent_points)
    }

    /// Remove an entry and move its points back; returns the refund
    fn remove(&mut self, node: &Node, level: u32) -> u32 {
        let refund = node.points_at_level(level);
        self.allocated.remove(&node.id);
        self.spent_points -= refund;
        self.available_points = self.available_points.saturating_add(refund);
        refund
    }

    fn respec_price<'a>(
        &self,
        tree: &Tree,
        config: &RespecConfig,
        ids: impl IntoIterator<Item = &'a NodeId>,
    ) -> u32 {
        ids.into_iter()
            .filter_map(|id| {
                let level = *self.allocated.get(id)?;
                let node = tree.get_node(id)?;
                Some(config.node_price(node, level))
            })
            .fold(0, u32::saturating_add)
    }
}

/// Per-character allocation state bound to one tree
///
/// All methods take `&self`; share it behind an `Arc` across threads.
#[derive(Debug)]
pub struct TreeState {
    tree: Arc<Tree>,
    respec: RespecConfig,
    ledger: RwLock<Ledger>,
}

impl TreeState {
    /// Fresh state with nothing allocated and no points
    pub fn new(tree: Arc<Tree>) -> Self {
        Self {
            tree,
            respec: RespecConfig::default(),
            ledger: RwLock::new(Ledger::default()),
        }
    }

    /// Set the respec pricing configuration
    pub fn with_respec_config(mut self, config: RespecConfig) -> Self {
        self.respec = config;
        self
    }

    // A poisoned lock still holds a consistent ledger: mutations only write
    // after validation has passed.
    fn read(&self) -> RwLockReadGuard<'_, Ledger> {
        self.ledger.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Ledger> {
        self.ledger.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn tree_id(&self) -> &TreeId {
        &self.tree.id
    }

    pub fn tree(&self) -> &Arc<Tree> {
        &self.tree
    }

    pub fn respec_config(&self) -> &RespecConfig {
        &self.respec
    }

    pub fn available_points(&self) -> u32 {
        self.read().available_points
    }

    pub fn spent_points(&self) -> u32 {
        self.read().spent_points
    }

    /// Current level of a node, None when unallocated
    pub fn node_level(&self, id: &NodeId) -> Option<u32> {
        self.read().allocated.get(id).copied()
    }

    pub fn is_allocated(&self, id: &NodeId) -> bool {
        self.read().is_allocated(id)
    }

    /// Snapshot of the allocation map
    pub fn allocated_nodes(&self) -> BTreeMap<NodeId, u32> {
        self.read().allocated.clone()
    }

    // --- Mutations ---

    /// Grant points to spend; returns the points actually credited
    ///
    /// Available plus spent points are capped at `u32::MAX`. Anything past
    /// the cap is not credited.
    pub fn add_points(&self, points: u32) -> u32 {
        let mut ledger = self.write();
        let credited = points.min(u32::MAX - ledger.total_points());
        ledger.available_points += credited;
        if credited < points {
            warn!(tree = %self.tree.id, points, credited, "Point cap reached");
        }
        debug!(tree = %self.tree.id, points = credited, available = ledger.available_points, "Points added");
        credited
    }

    /// Allocate a node at level 1
    pub fn allocate_node(&self, id: &NodeId) -> AllocationResult<()> {
        let mut ledger = self.write();
        let node = ledger.check_allocate(&self.tree, id)?;

        ledger.allocated.insert(id.clone(), 1);
        ledger.available_points -= node.cost;
        ledger.spent_points += node.cost;

        debug!(tree = %self.tree.id, node = %id, cost = node.cost, "Node allocated");
        Ok(())
    }

    /// Raise an allocated node one level; returns the new level
    pub fn level_up_node(&self, id: &NodeId) -> AllocationResult<u32> {
        let mut ledger = self.write();
        let (node, level) = ledger.check_level_up(&self.tree, id)?;

        let new_level = level + 1;
        ledger.allocated.insert(id.clone(), new_level);
        ledger.available_points -= node.level_cost;
        ledger.spent_points += node.level_cost;

        debug!(tree = %self.tree.id, node = %id, level = new_level, cost = node.level_cost, "Node leveled up");
        Ok(new_level)
    }

    /// Deallocate a node; returns the points refunded
    ///
    /// Fails with `Required` if another allocated node depends on it and has
    /// no other allocated requirement.
    pub fn deallocate_node(&self, id: &NodeId) -> AllocationResult<u32> {
        let mut ledger = self.write();
        let (node, level) = ledger.check_deallocate(&self.tree, id, &HashSet::new())?;
        let refund = ledger.remove(node, level);

        debug!(tree = %self.tree.id, node = %id, refund, "Node deallocated");
        Ok(refund)
    }

    /// Deallocate several nodes at once; returns the total refund
    ///
    /// Nodes in the batch may depend on each other. Either every node is
    /// removed or, on the first failing check, none is.
    pub fn deallocate_multiple(&self, ids: &[NodeId]) -> AllocationResult<u32> {
        let mut ledger = self.write();

        let mut seen = HashSet::new();
        let batch: Vec<&NodeId> = ids.iter().filter(|id| seen.insert(*id)).collect();

        let mut removals = Vec::with_capacity(batch.len());
        for id in &batch {
            let leaving: HashSet<&NodeId> = batch.iter().copied().filter(|other| other != id).collect();
            removals.push(ledger.check_deallocate(&self.tree, id, &leaving)?);
        }

        let refund: u32 = removals
            .into_iter()
            .map(|(node, level)| ledger.remove(node, level))
            .sum();

        debug!(tree = %self.tree.id, count = batch.len(), refund, "Nodes deallocated");
        Ok(refund)
    }

    /// Deallocate everything; returns the points refunded
    pub fn reset_all(&self) -> u32 {
        let mut ledger = self.write();

        // Equal to the per-node refund sum by the ledger invariant.
        let refund = ledger.spent_points;
        ledger.allocated.clear();
        ledger.spent_points = 0;
        ledger.available_points = ledger.available_points.saturating_add(refund);

        debug!(tree = %self.tree.id, refund, "Tree reset");
        refund
    }

    // --- Pure queries ---

    /// Whether `allocate_node` would currently succeed
    pub fn can_allocate(&self, id: &NodeId) -> bool {
        self.read().check_allocate(&self.tree, id).is_ok()
    }

    /// Whether `deallocate_node` would currently succeed
    pub fn can_deallocate(&self, id: &NodeId) -> bool {
        self.read()
            .check_deallocate(&self.tree, id, &HashSet::new())
            .is_ok()
    }

    /// Whether `level_up_node` would currently succeed
    pub fn can_level_up(&self, id: &NodeId) -> bool {
        self.read().check_level_up(&self.tree, id).is_ok()
    }

    /// Price of deallocating `ids`; unallocated ids cost nothing
    pub fn respec_cost(&self, ids: &[NodeId]) -> u32 {
        let unique: HashSet<&NodeId> = ids.iter().collect();
        self.read().respec_price(&self.tree, &self.respec, unique)
    }

    /// Price of `reset_all`
    pub fn reset_cost(&self) -> u32 {
        let ledger = self.read();
        self.respec
            .reset_cost_base
            .saturating_add(ledger.respec_price(&self.tree, &self.respec, ledger.allocated.keys()))
    }

    // --- Effects ---

    /// Effects of every allocated node at its current level
    ///
    /// Ordered by node id, then by position in the node's effect list.
    pub fn active_effects(&self) -> Vec<NodeEffect> {
        self.active_effect_entries()
            .into_iter()
            .map(|active| active.effect)
            .collect()
    }

    /// Like `active_effects`, tagged with the granting node
    pub fn active_effect_entries(&self) -> Vec<ActiveEffect> {
        let ledger = self.read();
        ledger
            .allocated
            .iter()
            .filter_map(|(id, level)| self.tree.get_node(id).map(|node| (node, *level)))
            .flat_map(|(node, level)| {
                node.effects_at_level(level)
                    .iter()
                    .enumerate()
                    .map(move |(index, effect)| ActiveEffect {
                        tree_id: self.tree.id.clone(),
                        node_id: node.id.clone(),
                        level,
                        index,
                        effect: effect.clone(),
                    })
            })
            .collect()
    }

    /// Apply every active effect to `entity_id`; returns how many were applied
    ///
    /// The effect list is snapshotted and the lock released before any
    /// target call, so allocations made meanwhile are not reflected. On
    /// failure, effects applied by this call are removed again.
    pub async fn apply_effects(
        &self,
        entity_id: &str,
        target: &dyn EffectTarget,
    ) -> Result<usize, EffectApplyError> {
        let effects = self.active_effect_entries();
        run_batch(EffectOperation::Apply, entity_id, &effects, target).await
    }

    /// Remove every active effect from `entity_id`; returns how many were removed
    ///
    /// Same snapshot semantics as `apply_effects`; on failure, effects removed
    /// by this call are applied again.
    pub async fn remove_effects(
        &self,
        entity_id: &str,
        target: &dyn EffectTarget,
    ) -> Result<usize, EffectApplyError> {
        let effects = self.active_effect_entries();
        run_batch(EffectOperation::Remove, entity_id, &effects, target).await
    }

    // --- Persistence ---

    /// Snapshot for storage
    pub fn data(&self) -> TreeData {
        let ledger = self.read();
        TreeData {
            tree_id: self.tree.id.clone(),
            allocated: ledger.allocated.clone(),
            available_points: ledger.available_points,
            spent_points: ledger.spent_points,
        }
    }

    /// Replace the ledger with a stored snapshot
    ///
    /// The snapshot must belong to this tree and satisfy every ledger
    /// invariant; otherwise the state is left unchanged.
    pub fn restore(&self, data: TreeData) -> AllocationResult<()> {
        let restored = Ledger {
            allocated: data.allocated,
            available_points: data.available_points,
            spent_points: data.spent_points,
        };

        if data.tree_id != self.tree.id {
            return Err(AllocationError::TreeMismatch {
                expected: self.tree.id.clone(),
                found: data.tree_id,
            });
        }

        let mut computed: u32 = 0;
        for (id, &level) in &restored.allocated {
            let node = self
                .tree
                .get_node(id)
                .ok_or_else(|| AllocationError::NodeNotFound(id.clone()))?;

            if level == 0 || level > node.level_cap() {
                return Err(AllocationError::InvalidLevel {
                    node: id.clone(),
                    level,
                });
            }

            if !node.requirements.is_empty()
                && !node.requirements.iter().any(|req| restored.is_allocated(req))
            {
                return Err(AllocationError::RequirementsNotMet(id.clone()));
            }

            if let Some(by) = node.exclusions.iter().find(|ex| restored.is_allocated(ex)) {
                return Err(AllocationError::Excluded {
                    node: id.clone(),
                    by: by.clone(),
                });
            }

            let points = node
                .checked_points_at_level(level)
                .ok_or_else(|| AllocationError::InvalidLevel {
                    node: id.clone(),
                    level,
                })?;
            computed = computed
                .checked_add(points)
                .ok_or(AllocationError::LedgerMismatch {
                    recorded: restored.spent_points,
                    computed: u32::MAX,
                })?;
        }

        if computed != restored.spent_points {
            return Err(AllocationError::LedgerMismatch {
                recorded: restored.spent_points,
                computed,
            });
        }

        if restored
            .available_points
            .checked_add(restored.spent_points)
            .is_none()
        {
            return Err(AllocationError::PointsOverflow {
                available: restored.available_points,
                spent: restored.spent_points,
            });
        }

        let count = restored.allocated.len();
        *self.write() = restored;
        debug!(tree = %self.tree.id, nodes = count, "Tree state restored");
        Ok(())
    }
}
