//! Shared fixtures for integration tests
//!
//! Trees built here mirror the shapes the allocation rules care about:
//! OR-requirements, mutual exclusion, leveled nodes and circular prerequisites.

#![allow(dead_code)]

use async_trait::async_trait;
use skilltree::{
    EffectContext, EffectError, EffectTarget, ModifierType, Node, NodeEffect, NodeId, NodeKind,
    Tree, TreeState,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub fn id(s: &str) -> NodeId {
    NodeId::from(s)
}

/// start(0) -> node_a(1), node_b(1) -> node_c(2, requires a OR b),
/// two mutually exclusive keystones, a leveled node and a circular pair.
pub fn scenario_tree() -> Tree {
    let mut tree = Tree::new("passive", "Passive Tree");
    tree.add_node(
        Node::new("start", "Start", NodeKind::Path)
            .connect_to("node_a")
            .connect_to("node_b"),
    );
    tree.add_node(
        Node::new("node_a", "Node A", NodeKind::Path)
            .with_cost(1)
            .requires("start")
            .connect_to("node_c"),
    );
    tree.add_node(
        Node::new("node_b", "Node B", NodeKind::Path)
            .with_cost(1)
            .requires("start")
            .connect_to("node_c"),
    );
    tree.add_node(
        Node::new("node_c", "Node C", NodeKind::Notable)
            .with_cost(2)
            .requires("node_a")
            .requires("node_b"),
    );
    tree.add_node(
        Node::new("keystone_1", "Keystone One", NodeKind::Keystone)
            .with_cost(1)
            .excludes("keystone_2"),
    );
    tree.add_node(
        Node::new("keystone_2", "Keystone Two", NodeKind::Keystone)
            .with_cost(1)
            .excludes("keystone_1"),
    );
    tree.add_node(
        Node::new("leveled", "Leveled", NodeKind::Notable)
            .with_cost(1)
            .with_levels(3, 1)
            .requires("start"),
    );
    tree.add_node(Node::new("loop_a", "Loop A", NodeKind::Mastery).requires("loop_b"));
    tree.add_node(Node::new("loop_b", "Loop B", NodeKind::Mastery).requires("loop_a"));
    tree.set_start_nodes([id("start")]);
    tree
}

pub fn scenario_state(points: u32) -> TreeState {
    let state = TreeState::new(Arc::new(scenario_tree()));
    state.add_points(points);
    state
}

/// Wide tree for randomized and concurrent tests: one root, `branches`
/// chains of `depth` leveled nodes each, and one keystone per chain that
/// excludes the keystone of the next chain.
pub fn wide_tree(branches: usize, depth: usize) -> Tree {
    let mut tree = Tree::new("wide", "Wide Tree");
    tree.add_node(Node::new("root", "Root", NodeKind::Path));
    for b in 0..branches {
        let mut previous = "root".to_string();
        for d in 0..depth {
            let name = format!("b{b}_n{d}");
            tree.add_node(
                Node::new(name.as_str(), name.as_str(), NodeKind::Path)
                    .with_branch(format!("branch_{b}"))
                    .with_cost(1 + (d as u32 % 2))
                    .with_levels(if d % 3 == 0 { 3 } else { 0 }, 1)
                    .requires(previous.as_str())
                    .requires(format!("b{}_n{d}", (b + 1) % branches)),
            );
            previous = name;
        }
        tree.add_node(
            Node::new(format!("b{b}_keystone"), "Keystone", NodeKind::Keystone)
                .with_cost(2)
                .requires(previous.as_str())
                .excludes(format!("b{}_keystone", (b + 1) % branches)),
        );
    }
    tree.set_start_nodes([id("root")]);
    tree
}

/// Sum of points_at_level over the allocation map
pub fn expected_spent(state: &TreeState) -> u32 {
    state
        .allocated_nodes()
        .iter()
        .map(|(node, level)| state.tree().get_node(node).unwrap().points_at_level(*level))
        .sum()
}

/// Assert every ledger invariant
pub fn assert_invariants(state: &TreeState) {
    let allocated = state.allocated_nodes();
    for (node_id, level) in &allocated {
        let node = state.tree().get_node(node_id).expect("allocated node exists");
        assert!(*level >= 1 && *level <= node.level_cap(), "{node_id} at level {level}");
        if !node.requirements.is_empty() {
            assert!(
                node.requirements.iter().any(|r| allocated.contains_key(r)),
                "{node_id} lost all requirements"
            );
        }
        for ex in &node.exclusions {
            assert!(!allocated.contains_key(ex), "{node_id} allocated alongside {ex}");
        }
    }
    assert_eq!(state.spent_points(), expected_spent(state));
}

/// Entity attribute store that records every modifier by source
#[derive(Default)]
pub struct FakeEntities {
    /// (entity, source, attribute) -> value
    pub modifiers: Mutex<HashMap<(String, String, String), f64>>,
    pub skills: Mutex<Vec<(String, String)>>,
    pub log: Mutex<Vec<String>>,
    /// Fail any call touching this attribute or skill id
    pub fail_on: Mutex<Option<String>>,
}

impl FakeEntities {
    pub fn failing_on(name: &str) -> Self {
        let fake = Self::default();
        *fake.fail_on.lock().unwrap() = Some(name.to_string());
        fake
    }

    fn check(&self, name: &str) -> Result<(), EffectError> {
        if self.fail_on.lock().unwrap().as_deref() == Some(name) {
            return Err(EffectError::Rejected(format!("{name} is locked")));
        }
        Ok(())
    }

    pub fn modifier_count(&self) -> usize {
        self.modifiers.lock().unwrap().len()
    }

    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

#[async_trait]
impl EffectTarget for FakeEntities {
    async fn add_attribute_modifier(
        &self,
        ctx: &EffectContext,
        attribute: &str,
        _modifier: ModifierType,
        value: f64,
    ) -> Result<(), EffectError> {
        self.check(attribute)?;
        self.modifiers.lock().unwrap().insert(
            (ctx.entity_id.clone(), ctx.source(), attribute.to_string()),
            value,
        );
        self.log.lock().unwrap().push(format!("+{}", ctx.node_id));
        Ok(())
    }

    async fn remove_attribute_modifier(
        &self,
        ctx: &EffectContext,
        attribute: &str,
        _modifier: ModifierType,
        _value: f64,
    ) -> Result<(), EffectError> {
        self.modifiers.lock().unwrap().remove(&(
            ctx.entity_id.clone(),
            ctx.source(),
            attribute.to_string(),
        ));
        self.log.lock().unwrap().push(format!("-{}", ctx.node_id));
        Ok(())
    }

    async fn grant_skill(&self, ctx: &EffectContext, skill_id: &str) -> Result<(), EffectError> {
        self.check(skill_id)?;
        self.skills
            .lock()
            .unwrap()
            .push((ctx.entity_id.clone(), skill_id.to_string()));
        self.log.lock().unwrap().push(format!("+{}", ctx.node_id));
        Ok(())
    }

    async fn revoke_skill(&self, ctx: &EffectContext, skill_id: &str) -> Result<(), EffectError> {
        self.skills
            .lock()
            .unwrap()
            .retain(|(entity, skill)| !(entity == &ctx.entity_id && skill == skill_id));
        self.log.lock().unwrap().push(format!("-{}", ctx.node_id));
        Ok(())
    }

    async fn add_passive(
        &self,
        _ctx: &EffectContext,
        passive_id: &str,
        _value: f64,
    ) -> Result<(), EffectError> {
        self.check(passive_id)
    }

    async fn remove_passive(&self, _ctx: &EffectContext, _passive_id: &str) -> Result<(), EffectError> {
        Ok(())
    }

    async fn add_skill_modifier(
        &self,
        _ctx: &EffectContext,
        skill_id: &str,
        _property: &str,
        _value: f64,
    ) -> Result<(), EffectError> {
        self.check(skill_id)
    }

    async fn remove_skill_modifier(
        &self,
        _ctx: &EffectContext,
        _skill_id: &str,
        _property: &str,
        _value: f64,
    ) -> Result<(), EffectError> {
        Ok(())
    }

    async fn apply_special(
        &self,
        _ctx: &EffectContext,
        handler: &str,
        _effect: &NodeEffect,
    ) -> Result<(), EffectError> {
        self.check(handler)
    }

    async fn remove_special(
        &self,
        _ctx: &EffectContext,
        _handler: &str,
        _effect: &NodeEffect,
    ) -> Result<(), EffectError> {
        Ok(())
    }
}
