//! EffectTarget trait: the entity-side contract effects are applied through

use super::types::{ModifierType, NodeEffect};
use crate::graph::{NodeId, TreeId};
use async_trait::async_trait;
use thiserror::Error;

/// Errors reported by an effect target
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EffectError {
    #[error("Entity not found: {0}")]
    EntityNotFound(String),

    #[error("Effect rejected: {0}")]
    Rejected(String),

    #[error("Unsupported effect: {0}")]
    Unsupported(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Who an effect is being applied to, and on whose behalf
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectContext {
    /// Entity receiving the effect
    pub entity_id: String,
    /// Tree the granting node belongs to
    pub tree_id: TreeId,
    /// Node granting the effect
    pub node_id: NodeId,
    /// Level the node was allocated at when the effect was collected
    pub level: u32,
}

impl EffectContext {
    pub fn new(entity_id: impl Into<String>, tree_id: TreeId, node_id: NodeId, level: u32) -> Self {
        Self {
            entity_id: entity_id.into(),
            tree_id,
            node_id,
            level,
        }
    }

    /// Tag identifying modifiers owned by the granting node ("tree:node")
    ///
    /// Targets should key stored modifiers by this so `remove_*` can find them.
    pub fn source(&self) -> String {
        format!("{}:{}", self.tree_id, self.node_id)
    }
}

/// The entity/attribute/skill systems effects mutate.
///
/// Each method pairs with its inverse. Implementations should make every
/// call idempotent: failed batches are rolled back by calling the inverse
/// of each effect already processed.
#[async_trait]
pub trait EffectTarget: Send + Sync {
    async fn add_attribute_modifier(
        &self,
        ctx: &EffectContext,
        attribute: &str,
        modifier: ModifierType,
        value: f64,
    ) -> Result<(), EffectError>;

    async fn remove_attribute_modifier(
        &self,
        ctx: &EffectContext,
        attribute: &str,
        modifier: ModifierType,
        value: f64,
    ) -> Result<(), EffectError>;

    async fn grant_skill(&self, ctx: &EffectContext, skill_id: &str) -> Result<(), EffectError>;

    async fn revoke_skill(&self, ctx: &EffectContext, skill_id: &str) -> Result<(), EffectError>;

    async fn add_passive(
        &self,
        ctx: &EffectContext,
        passive_id: &str,
        value: f64,
    ) -> Result<(), EffectError>;

    async fn remove_passive(&self, ctx: &EffectContext, passive_id: &str) -> Result<(), EffectError>;

    async fn add_skill_modifier(
        &self,
        ctx: &EffectContext,
        skill_id: &str,
        property: &str,
        value: f64,
    ) -> Result<(), EffectError>;

    async fn remove_skill_modifier(
        &self,
        ctx: &EffectContext,
        skill_id: &str,
        property: &str,
        value: f64,
    ) -> Result<(), EffectError>;

    /// Game-specific effects; the default refuses them
    async fn apply_special(
        &self,
        _ctx: &EffectContext,
        handler: &str,
        _effect: &NodeEffect,
    ) -> Result<(), EffectError> {
        Err(EffectError::Unsupported(format!("special handler '{}'", handler)))
    }

    async fn remove_special(
        &self,
        _ctx: &EffectContext,
        handler: &str,
        _effect: &NodeEffect,
    ) -> Result<(), EffectError> {
        Err(EffectError::Unsupported(format!("special handler '{}'", handler)))
    }
}
