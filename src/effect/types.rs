//! Effect payloads granted by allocated nodes

use super::target::{EffectContext, EffectError, EffectTarget};
use crate::graph::{Properties, PropertyValue};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How an attribute modifier combines with others
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierType {
    /// Added to the base value
    #[default]
    Flat,
    /// Summed with other increases, then applied once
    Increased,
    /// Multiplied independently
    More,
}

/// What an effect does, with the payload each kind needs
///
/// Adding a variant forces every match over effects to handle it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EffectKind {
    /// Modify an entity attribute
    Attribute {
        attribute: String,
        #[serde(default)]
        modifier: ModifierType,
    },
    /// Grant an active skill
    GrantSkill { skill_id: String },
    /// Enable a passive ability
    Passive { passive_id: String },
    /// Modify a property of a skill
    SkillModifier { skill_id: String, property: String },
    /// Handled by a named game-specific handler
    Special { handler: String },
}

impl EffectKind {
    pub fn attribute(attribute: impl Into<String>, modifier: ModifierType) -> Self {
        Self::Attribute {
            attribute: attribute.into(),
            modifier,
        }
    }

    pub fn grant_skill(skill_id: impl Into<String>) -> Self {
        Self::GrantSkill {
            skill_id: skill_id.into(),
        }
    }

    pub fn passive(passive_id: impl Into<String>) -> Self {
        Self::Passive {
            passive_id: passive_id.into(),
        }
    }

    pub fn skill_modifier(skill_id: impl Into<String>, property: impl Into<String>) -> Self {
        Self::SkillModifier {
            skill_id: skill_id.into(),
            property: property.into(),
        }
    }

    pub fn special(handler: impl Into<String>) -> Self {
        Self::Special {
            handler: handler.into(),
        }
    }

    /// Stable name of the variant
    pub fn name(&self) -> &'static str {
        match self {
            Self::Attribute { .. } => "attribute",
            Self::GrantSkill { .. } => "grant_skill",
            Self::Passive { .. } => "passive",
            Self::SkillModifier { .. } => "skill_modifier",
            Self::Special { .. } => "special",
        }
    }
}

/// An effect a node grants while allocated
///
/// The engine never inspects an effect beyond its kind; applying it is
/// delegated to an [`EffectTarget`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeEffect {
    pub kind: EffectKind,
    #[serde(default)]
    pub value: f64,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: Properties,
}

impl NodeEffect {
    pub fn new(kind: EffectKind, value: f64) -> Self {
        Self {
            kind,
            value,
            description: String::new(),
            metadata: HashMap::new(),
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Add a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: PropertyValue) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn kind(&self) -> &EffectKind {
        &self.kind
    }

    /// Grant this effect to the entity in `ctx`
    pub async fn apply(
        &self,
        ctx: &EffectContext,
        target: &dyn EffectTarget,
    ) -> Result<(), EffectError> {
        match &self.kind {
            EffectKind::Attribute {
                attribute,
                modifier,
            } => {
                target
                    .add_attribute_modifier(ctx, attribute, *modifier, self.value)
                    .await
            }
            EffectKind::GrantSkill { skill_id } => target.grant_skill(ctx, skill_id).await,
            EffectKind::Passive { passive_id } => {
                target.add_passive(ctx, passive_id, self.value).await
            }
            EffectKind::SkillModifier { skill_id, property } => {
                target
                    .add_skill_modifier(ctx, skill_id, property, self.value)
                    .await
            }
            EffectKind::Special { handler } => target.apply_special(ctx, handler, self).await,
        }
    }

    /// Withdraw this effect from the entity in `ctx`
    pub async fn remove(
        &self,
        ctx: &EffectContext,
        target: &dyn EffectTarget,
    ) -> Result<(), EffectError> {
        match &self.kind {
            EffectKind::Attribute {
                attribute,
                modifier,
            } => {
                target
                    .remove_attribute_modifier(ctx, attribute, *modifier, self.value)
                    .await
            }
            EffectKind::GrantSkill { skill_id } => target.revoke_skill(ctx, skill_id).await,
            EffectKind::Passive { passive_id } => target.remove_passive(ctx, passive_id).await,
            EffectKind::SkillModifier { skill_id, property } => {
                target
                    .remove_skill_modifier(ctx, skill_id, property, self.value)
                    .await
            }
            EffectKind::Special { handler } => target.remove_special(ctx, handler, self).await,
        }
    }
}
