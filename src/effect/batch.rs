//! Applying a snapshot of active effects with rollback on failure
//!
//! A batch runs effects in order. When one fails, every effect the batch
//! already processed is reverted in reverse order before the error is
//! returned, so the target ends where it started unless a revert itself
//! fails (counted in `rollback_failures`).

use super::target::{EffectContext, EffectError, EffectTarget};
use super::types::NodeEffect;
use crate::graph::{NodeId, TreeId};
use thiserror::Error;
use tracing::{debug, warn};

/// One effect granted by an allocated node
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveEffect {
    pub tree_id: TreeId,
    pub node_id: NodeId,
    /// Level the node is allocated at
    pub level: u32,
    /// Position within the node's effect list for that level
    pub index: usize,
    pub effect: NodeEffect,
}

impl ActiveEffect {
    /// Build the context for applying this effect to `entity_id`
    pub fn context(&self, entity_id: &str) -> EffectContext {
        EffectContext::new(entity_id, self.tree_id.clone(), self.node_id.clone(), self.level)
    }
}

/// Direction of a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectOperation {
    Apply,
    Remove,
}

impl EffectOperation {
    fn inverse(self) -> Self {
        match self {
            Self::Apply => Self::Remove,
            Self::Remove => Self::Apply,
        }
    }

    async fn run(
        self,
        effect: &NodeEffect,
        ctx: &EffectContext,
        target: &dyn EffectTarget,
    ) -> Result<(), EffectError> {
        match self {
            Self::Apply => effect.apply(ctx, target).await,
            Self::Remove => effect.remove(ctx, target).await,
        }
    }
}

impl std::fmt::Display for EffectOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Apply => write!(f, "apply"),
            Self::Remove => write!(f, "remove"),
        }
    }
}

/// A batch stopped on a failing effect
#[derive(Debug, Error)]
#[error("failed to {operation} effect {index} of node {node_id}: {source}")]
pub struct EffectApplyError {
    pub operation: EffectOperation,
    pub node_id: NodeId,
    pub index: usize,
    #[source]
    pub source: EffectError,
    /// Effects successfully reverted
    pub rolled_back: usize,
    /// Effects whose revert also failed
    pub rollback_failures: usize,
}

/// Run `operation` for every effect, reverting on the first failure.
///
/// Returns the number of effects processed.
pub async fn run_batch(
    operation: EffectOperation,
    entity_id: &str,
    effects: &[ActiveEffect],
    target: &dyn EffectTarget,
) -> Result<usize, EffectApplyError> {
    for (position, active) in effects.iter().enumerate() {
        let ctx = active.context(entity_id);
        let Err(source) = operation.run(&active.effect, &ctx, target).await else {
            continue;
        };

        let mut rolled_back = 0;
        let mut rollback_failures = 0;
        for done in effects[..position].iter().rev() {
            let ctx = done.context(entity_id);
            match operation.inverse().run(&done.effect, &ctx, target).await {
                Ok(()) => rolled_back += 1,
                Err(error) => {
                    warn!(
                        entity = %entity_id,
                        node = %done.node_id,
                        index = done.index,
                        kind = done.effect.kind.name(),
                        %error,
                        "Effect rollback failed"
                    );
                    rollback_failures += 1;
                }
            }
        }

        return Err(EffectApplyError {
            operation,
            node_id: active.node_id.clone(),
            index: active.index,
            source,
            rolled_back,
            rollback_failures,
        });
    }

    debug!(entity = %entity_id, %operation, count = effects.len(), "Effects processed");
    Ok(effects.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::{EffectKind, ModifierType};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records calls; fails any call naming `fail_on`
    struct RecordingTarget {
        calls: Mutex<Vec<String>>,
        fail_on: Option<String>,
        fail_rollback: bool,
    }

    impl RecordingTarget {
        fn new(fail_on: Option<&str>) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail_on: fail_on.map(String::from),
                fail_rollback: false,
            }
        }

        fn record(&self, call: String, name: &str, removal: bool) -> Result<(), EffectError> {
            if self.fail_on.as_deref() == Some(name) && !removal {
                return Err(EffectError::Rejected(name.to_string()));
            }
            if removal && self.fail_rollback {
                return Err(EffectError::Internal("rollback".into()));
            }
            self.calls.lock().unwrap().push(call);
            Ok(())
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl EffectTarget for RecordingTarget {
        async fn add_attribute_modifier(
            &self,
            ctx: &EffectContext,
            attribute: &str,
            _modifier: ModifierType,
            value: f64,
        ) -> Result<(), EffectError> {
            self.record(format!("+attr {} {} {}", ctx.source(), attribute, value), attribute, false)
        }

        async fn remove_attribute_modifier(
            &self,
            ctx: &EffectContext,
            attribute: &str,
            _modifier: ModifierType,
            _value: f64,
        ) -> Result<(), EffectError> {
            self.record(format!("-attr {} {}", ctx.source(), attribute), attribute, true)
        }

        async fn grant_skill(&self, ctx: &EffectContext, skill_id: &str) -> Result<(), EffectError> {
            self.record(format!("+skill {} {}", ctx.entity_id, skill_id), skill_id, false)
        }

        async fn revoke_skill(&self, ctx: &EffectContext, skill_id: &str) -> Result<(), EffectError> {
            self.record(format!("-skill {} {}", ctx.entity_id, skill_id), skill_id, true)
        }

        async fn add_passive(
            &self,
            _ctx: &EffectContext,
            passive_id: &str,
            _value: f64,
        ) -> Result<(), EffectError> {
            self.record(format!("+passive {}", passive_id), passive_id, false)
        }

        async fn remove_passive(&self, _ctx: &EffectContext, passive_id: &str) -> Result<(), EffectError> {
            self.record(format!("-passive {}", passive_id), passive_id, true)
        }

        async fn add_skill_modifier(
            &self,
            _ctx: &EffectContext,
            skill_id: &str,
            property: &str,
            _value: f64,
        ) -> Result<(), EffectError> {
            self.record(format!("+mod {} {}", skill_id, property), property, false)
        }

        async fn remove_skill_modifier(
            &self,
            _ctx: &EffectContext,
            skill_id: &str,
            property: &str,
            _value: f64,
        ) -> Result<(), EffectError> {
            self.record(format!("-mod {} {}", skill_id, property), property, true)
        }
    }

    fn active(node: &str, index: usize, kind: EffectKind) -> ActiveEffect {
        ActiveEffect {
            tree_id: TreeId::from("t"),
            node_id: NodeId::from(node),
            level: 1,
            index,
            effect: NodeEffect::new(kind, 5.0),
        }
    }

    fn batch() -> Vec<ActiveEffect> {
        vec![
            active("a", 0, EffectKind::attribute("strength", ModifierType::Flat)),
            active("b", 0, EffectKind::grant_skill("cleave")),
            active("c", 0, EffectKind::passive("iron_will")),
        ]
    }

    #[tokio::test]
    async fn apply_runs_every_effect_in_order() {
        let target = RecordingTarget::new(None);
        let applied = run_batch(EffectOperation::Apply, "hero", &batch(), &target).await.unwrap();

        assert_eq!(applied, 3);
        assert_eq!(
            target.calls(),
            vec!["+attr t:a strength 5", "+skill hero cleave", "+passive iron_will"]
        );
    }

    #[tokio::test]
    async fn failed_apply_reverts_prior_effects() {
        let target = RecordingTarget::new(Some("iron_will"));
        let err = run_batch(EffectOperation::Apply, "hero", &batch(), &target)
            .await
            .unwrap_err();

        assert_eq!(err.node_id.as_str(), "c");
        assert_eq!(err.rolled_back, 2);
        assert_eq!(err.rollback_failures, 0);
        assert_eq!(err.source, EffectError::Rejected("iron_will".into()));
        assert_eq!(
            target.calls(),
            vec![
                "+attr t:a strength 5",
                "+skill hero cleave",
                "-skill hero cleave",
                "-attr t:a strength",
            ]
        );
    }

    #[tokio::test]
    async fn failed_remove_reapplies_prior_effects() {
        let target = RecordingTarget::new(None);
        let effects = vec![
            active("a", 0, EffectKind::skill_modifier("cleave", "radius")),
            active("b", 0, EffectKind::special("vaal_pact")),
        ];

        let err = run_batch(EffectOperation::Remove, "hero", &effects, &target)
            .await
            .unwrap_err();

        assert_eq!(err.operation, EffectOperation::Remove);
        assert!(matches!(err.source, EffectError::Unsupported(_)));
        assert_eq!(err.rolled_back, 1);
        assert_eq!(target.calls(), vec!["-mod cleave radius", "+mod cleave radius"]);
    }

    #[tokio::test]
    async fn rollback_failures_are_counted() {
        let mut target = RecordingTarget::new(Some("iron_will"));
        target.fail_rollback = true;

        let err = run_batch(EffectOperation::Apply, "hero", &batch(), &target)
            .await
            .unwrap_err();

        assert_eq!(err.rolled_back, 0);
        assert_eq!(err.rollback_failures, 2);
    }
}
