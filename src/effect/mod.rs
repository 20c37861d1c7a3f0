//! Node effects and the boundary to the systems they mutate
//!
//! An effect is plain data ([`NodeEffect`]). Granting or withdrawing it is
//! delegated to an [`EffectTarget`] supplied by the caller; the engine only
//! decides which effects are active and in what order they run.

mod batch;
mod target;
mod types;

pub use batch::{run_batch, ActiveEffect, EffectApplyError, EffectOperation};
pub use target::{EffectContext, EffectError, EffectTarget};
pub use types::{EffectKind, ModifierType, NodeEffect};
