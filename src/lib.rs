//! Skilltree: Skill-Tree Allocation Engine
//!
//! A shared, immutable graph of unlockable nodes plus a per-character
//! allocation ledger enforcing prerequisites, exclusions, leveling and the
//! point economy.
//!
//! # Core Concepts
//!
//! - **Trees**: Immutable graphs of nodes, shared by every character
//! - **Nodes**: Vertices with a point cost, optional levels, and three edge
//!   kinds (connections for traversal, OR-requirements, exclusions)
//! - **Tree states**: Per-character ledgers mutated through atomic
//!   allocate / level up / deallocate / reset operations
//! - **Effects**: Data granted by allocated nodes, applied to entities
//!   through a caller-supplied [`EffectTarget`]
//!
//! # Example
//!
//! ```
//! use skilltree::{Node, NodeKind, SkillTreeEngine, Tree, TreeId};
//!
//! let mut tree = Tree::new("passive", "Passive Tree");
//! tree.add_node(Node::new("start", "Start", NodeKind::Path));
//! tree.add_node(Node::new("might", "Might", NodeKind::Notable).with_cost(1).requires("start"));
//!
//! let engine = SkillTreeEngine::new();
//! engine.register_tree(tree);
//!
//! let state = engine.create_state("hero", &TreeId::from("passive")).unwrap();
//! state.add_points(1);
//! state.allocate_node(&"start".into()).unwrap();
//! state.allocate_node(&"might".into()).unwrap();
//! assert_eq!(state.spent_points(), 1);
//! ```

pub mod effect;
mod engine;
mod graph;
pub mod query;
mod state;

pub use effect::{
    ActiveEffect, EffectApplyError, EffectContext, EffectError, EffectKind, EffectTarget,
    ModifierType, NodeEffect,
};
pub use engine::{EngineError, EngineResult, SkillTreeEngine};
pub use graph::{
    Branch, DanglingReference, Node, NodeId, NodeKind, Properties, PropertyValue, ReferenceKind,
    Tree, TreeId,
};
pub use query::{PathQuery, PathResult};
pub use state::{
    AllocationError, AllocationResult, ErrorCategory, RespecConfig, TreeData, TreeState,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
