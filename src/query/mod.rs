//! Diagnostic queries over a skill tree
//!
//! These walk `connections` only. Allocation rules live in
//! [`crate::TreeState`] and never depend on them.

mod path;
mod types;

pub use path::PathQuery;
pub use types::PathResult;
