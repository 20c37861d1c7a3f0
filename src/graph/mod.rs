//! Core tree data structures

mod node;
mod tree;


pub use node::{Node, NodeId, NodeKind, Properties, PropertyValue};
pub use tree::{Branch, DanglingReference, ReferenceKind, Tree, TreeId};
