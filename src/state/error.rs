//! Allocation errors

use crate::graph::{NodeId, TreeId};
use thiserror::Error;

/// Broad class of an allocation failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Stale or invalid node id; refresh state and retry
    Structural,
    /// Not enough points
    Economic,
    /// Blocked by the current shape of the allocation
    Constraint,
    /// No further progression possible
    Terminal,
    /// A persisted record could not be restored
    Snapshot,
}

/// Errors returned by [`crate::TreeState`] operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocationError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Node already allocated: {0}")]
    AlreadyAllocated(NodeId),

    #[error("Node not allocated: {0}")]
    NotAllocated(NodeId),

    #[error("Insufficient points: need {required}, have {available}")]
    InsufficientPoints { required: u32, available: u32 },

    #[error("Requirements not met for node: {0}")]
    RequirementsNotMet(NodeId),

    #[error("Node {node} is excluded by allocated node {by}")]
    Excluded { node: NodeId, by: NodeId },

    #[error("Node {node} is required by allocated node {by}")]
    Required { node: NodeId, by: NodeId },

    #[error("Node {node} is already at max level {max_level}")]
    MaxLevel { node: NodeId, max_level: u32 },

    #[error("Tree mismatch: expected {expected}, found {found}")]
    TreeMismatch { expected: TreeId, found: TreeId },

    #[error("Invalid level {level} for node {node}")]
    InvalidLevel { node: NodeId, level: u32 },

    #[error("Spent points mismatch: recorded {recorded}, computed {computed}")]
    LedgerMismatch { recorded: u32, computed: u32 },

    #[error("Point total overflows: {available} available plus {spent} spent")]
    PointsOverflow { available: u32, spent: u32 },
}

impl AllocationError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NodeNotFound(_) | Self::AlreadyAllocated(_) | Self::NotAllocated(_) => {
                ErrorCategory::Structural
            }
            Self::InsufficientPoints { .. } => ErrorCategory::Economic,
            Self::RequirementsNotMet(_) | Self::Excluded { .. } | Self::Required { .. } => {
                ErrorCategory::Constraint
            }
            Self::MaxLevel { .. } => ErrorCategory::Terminal,
            Self::TreeMismatch { .. }
            | Self::InvalidLevel { .. }
            | Self::LedgerMismatch { .. }
            | Self::PointsOverflow { .. } => ErrorCategory::Snapshot,
        }
    }
}

/// Result type for allocation operations
pub type AllocationResult<T> = Result<T, AllocationError>;
