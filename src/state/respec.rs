//! Respec pricing configuration

use crate::graph::Node;
use serde::{Deserialize, Serialize};

/// Surcharges added on top of point refunds when pricing a respec
///
/// The all-zero default prices a respec at exactly the points refunded.
/// Only prices are computed here; charging currency is the caller's job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RespecConfig {
    /// Added once per deallocated node
    pub base_cost_per_node: u32,
    /// Added per level above 1 of each deallocated node
    pub cost_per_node_level: u32,
    /// Flat fee for a full reset
    pub reset_cost_base: u32,
}

impl RespecConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_cost_per_node(mut self, cost: u32) -> Self {
        self.base_cost_per_node = cost;
        self
    }

    pub fn with_cost_per_node_level(mut self, cost: u32) -> Self {
        self.cost_per_node_level = cost;
        self
    }

    pub fn with_reset_cost_base(mut self, cost: u32) -> Self {
        self.reset_cost_base = cost;
        self
    }

    /// Price of deallocating `node` from `level`, saturating at `u32::MAX`
    pub fn node_price(&self, node: &Node, level: u32) -> u32 {
        self.checked_node_price(node, level).unwrap_or(u32::MAX)
    }

    fn checked_node_price(&self, node: &Node, level: u32) -> Option<u32> {
        level
            .saturating_sub(1)
            .checked_mul(self.cost_per_node_level)?
            .checked_add(self.base_cost_per_node)?
            .checked_add(node.checked_points_at_level(level)?)
    }
}
