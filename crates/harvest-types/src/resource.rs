//! Resource and Unit Identities
//!
//! Resource kinds, carried loads, and the identities the actuator assigns to
//! units and resource nodes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of harvestable resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Gold,
    Wood,
}

impl ResourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Gold => "gold",
            ResourceKind::Wood => "wood",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Actuator-assigned identity of a unit (worker or building).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(pub u64);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Actuator-assigned identity of a resource node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(pub u64);

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A load carried by a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Cargo {
    pub kind: ResourceKind,
    pub amount: u32,
}

impl Cargo {
    pub fn new(kind: ResourceKind, amount: u32) -> Self {
        Self { kind, amount }
    }
}

/// Per-kind amounts, used for goals and stockpiles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceAmounts {
    pub gold: u32,
    pub wood: u32,
}

impl ResourceAmounts {
    pub fn new(gold: u32, wood: u32) -> Self {
        Self { gold, wood }
    }

    pub fn get(&self, kind: ResourceKind) -> u32 {
        match kind {
            ResourceKind::Gold => self.gold,
            ResourceKind::Wood => self.wood,
        }
    }

    /// Amounts still missing from `stock` to reach `self`.
    pub fn remaining_after(&self, stock: &ResourceAmounts) -> ResourceAmounts {
        ResourceAmounts {
            gold: self.gold.saturating_sub(stock.gold),
            wood: self.wood.saturating_sub(stock.wood),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.gold == 0 && self.wood == 0
    }
}
