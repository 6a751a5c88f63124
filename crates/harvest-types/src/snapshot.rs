//! World Snapshot
//!
//! The read-only picture of the economy handed to the planner: map extents,
//! the production building, friendly workers, resource nodes, what is already
//! banked, and the goal thresholds.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::position::Position;
use crate::resource::{Cargo, ResourceAmounts, ResourceId, ResourceKind, UnitId};

/// Errors raised while loading or validating a snapshot.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("IO error reading snapshot: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error in snapshot: {0}")]
    Json(#[from] serde_json::Error),
    #[error("two resource nodes share cell {0}")]
    DuplicateResourceCell(Position),
    #[error("unit id {0} appears more than once")]
    DuplicateUnit(UnitId),
    #[error("resource id {0} appears more than once")]
    DuplicateResource(ResourceId),
}

/// Map extents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapExtent {
    pub width: i32,
    pub height: i32,
}

/// The production building (town hall).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TownHallSnapshot {
    pub id: UnitId,
    pub position: Position,
    /// Total supply the building provides
    pub food_capacity: u32,
}

/// A friendly worker unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub id: UnitId,
    pub position: Position,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cargo: Option<Cargo>,
}

impl AgentSnapshot {
    pub fn idle(id: u64, x: i32, y: i32) -> Self {
        Self {
            id: UnitId(id),
            position: Position::new(x, y),
            cargo: None,
        }
    }
}

/// A harvestable resource node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    pub id: ResourceId,
    pub kind: ResourceKind,
    pub position: Position,
    pub amount: u32,
}

impl ResourceSnapshot {
    pub fn new(id: u64, kind: ResourceKind, x: i32, y: i32, amount: u32) -> Self {
        Self {
            id: ResourceId(id),
            kind,
            position: Position::new(x, y),
            amount,
        }
    }
}

/// Complete planner input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub map: MapExtent,
    pub town_hall: TownHallSnapshot,
    #[serde(default)]
    pub agents: Vec<AgentSnapshot>,
    #[serde(default)]
    pub resources: Vec<ResourceSnapshot>,
    /// Resources already banked at the town hall
    #[serde(default)]
    pub stockpile: ResourceAmounts,
    /// Target banked amounts
    pub goal: ResourceAmounts,
}

impl WorldSnapshot {
    /// Loads and validates a snapshot from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&content)
    }

    /// Parses and validates a snapshot from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let snapshot: WorldSnapshot = serde_json::from_str(json)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    pub fn to_json_pretty(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Rejects snapshots with ambiguous identities or overlapping nodes.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        let mut units = HashSet::new();
        units.insert(self.town_hall.id);
        for agent in &self.agents {
            if !units.insert(agent.id) {
                return Err(SnapshotError::DuplicateUnit(agent.id));
            }
        }

        let mut cells = HashSet::new();
        let mut ids = HashSet::new();
        for resource in &self.resources {
            if !ids.insert(resource.id) {
                return Err(SnapshotError::DuplicateResource(resource.id));
            }
            if !cells.insert(resource.position) {
                return Err(SnapshotError::DuplicateResourceCell(resource.position));
            }
        }
        Ok(())
    }

    /// Goal amounts not yet covered by the stockpile.
    pub fn remaining_goal(&self) -> ResourceAmounts {
        self.goal.remaining_after(&self.stockpile)
    }

    /// Agents in ascending unit id order, the order plan ordinals follow.
    pub fn agents_by_id(&self) -> Vec<&AgentSnapshot> {
        let mut agents: Vec<&AgentSnapshot> = self.agents.iter().collect();
        agents.sort_by_key(|a| a.id);
        agents
    }

    pub fn with_goal(mut self, goal: ResourceAmounts) -> Self {
        self.goal = goal;
        self
    }
}
