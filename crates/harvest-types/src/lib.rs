//! Shared data types for the harvest planner.
//!
//! This crate contains pure data structures with no planning logic: grid
//! geometry, resource identities, the world snapshot the planner reads, and
//! the command/feedback protocol spoken with the actuator.

pub mod actuator;
pub mod position;
pub mod resource;
pub mod snapshot;

#[cfg(any(test, feature = "test-fixtures"))]
pub mod fixtures;

pub use actuator::{Command, CommandBatch, Feedback, TurnObservation, UnitTemplate, UnitView};
pub use position::{Direction, Position};
pub use resource::{Cargo, ResourceAmounts, ResourceId, ResourceKind, UnitId};
pub use snapshot::{
    AgentSnapshot, MapExtent, ResourceSnapshot, SnapshotError, TownHallSnapshot, WorldSnapshot,
};
