//! Actuator Protocol
//!
//! What the executor sends to the game each turn, and what the game reports
//! back about the commands it is running.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::position::{Direction, Position};
use crate::resource::{ResourceId, UnitId};

/// Unit templates the production building can train.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitTemplate {
    Peasant,
}

/// A concrete command for one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Walk next to the node, then gather from it
    Gather { node: ResourceId },
    /// Gather from the neighbouring cell in `direction`
    GatherAt { direction: Direction },
    /// Walk next to the town hall, then unload
    Deposit { town_hall: UnitId },
    /// Unload into the neighbouring town hall in `direction`
    DepositAt { direction: Direction },
    /// Train a unit (issued to the production building)
    Produce { template: UnitTemplate },
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Gather { node } => write!(f, "gather node {}", node),
            Command::GatherAt { direction } => write!(f, "gather {}", direction),
            Command::Deposit { town_hall } => write!(f, "deposit at {}", town_hall),
            Command::DepositAt { direction } => write!(f, "deposit {}", direction),
            Command::Produce { template } => write!(f, "produce {:?}", template),
        }
    }
}

/// Progress of a unit's last command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feedback {
    Pending,
    Completed,
    Failed,
}

impl Feedback {
    /// True once the command stopped running, successfully or not.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Feedback::Pending)
    }
}

/// A friendly worker as observed this turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitView {
    pub id: UnitId,
    pub position: Position,
}

impl UnitView {
    pub fn new(id: u64, x: i32, y: i32) -> Self {
        Self {
            id: UnitId(id),
            position: Position::new(x, y),
        }
    }
}

/// Everything the executor learns at the start of a turn.
///
/// Feedback reported at turn `t` describes commands issued before `t`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnObservation {
    pub turn: u64,
    #[serde(default)]
    pub feedback: BTreeMap<UnitId, Feedback>,
    /// Units that died since the previous turn
    #[serde(default)]
    pub died: Vec<UnitId>,
    /// Living friendly workers
    #[serde(default)]
    pub agents: Vec<UnitView>,
}

impl TurnObservation {
    pub fn new(turn: u64) -> Self {
        Self {
            turn,
            ..Self::default()
        }
    }

    pub fn with_agents(mut self, agents: impl IntoIterator<Item = UnitView>) -> Self {
        self.agents.extend(agents);
        self
    }

    pub fn with_feedback(mut self, unit: UnitId, feedback: Feedback) -> Self {
        self.feedback.insert(unit, feedback);
        self
    }

    pub fn with_death(mut self, unit: UnitId) -> Self {
        self.died.push(unit);
        self
    }

    pub fn agent(&self, id: UnitId) -> Option<&UnitView> {
        self.agents.iter().find(|a| a.id == id)
    }
}

/// Commands to submit this turn, keyed by unit.
pub type CommandBatch = BTreeMap<UnitId, Command>;
