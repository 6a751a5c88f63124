//! Plan Artifact
//!
//! The ordered action list a search produces, together with what the
//! executor needs to run it: the ordinal bindings of the initial workers and
//! the town hall it addresses. Plans persist as one action per line
//! (`HarvestGold(10, (6, 5), (9, 5), 1, [1])`) or as JSON.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use uuid::Uuid;

use harvest_types::{Position, UnitId, WorldSnapshot};

use crate::actions::GroundedAction;
use crate::search::{PlanError, SearchOutcome, SearchStats};
use crate::state::{initial_bindings, AgentOrdinal};

/// Errors parsing the text plan format.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanParseError {
    #[error("malformed action: {0}")]
    Malformed(String),
    #[error("unknown action: {0}")]
    UnknownAction(String),
    #[error("{line}: expected {expected} arguments, found {found}")]
    ArgumentCount {
        line: String,
        expected: usize,
        found: usize,
    },
    #[error("invalid number: {0}")]
    InvalidNumber(String),
    #[error("invalid position: {0}")]
    InvalidPosition(String),
    #[error("line {line}: {source}")]
    Line {
        line: usize,
        #[source]
        source: Box<PlanParseError>,
    },
}

/// One initial ordinal to actuator identity binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentBinding {
    pub ordinal: AgentOrdinal,
    pub unit: UnitId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub id: Uuid,
    /// Actions in execution order
    pub steps: Vec<GroundedAction>,
    pub bindings: Vec<AgentBinding>,
    pub town_hall: UnitId,
    pub town_hall_position: Position,
    /// Accumulated cost of the goal state
    pub expected_cost: f64,
    #[serde(default)]
    pub stats: SearchStats,
}

impl Plan {
    pub fn from_outcome(snapshot: &WorldSnapshot, outcome: &SearchOutcome) -> Self {
        Self {
            id: Uuid::new_v4(),
            steps: outcome.goal.history().to_vec(),
            bindings: bindings_of(snapshot),
            town_hall: snapshot.town_hall.id,
            town_hall_position: snapshot.town_hall.position,
            expected_cost: outcome.goal.cost(),
            stats: outcome.stats,
        }
    }

    /// A plan from already-known steps, e.g. ones read back from text.
    pub fn from_steps(snapshot: &WorldSnapshot, steps: Vec<GroundedAction>) -> Self {
        Self {
            id: Uuid::new_v4(),
            steps,
            bindings: bindings_of(snapshot),
            town_hall: snapshot.town_hall.id,
            town_hall_position: snapshot.town_hall.position,
            expected_cost: 0.0,
            stats: SearchStats::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn binding_map(&self) -> BTreeMap<AgentOrdinal, UnitId> {
        self.bindings.iter().map(|b| (b.ordinal, b.unit)).collect()
    }

    /// One action per line, first action first.
    pub fn to_text(&self) -> String {
        let mut text = String::new();
        for step in &self.steps {
            text.push_str(&step.to_string());
            text.push('\n');
        }
        text
    }

    /// Parses the text format. Blank lines and `#` comments are skipped.
    pub fn parse_steps(text: &str) -> Result<Vec<GroundedAction>, PlanParseError> {
        text.lines()
            .enumerate()
            .filter(|(_, line)| {
                let line = line.trim();
                !line.is_empty() && !line.starts_with('#')
            })
            .map(|(i, line)| {
                line.parse().map_err(|e| PlanParseError::Line {
                    line: i + 1,
                    source: Box::new(e),
                })
            })
            .collect()
    }

    /// Writes the text form, creating parent directories as needed.
    pub fn save_text(&self, path: impl AsRef<Path>) -> Result<(), PlanError> {
        write_creating_dirs(path.as_ref(), &self.to_text())
    }

    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<(), PlanError> {
        let json = serde_json::to_string_pretty(self)?;
        write_creating_dirs(path.as_ref(), &json)
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, PlanError> {
        let content = fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn load_text(path: impl AsRef<Path>) -> Result<Vec<GroundedAction>, PlanError> {
        let content = fs::read_to_string(path.as_ref())?;
        Ok(Self::parse_steps(&content)?)
    }
}

fn bindings_of(snapshot: &WorldSnapshot) -> Vec<AgentBinding> {
    initial_bindings(snapshot)
        .into_iter()
        .map(|(ordinal, unit)| AgentBinding { ordinal, unit })
        .collect()
}

fn write_creating_dirs(path: &Path, content: &str) -> Result<(), PlanError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(())
}
