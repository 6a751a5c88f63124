//! Deposit: a group of carriers walks to the town hall and unloads.

use serde::{Deserialize, Serialize};

use harvest_types::{Position, UnitId};

use super::{select_participants, GroundedAction};
use crate::search::PlanError;
use crate::state::{Agent, AgentOrdinal, WorldState};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deposit {
    pub town_hall: UnitId,
    /// Cell the carriers are gathered around
    pub source: Position,
    /// Town hall cell
    pub dropoff: Position,
    pub group_size: u32,
    #[serde(default)]
    pub participants: Vec<AgentOrdinal>,
}

impl Deposit {
    pub fn new(source: Position, town_hall: UnitId, dropoff: Position, group_size: u32) -> Self {
        Self {
            town_hall,
            source,
            dropoff,
            group_size,
            participants: Vec::new(),
        }
    }

    fn qualifies(&self, agent: &Agent) -> bool {
        agent.is_carrying() && agent.position.is_adjacent(&self.source)
    }

    pub fn preconditions_met(&self, state: &WorldState) -> bool {
        self.group_size > 0
            && state.agents().filter(|a| self.qualifies(a)).count() >= self.group_size as usize
    }

    pub fn apply(&self, state: &WorldState) -> Result<WorldState, PlanError> {
        let participants = select_participants(state, self.group_size, |a| self.qualifies(a));
        if participants.len() < self.group_size as usize {
            return Err(PlanError::ContractViolation {
                action: GroundedAction::Deposit(self.clone()).to_string(),
                reason: format!(
                    "needs {} carriers near {}, found {}",
                    self.group_size,
                    self.source,
                    participants.len()
                ),
            });
        }

        let mut next = state.derive();
        let mut step_cost = 0.0f64;
        for ordinal in &participants {
            let Some(agent) = next.agent_mut(*ordinal) else {
                continue;
            };
            step_cost = step_cost.max(agent.position.euclidean_distance(&self.dropoff));
            agent.position = self.dropoff;
            if let Some(cargo) = agent.cargo.take() {
                next.bank(cargo);
            }
        }

        let grounded = GroundedAction::Deposit(Deposit {
            participants,
            ..self.clone()
        });
        Ok(next.finish(grounded, step_cost))
    }
}
