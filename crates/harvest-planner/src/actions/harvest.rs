//! Harvest: a group of idle workers walks to a resource node and each picks
//! up one harvest unit.

use serde::{Deserialize, Serialize};

use harvest_types::{Cargo, Position, ResourceId, ResourceKind};

use super::{select_participants, GroundedAction};
use crate::search::PlanError;
use crate::state::{Agent, AgentOrdinal, ResourceNode, WorldState};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Harvest {
    pub kind: ResourceKind,
    /// Cell the group gathers around
    pub source: Position,
    /// Cell of the resource node
    pub target: Position,
    pub node: ResourceId,
    pub group_size: u32,
    #[serde(default)]
    pub participants: Vec<AgentOrdinal>,
}

impl Harvest {
    pub fn new(source: Position, node: &ResourceNode, group_size: u32) -> Self {
        Self {
            kind: node.kind,
            source,
            target: node.position,
            node: node.id,
            group_size,
            participants: Vec::new(),
        }
    }

    fn qualifies(&self, agent: &Agent) -> bool {
        !agent.is_carrying() && agent.position.is_adjacent(&self.source)
    }

    fn yield_required(&self, state: &WorldState) -> u32 {
        self.group_size
            .saturating_mul(state.context().economy.harvest_unit)
    }

    pub fn preconditions_met(&self, state: &WorldState) -> bool {
        if self.group_size == 0 {
            return false;
        }
        let Some(node) = state.resource_at(&self.target) else {
            return false;
        };
        if node.kind != self.kind || node.id != self.node {
            return false;
        }
        if node.amount < self.yield_required(state) {
            return false;
        }
        let idle_nearby = state.agents().filter(|a| self.qualifies(a)).count();
        idle_nearby >= self.group_size as usize
    }

    pub fn apply(&self, state: &WorldState) -> Result<WorldState, PlanError> {
        let participants = select_participants(state, self.group_size, |a| self.qualifies(a));
        if participants.len() < self.group_size as usize {
            return Err(PlanError::ContractViolation {
                action: self.to_action().to_string(),
                reason: format!(
                    "needs {} idle workers near {}, found {}",
                    self.group_size,
                    self.source,
                    participants.len()
                ),
            });
        }

        let unit = state.context().economy.harvest_unit;
        let mut next = state.derive();

        let node = next
            .resource_mut(&self.target)
            .filter(|n| n.amount >= self.yield_required(state))
            .ok_or_else(|| PlanError::ContractViolation {
                action: self.to_action().to_string(),
                reason: format!("node {} cannot yield {}", self.node, self.yield_required(state)),
            })?;
        node.amount -= self.yield_required(state);

        let mut step_cost = 0.0f64;
        for ordinal in &participants {
            if let Some(agent) = next.agent_mut(*ordinal) {
                step_cost = step_cost.max(agent.position.euclidean_distance(&self.target));
                agent.position = self.target;
                agent.cargo = Some(Cargo::new(self.kind, unit));
            }
        }

        let grounded = GroundedAction::Harvest(Harvest {
            participants,
            ..self.clone()
        });
        Ok(next.finish(grounded, step_cost))
    }

    fn to_action(&self) -> GroundedAction {
        GroundedAction::Harvest(self.clone())
    }
}
