//! BuildAgent: the town hall trains one more worker from banked gold.

use serde::{Deserialize, Serialize};

use harvest_types::{Position, UnitId};

use super::GroundedAction;
use crate::search::PlanError;
use crate::state::WorldState;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildAgent {
    pub town_hall: UnitId,
    /// Where the new worker appears
    pub at: Position,
}

impl BuildAgent {
    pub fn new(town_hall: UnitId, at: Position) -> Self {
        Self { town_hall, at }
    }

    pub fn preconditions_met(&self, state: &WorldState) -> bool {
        let economy = &state.context().economy;
        economy.allow_build
            && state.food_available() > 0
            && state.gold_banked() >= economy.build_cost
    }

    pub fn apply(&self, state: &WorldState) -> Result<WorldState, PlanError> {
        let mut next = state.derive();
        if !self.preconditions_met(state) || !next.spend_on_training(state.context().economy.build_cost) {
            return Err(PlanError::ContractViolation {
                action: GroundedAction::BuildAgent(self.clone()).to_string(),
                reason: format!(
                    "needs food and {} banked gold, have food {} and gold {}",
                    state.context().economy.build_cost,
                    state.food_available(),
                    state.gold_banked()
                ),
            });
        }
        next.add_agent(self.at);
        Ok(next.finish(GroundedAction::BuildAgent(self.clone()), 0.0))
    }
}
