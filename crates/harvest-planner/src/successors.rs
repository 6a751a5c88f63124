//! Successor Generation
//!
//! Enumerates every grounded action applicable in a state and the states
//! they lead to. Harvests are proposed from each distinct cell holding idle
//! workers to each node of a still-needed kind, deposits from each distinct
//! cell holding carriers, both for every group size up to the worker count.
//! One training candidate is added when building is enabled.

use std::collections::BTreeSet;

use harvest_types::Position;

use crate::actions::GroundedAction;
use crate::search::PlanError;
use crate::state::WorldState;

/// All candidate actions for `state`, before precondition filtering.
pub fn candidate_actions(state: &WorldState) -> Vec<GroundedAction> {
    let context = state.context();
    let max_group = u32::try_from(state.agent_count()).unwrap_or(u32::MAX);

    let idle_cells: BTreeSet<Position> = state
        .agents()
        .filter(|a| !a.is_carrying())
        .map(|a| a.position)
        .collect();
    let carrier_cells: BTreeSet<Position> = state
        .agents()
        .filter(|a| a.is_carrying())
        .map(|a| a.position)
        .collect();

    let mut candidates = Vec::new();

    for source in &idle_cells {
        for node in state.resources().filter(|n| state.required(n.kind) > 0) {
            for k in 1..=max_group {
                candidates.push(GroundedAction::harvest(*source, node, k));
            }
        }
    }

    for source in &carrier_cells {
        for k in 1..=max_group {
            candidates.push(GroundedAction::deposit(
                *source,
                context.town_hall,
                context.town_hall_position,
                k,
            ));
        }
    }

    if context.economy.allow_build {
        candidates.push(GroundedAction::build_agent(
            context.town_hall,
            context.town_hall_position,
        ));
    }

    candidates
}

/// Applies every candidate whose preconditions hold.
pub fn generate_successors(state: &WorldState) -> Result<Vec<WorldState>, PlanError> {
    candidate_actions(state)
        .into_iter()
        .filter(|action| action.preconditions_met(state))
        .map(|action| action.apply(state))
        .collect()
}
