//! Remaining-cost estimates.
//!
//! Every delivery that still has to happen ends with a deposit walking at
//! least one worker from a cell where needed cargo can be picked up (or is
//! already carried) to the town hall. That walk costs at least the Chebyshev
//! distance `d` from the hall to the nearest such cell, and a single deposit
//! can carry at most one load per worker the economy can ever field. The
//! delivery-distance estimate multiplies those two bounds and so never
//! overestimates.

use serde::{Deserialize, Serialize};

use crate::state::WorldState;

/// Which estimate the planner orders its frontier with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeuristicKind {
    /// Always 0; the search degrades to uniform-cost
    Zero,
    /// Loads still to deliver, spread over the largest possible workforce,
    /// times the shortest pickup-to-hall distance
    #[default]
    DeliveryDistance,
}

pub fn estimate(state: &WorldState) -> f64 {
    match state.context().heuristic {
        HeuristicKind::Zero => 0.0,
        HeuristicKind::DeliveryDistance => delivery_distance(state),
    }
}

fn delivery_distance(state: &WorldState) -> f64 {
    let remaining = state.required_gold().saturating_add(state.required_wood());
    if remaining == 0 {
        return 0.0;
    }

    let context = state.context();
    let unit = context.economy.harvest_unit;

    let load = state
        .agents()
        .map(|a| a.carried_amount())
        .fold(unit, u32::max);
    if load == 0 {
        return 0.0;
    }

    let workforce = state.agent_count() as u64
        + if context.economy.allow_build {
            u64::from(state.food_available())
        } else {
            0
        };
    if workforce == 0 {
        return 0.0;
    }

    let hall = context.town_hall_position;
    let from_nodes = state
        .resources()
        .filter(|n| state.required(n.kind) > 0 && n.amount >= unit.max(1))
        .map(|n| n.position.chebyshev_distance(&hall));
    let from_carriers = state
        .agents()
        .filter(|a| a.carried_kind().is_some_and(|k| state.required(k) > 0))
        .map(|a| a.position.chebyshev_distance(&hall));
    let Some(d) = from_nodes.chain(from_carriers).min() else {
        return 0.0;
    };

    let loads = remaining.div_ceil(load);
    f64::from(loads) / workforce as f64 * f64::from(d)
}
