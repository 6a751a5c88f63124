//! World State
//!
//! One point in the planning search space: what is still required, what is
//! banked, where every worker stands and what it carries, how much is left in
//! each resource node, and the actions that led here.
//!
//! States are value snapshots. A child is always derived from an independent
//! copy of its parent's collections, and the action history is a persistent
//! list whose shared prefix is never mutated.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use harvest_types::{
    Cargo, MapExtent, Position, ResourceId, ResourceKind, UnitId, WorldSnapshot,
};

use crate::actions::GroundedAction;
use crate::config::EconomyConfig;
use crate::heuristic::{self, HeuristicKind};
use crate::search::PlanError;
use crate::successors;

/// Plan-local identity of a worker, assigned in ascending unit id order for
/// the initial workers and `max + 1` for every trained one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentOrdinal(pub u32);

impl fmt::Display for AgentOrdinal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A worker as the planner models it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Agent {
    pub ordinal: AgentOrdinal,
    pub position: Position,
    pub cargo: Option<Cargo>,
}

impl Agent {
    pub fn is_carrying(&self) -> bool {
        self.cargo.is_some()
    }

    pub fn carried_amount(&self) -> u32 {
        self.cargo.map_or(0, |c| c.amount)
    }

    pub fn carried_kind(&self) -> Option<ResourceKind> {
        self.cargo.map(|c| c.kind)
    }
}

/// A resource node as the planner models it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceNode {
    pub id: ResourceId,
    pub kind: ResourceKind,
    pub position: Position,
    pub amount: u32,
}

/// Read-only facts shared by every state of one search.
#[derive(Debug, Clone)]
pub struct PlanningContext {
    pub town_hall: UnitId,
    pub town_hall_position: Position,
    pub map: MapExtent,
    pub economy: EconomyConfig,
    pub heuristic: HeuristicKind,
}

/// Ordinal to actuator identity mapping for the initial workers.
pub fn initial_bindings(snapshot: &WorldSnapshot) -> BTreeMap<AgentOrdinal, UnitId> {
    snapshot
        .agents_by_id()
        .into_iter()
        .zip(1u32..)
        .map(|(agent, ordinal)| (AgentOrdinal(ordinal), agent.id))
        .collect()
}

#[derive(Debug)]
struct HistoryLink {
    action: GroundedAction,
    prev: Option<Arc<HistoryLink>>,
}

/// Persistent list of the actions applied since the root.
#[derive(Debug, Clone, Default)]
pub struct History {
    head: Option<Arc<HistoryLink>>,
    len: usize,
}

impl History {
    /// A new history with `action` appended. `self` is left untouched.
    pub fn push(&self, action: GroundedAction) -> History {
        History {
            head: Some(Arc::new(HistoryLink {
                action,
                prev: self.head.clone(),
            })),
            len: self.len + 1,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn last(&self) -> Option<&GroundedAction> {
        self.head.as_deref().map(|link| &link.action)
    }

    /// Actions in application order, first action first.
    pub fn to_vec(&self) -> Vec<GroundedAction> {
        let mut actions = Vec::with_capacity(self.len);
        let mut cursor = self.head.as_deref();
        while let Some(link) = cursor {
            actions.push(link.action.clone());
            cursor = link.prev.as_deref();
        }
        actions.reverse();
        actions
    }
}

/// Structural identity of a planning state.
///
/// Workers are reduced to a sorted multiset of (cell, cargo) so that states
/// differing only in which ordinal stands where are the same node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StateKey {
    required_gold: u32,
    required_wood: u32,
    gold_banked: u32,
    food_available: u32,
    agents: Vec<(Position, Option<Cargo>)>,
    resources: Vec<u32>,
}

#[derive(Debug, Clone)]
pub struct WorldState {
    context: Arc<PlanningContext>,
    required_gold: u32,
    required_wood: u32,
    gold_banked: u32,
    food_available: u32,
    agents: BTreeMap<AgentOrdinal, Agent>,
    resources: BTreeMap<Position, ResourceNode>,
    cost: f64,
    history: History,
}

impl WorldState {
    /// Builds the root state. Goal thresholds are fixed here.
    pub fn from_snapshot(
        snapshot: &WorldSnapshot,
        economy: EconomyConfig,
        heuristic: HeuristicKind,
    ) -> Self {
        let context = Arc::new(PlanningContext {
            town_hall: snapshot.town_hall.id,
            town_hall_position: snapshot.town_hall.position,
            map: snapshot.map,
            economy,
            heuristic,
        });

        let bindings = initial_bindings(snapshot);
        let agents = snapshot
            .agents_by_id()
            .into_iter()
            .zip(bindings.keys())
            .map(|(agent, ordinal)| {
                (
                    *ordinal,
                    Agent {
                        ordinal: *ordinal,
                        position: agent.position,
                        cargo: agent.cargo.filter(|c| c.amount > 0),
                    },
                )
            })
            .collect::<BTreeMap<_, _>>();

        let resources = snapshot
            .resources
            .iter()
            .map(|r| {
                (
                    r.position,
                    ResourceNode {
                        id: r.id,
                        kind: r.kind,
                        position: r.position,
                        amount: r.amount,
                    },
                )
            })
            .collect();

        let remaining = snapshot.remaining_goal();
        let food_available = snapshot
            .town_hall
            .food_capacity
            .saturating_sub(u32::try_from(agents.len()).unwrap_or(u32::MAX));

        Self {
            context,
            required_gold: remaining.gold,
            required_wood: remaining.wood,
            gold_banked: snapshot.stockpile.gold,
            food_available,
            agents,
            resources,
            cost: 0.0,
            history: History::default(),
        }
    }

    pub fn context(&self) -> &PlanningContext {
        &self.context
    }

    pub fn required_gold(&self) -> u32 {
        self.required_gold
    }

    pub fn required_wood(&self) -> u32 {
        self.required_wood
    }

    pub fn required(&self, kind: ResourceKind) -> u32 {
        match kind {
            ResourceKind::Gold => self.required_gold,
            ResourceKind::Wood => self.required_wood,
        }
    }

    pub fn gold_banked(&self) -> u32 {
        self.gold_banked
    }

    pub fn food_available(&self) -> u32 {
        self.food_available
    }

    /// Workers in ascending ordinal order.
    pub fn agents(&self) -> impl Iterator<Item = &Agent> + '_ {
        self.agents.values()
    }

    pub fn agent(&self, ordinal: AgentOrdinal) -> Option<&Agent> {
        self.agents.get(&ordinal)
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    /// Resource nodes in cell order.
    pub fn resources(&self) -> impl Iterator<Item = &ResourceNode> + '_ {
        self.resources.values()
    }

    pub fn resource_at(&self, position: &Position) -> Option<&ResourceNode> {
        self.resources.get(position)
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Both counters at zero. Carried cargo does not count.
    pub fn is_goal(&self) -> bool {
        self.required_gold == 0 && self.required_wood == 0
    }

    /// Accumulated path cost from the root.
    pub fn cost(&self) -> f64 {
        self.cost
    }

    /// Estimated remaining cost; never overestimates.
    pub fn heuristic(&self) -> f64 {
        heuristic::estimate(self)
    }

    /// Frontier priority.
    pub fn priority(&self) -> f64 {
        self.cost + self.heuristic()
    }

    pub fn generate_successors(&self) -> Result<Vec<WorldState>, PlanError> {
        successors::generate_successors(self)
    }

    pub fn key(&self) -> StateKey {
        let mut agents: Vec<(Position, Option<Cargo>)> =
            self.agents.values().map(|a| (a.position, a.cargo)).collect();
        agents.sort_unstable();
        StateKey {
            required_gold: self.required_gold,
            required_wood: self.required_wood,
            gold_banked: self.gold_banked,
            food_available: self.food_available,
            agents,
            resources: self.resources.values().map(|r| r.amount).collect(),
        }
    }

    /// Independent copy to be modified by an action's effect.
    pub(crate) fn derive(&self) -> WorldState {
        self.clone()
    }

    /// Seals a derived state: records the step cost and the action.
    pub(crate) fn finish(mut self, action: GroundedAction, step_cost: f64) -> WorldState {
        self.cost += step_cost.max(0.0);
        self.history = self.history.push(action);
        self
    }

    pub(crate) fn agent_mut(&mut self, ordinal: AgentOrdinal) -> Option<&mut Agent> {
        self.agents.get_mut(&ordinal)
    }

    pub(crate) fn resource_mut(&mut self, position: &Position) -> Option<&mut ResourceNode> {
        self.resources.get_mut(position)
    }

    pub(crate) fn add_agent(&mut self, position: Position) -> AgentOrdinal {
        let ordinal = AgentOrdinal(self.agents.keys().next_back().map_or(1, |o| o.0 + 1));
        self.agents.insert(
            ordinal,
            Agent {
                ordinal,
                position,
                cargo: None,
            },
        );
        ordinal
    }

    /// Records a delivery of `cargo` at the town hall.
    pub(crate) fn bank(&mut self, cargo: Cargo) {
        match cargo.kind {
            ResourceKind::Gold => {
                self.required_gold = self.required_gold.saturating_sub(cargo.amount);
                self.gold_banked = self.gold_banked.saturating_add(cargo.amount);
            }
            ResourceKind::Wood => {
                self.required_wood = self.required_wood.saturating_sub(cargo.amount);
            }
        }
    }

    /// Pays for a trained worker. Returns false if the bank or food is short.
    pub(crate) fn spend_on_training(&mut self, cost: u32) -> bool {
        match (self.gold_banked.checked_sub(cost), self.food_available.checked_sub(1)) {
            (Some(gold), Some(food)) => {
                self.gold_banked = gold;
                self.food_available = food;
                true
            }
            _ => false,
        }
    }
}

impl fmt::Display for WorldState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "required gold {} wood {}, banked gold {}, food {}, cost {:.2}",
            self.required_gold, self.required_wood, self.gold_banked, self.food_available, self.cost
        )?;
        for node in self.resources.values() {
            writeln!(f, "  {} {} at {}: {}", node.kind, node.id, node.position, node.amount)?;
        }
        for agent in self.agents.values() {
            match agent.cargo {
                Some(cargo) => writeln!(
                    f,
                    "  peasant {} at {} carrying {} {}",
                    agent.ordinal, agent.position, cargo.amount, cargo.kind
                )?,
                None => writeln!(f, "  peasant {} at {}", agent.ordinal, agent.position)?,
            }
        }
        Ok(())
    }
}
