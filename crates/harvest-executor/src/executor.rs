//! Plan Executor
//!
//! Runs a plan one turn at a time. The action at the front of the plan is
//! translated into concrete commands for the units bound to its participants,
//! and the plan only advances once every participant reports completion.
//! Workers trained along the way are bound to the next free ordinal the first
//! turn they are observed.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

use harvest_planner::{AgentOrdinal, GroundedAction, Plan};
use harvest_types::{
    Command, CommandBatch, Feedback, Position, TurnObservation, UnitId, UnitTemplate,
};

/// Errors raised while dispatching an action.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecutionError {
    #[error("agent ordinal {ordinal} in {action} has no bound unit")]
    UnboundAgent { ordinal: AgentOrdinal, action: String },
}

/// Who carries out a dispatched action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "ordinal", rename_all = "snake_case")]
pub enum Participant {
    Agent(AgentOrdinal),
    /// The production building, for training actions
    TownHall,
}

/// What the executor reports after a turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Actions remain and are being worked on
    Running,
    /// Every action completed
    Finished,
    /// A participant failed or died; reported once per failure
    ReplanRequired { failed: Vec<UnitId> },
    /// Waiting for a new plan after a failure
    AwaitingReplan,
}

/// Commands to issue this turn, plus the executor's status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnDirective {
    pub commands: CommandBatch,
    pub status: ExecutionStatus,
}

impl TurnDirective {
    fn idle(status: ExecutionStatus) -> Self {
        Self {
            commands: CommandBatch::new(),
            status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Phase {
    /// Front action not yet dispatched
    AwaitingParticipants,
    /// Commands issued; waiting on the listed units
    Dispatched {
        pending: BTreeMap<UnitId, Participant>,
        dispatched_turn: u64,
    },
    /// A failure was reported; nothing runs until a new plan is installed
    AwaitingReplan,
}

#[derive(Debug)]
pub struct PlanExecutor {
    steps: VecDeque<GroundedAction>,
    town_hall: UnitId,
    town_hall_position: Position,
    bindings: BTreeMap<AgentOrdinal, UnitId>,
    /// Highest ordinal ever bound; never reused after a death
    highest_ordinal: u32,
    phase: Phase,
    last_turn: Option<u64>,
    completed_steps: usize,
}

impl PlanExecutor {
    pub fn new(plan: &Plan) -> Self {
        let mut executor = Self {
            steps: VecDeque::new(),
            town_hall: plan.town_hall,
            town_hall_position: plan.town_hall_position,
            bindings: BTreeMap::new(),
            highest_ordinal: 0,
            phase: Phase::AwaitingParticipants,
            last_turn: None,
            completed_steps: 0,
        };
        executor.install_plan(plan);
        executor
    }

    /// Replaces the current plan and bindings. Turn history is kept so that
    /// replayed turns stay no-ops.
    pub fn install_plan(&mut self, plan: &Plan) {
        self.steps = plan.steps.iter().cloned().collect();
        self.town_hall = plan.town_hall;
        self.town_hall_position = plan.town_hall_position;
        self.bindings = plan.binding_map();
        self.highest_ordinal = self.bindings.keys().map(|o| o.0).max().unwrap_or(0);
        self.phase = Phase::AwaitingParticipants;
        self.completed_steps = 0;
        tracing::info!(plan = %plan.id, steps = plan.len(), "plan installed");
    }

    /// Advances the executor by one turn.
    ///
    /// A turn number not greater than the last one processed is a replay and
    /// yields no commands.
    pub fn step(&mut self, observation: &TurnObservation) -> Result<TurnDirective, ExecutionError> {
        if self.last_turn.is_some_and(|last| observation.turn <= last) {
            tracing::debug!(turn = observation.turn, "replayed turn ignored");
            return Ok(TurnDirective::idle(self.quiet_status()));
        }
        self.last_turn = Some(observation.turn);

        let lost = self.unbind_dead(&observation.died);
        self.bind_new_agents(observation);

        if self.phase == Phase::AwaitingReplan {
            return Ok(TurnDirective::idle(ExecutionStatus::AwaitingReplan));
        }

        // A lost unit fails the plan whether it is working now or only named
        // by a later step.
        let mut failed: Vec<UnitId> = lost
            .iter()
            .filter(|(ordinal, _)| self.steps.iter().any(|s| s.participants().contains(ordinal)))
            .map(|(_, unit)| *unit)
            .collect();

        if let Phase::Dispatched {
            pending,
            dispatched_turn,
        } = &mut self.phase
        {
            pending.retain(|unit, _| {
                if observation.died.contains(unit) {
                    if !failed.contains(unit) {
                        failed.push(*unit);
                    }
                    false
                } else {
                    true
                }
            });

            if observation.turn > *dispatched_turn {
                pending.retain(|unit, participant| match observation.feedback.get(unit).copied() {
                    Some(feedback) if feedback.is_terminal() => {
                        if feedback == Feedback::Failed {
                            failed.push(*unit);
                        } else {
                            tracing::debug!(unit = %unit, ?participant, "participant completed");
                        }
                        false
                    }
                    _ => true,
                });
            }
        }

        if !failed.is_empty() {
            failed.sort();
            failed.dedup();
            tracing::info!(
                turn = observation.turn,
                failed = ?failed,
                action = ?self.steps.front().map(|s| s.to_string()),
                "participant lost, replanning required"
            );
            self.phase = Phase::AwaitingReplan;
            return Ok(TurnDirective::idle(ExecutionStatus::ReplanRequired { failed }));
        }

        if let Phase::Dispatched { pending, .. } = &self.phase {
            if !pending.is_empty() {
                return Ok(TurnDirective::idle(ExecutionStatus::Running));
            }
            if let Some(done) = self.steps.pop_front() {
                self.completed_steps += 1;
                tracing::info!(turn = observation.turn, action = %done, "action complete");
            }
            self.phase = Phase::AwaitingParticipants;
        }

        self.dispatch_front(observation)
    }

    /// Dispatches the front action for the current turn if it is waiting,
    /// without consuming a new turn. Used right after a plan is installed.
    pub fn resume(&mut self, observation: &TurnObservation) -> Result<TurnDirective, ExecutionError> {
        match self.phase {
            Phase::AwaitingParticipants => self.dispatch_front(observation),
            _ => Ok(TurnDirective::idle(self.quiet_status())),
        }
    }

    fn dispatch_front(&mut self, observation: &TurnObservation) -> Result<TurnDirective, ExecutionError> {
        let Some(action) = self.steps.front() else {
            return Ok(TurnDirective::idle(ExecutionStatus::Finished));
        };

        let mut commands = CommandBatch::new();
        let mut pending = BTreeMap::new();

        match action {
            GroundedAction::Harvest(harvest) => {
                for ordinal in &harvest.participants {
                    let unit = self.bound_unit(*ordinal, action)?;
                    let command = match adjacent_direction(observation, unit, harvest.target) {
                        Some(direction) => Command::GatherAt { direction },
                        None => Command::Gather { node: harvest.node },
                    };
                    commands.insert(unit, command);
                    pending.insert(unit, Participant::Agent(*ordinal));
                }
            }
            GroundedAction::Deposit(deposit) => {
                for ordinal in &deposit.participants {
                    let unit = self.bound_unit(*ordinal, action)?;
                    let command = match adjacent_direction(observation, unit, self.town_hall_position) {
                        Some(direction) => Command::DepositAt { direction },
                        None => Command::Deposit {
                            town_hall: self.town_hall,
                        },
                    };
                    commands.insert(unit, command);
                    pending.insert(unit, Participant::Agent(*ordinal));
                }
            }
            GroundedAction::BuildAgent(_) => {
                commands.insert(
                    self.town_hall,
                    Command::Produce {
                        template: UnitTemplate::Peasant,
                    },
                );
                pending.insert(self.town_hall, Participant::TownHall);
            }
        }

        tracing::debug!(turn = observation.turn, action = %action, units = commands.len(), "action dispatched");
        self.phase = Phase::Dispatched {
            pending,
            dispatched_turn: observation.turn,
        };
        Ok(TurnDirective {
            commands,
            status: ExecutionStatus::Running,
        })
    }

    fn bound_unit(&self, ordinal: AgentOrdinal, action: &GroundedAction) -> Result<UnitId, ExecutionError> {
        self.bindings
            .get(&ordinal)
            .copied()
            .ok_or_else(|| ExecutionError::UnboundAgent {
                ordinal,
                action: action.to_string(),
            })
    }

    /// Drops bindings of dead units and returns the lost ordinals.
    fn unbind_dead(&mut self, died: &[UnitId]) -> Vec<(AgentOrdinal, UnitId)> {
        let mut lost = Vec::new();
        self.bindings.retain(|ordinal, unit| {
            if died.contains(unit) {
                tracing::info!(ordinal = %ordinal, unit = %unit, "bound unit died");
                lost.push((*ordinal, *unit));
                false
            } else {
                true
            }
        });
        lost
    }

    fn bind_new_agents(&mut self, observation: &TurnObservation) {
        let mut unseen: Vec<UnitId> = observation
            .agents
            .iter()
            .map(|a| a.id)
            .filter(|id| !observation.died.contains(id))
            .filter(|id| !self.bindings.values().any(|bound| bound == id))
            .collect();
        unseen.sort();
        unseen.dedup();

        for unit in unseen {
            self.highest_ordinal += 1;
            let ordinal = AgentOrdinal(self.highest_ordinal);
            tracing::info!(ordinal = %ordinal, unit = %unit, "new unit bound");
            self.bindings.insert(ordinal, unit);
        }
    }

    fn quiet_status(&self) -> ExecutionStatus {
        match self.phase {
            Phase::AwaitingReplan => ExecutionStatus::AwaitingReplan,
            _ if self.steps.is_empty() => ExecutionStatus::Finished,
            _ => ExecutionStatus::Running,
        }
    }

    pub fn bindings(&self) -> &BTreeMap<AgentOrdinal, UnitId> {
        &self.bindings
    }

    /// Actions not yet completed, the current one first.
    pub fn remaining_steps(&self) -> impl Iterator<Item = &GroundedAction> + '_ {
        self.steps.iter()
    }

    pub fn current_action(&self) -> Option<&GroundedAction> {
        self.steps.front()
    }

    pub fn completed_steps(&self) -> usize {
        self.completed_steps
    }

    /// Units still expected to report on the dispatched action.
    pub fn pending_units(&self) -> Vec<UnitId> {
        match &self.phase {
            Phase::Dispatched { pending, .. } => pending.keys().copied().collect(),
            _ => Vec::new(),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.steps.is_empty() && self.phase != Phase::AwaitingReplan
    }

    pub fn awaiting_replan(&self) -> bool {
        self.phase == Phase::AwaitingReplan
    }
}

/// Direction from the observed unit to `target` when they are neighbours.
fn adjacent_direction(
    observation: &TurnObservation,
    unit: UnitId,
    target: Position,
) -> Option<harvest_types::Direction> {
    observation
        .agent(unit)
        .and_then(|view| view.position.direction_to(&target))
}
