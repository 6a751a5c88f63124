//! Mission Coordinator
//!
//! Owns the planner and the executor for one mission. It plans once at the
//! start, runs the executor every turn, and re-plans from the current world
//! snapshot whenever execution fails or finishes short of the goal.

use serde::{Deserialize, Serialize};

use harvest_planner::{AstarPlanner, Plan, PlanError, PlannerConfig};
use harvest_types::{CommandBatch, TurnObservation, WorldSnapshot};

use crate::config::ExecutorConfig;
use crate::executor::{ExecutionError, ExecutionStatus, PlanExecutor};

/// Errors that end or interrupt a mission.
#[derive(Debug, thiserror::Error)]
pub enum MissionError {
    #[error("no plan reaches the goal from the current state")]
    NoPlan,
    #[error("re-planned {limit} times without finishing")]
    ReplanLimit { limit: u32 },
    #[error("mission has not been started")]
    NotStarted,
    #[error("mission halted")]
    Halted,
    #[error("planning error: {0}")]
    Plan(PlanError),
    #[error("execution error: {0}")]
    Execution(#[from] ExecutionError),
}

impl From<PlanError> for MissionError {
    fn from(e: PlanError) -> Self {
        match e {
            PlanError::NoPlan { .. } => MissionError::NoPlan,
            other => MissionError::Plan(other),
        }
    }
}

/// Mission progress after a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MissionStatus {
    /// The current plan is being executed
    Executing,
    /// A new plan was installed this turn
    Replanned { attempt: u32 },
    /// Every action finished and the world holds the goal
    Complete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissionTurn {
    pub commands: CommandBatch,
    pub status: MissionStatus,
}

pub struct Coordinator {
    planner: AstarPlanner,
    config: ExecutorConfig,
    executor: Option<PlanExecutor>,
    current_plan: Option<Plan>,
    replans: u32,
    halted: bool,
}

impl Coordinator {
    pub fn new(planner_config: PlannerConfig, config: ExecutorConfig) -> Self {
        Self {
            planner: AstarPlanner::new(planner_config),
            config,
            executor: None,
            current_plan: None,
            replans: 0,
            halted: false,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(PlannerConfig::default(), ExecutorConfig::default())
    }

    /// Plans from the initial snapshot and installs the result.
    pub fn start(&mut self, snapshot: &WorldSnapshot) -> Result<&Plan, MissionError> {
        let plan = self.plan(snapshot)?;
        self.executor = Some(PlanExecutor::new(&plan));
        Ok(self.current_plan.insert(plan))
    }

    /// Runs one turn. `snapshot` is the current world, used if a re-plan is
    /// needed.
    pub fn turn(
        &mut self,
        snapshot: &WorldSnapshot,
        observation: &TurnObservation,
    ) -> Result<MissionTurn, MissionError> {
        if self.halted {
            return Err(MissionError::Halted);
        }
        let executor = self.executor.as_mut().ok_or(MissionError::NotStarted)?;
        let directive = executor.step(observation)?;

        match directive.status {
            ExecutionStatus::Running | ExecutionStatus::AwaitingReplan => Ok(MissionTurn {
                commands: directive.commands,
                status: MissionStatus::Executing,
            }),
            ExecutionStatus::Finished if snapshot.remaining_goal().is_zero() => {
                tracing::info!(turn = observation.turn, replans = self.replans, "mission complete");
                Ok(MissionTurn {
                    commands: directive.commands,
                    status: MissionStatus::Complete,
                })
            }
            ExecutionStatus::Finished => {
                tracing::info!(
                    turn = observation.turn,
                    remaining = ?snapshot.remaining_goal(),
                    "plan finished short of the goal"
                );
                self.replan(snapshot, observation)
            }
            ExecutionStatus::ReplanRequired { failed } => {
                tracing::info!(turn = observation.turn, failed = ?failed, "execution failed");
                self.replan(snapshot, observation)
            }
        }
    }

    fn replan(
        &mut self,
        snapshot: &WorldSnapshot,
        observation: &TurnObservation,
    ) -> Result<MissionTurn, MissionError> {
        let limit = self.config.execution.max_replans;
        if self.replans >= limit {
            tracing::warn!(limit, "re-plan limit reached, halting");
            self.halted = true;
            return Err(MissionError::ReplanLimit { limit });
        }
        self.replans += 1;

        let plan = self.plan(snapshot)?;
        let executor = self.executor.as_mut().ok_or(MissionError::NotStarted)?;
        executor.install_plan(&plan);
        self.current_plan = Some(plan);
        let directive = executor.resume(observation)?;

        Ok(MissionTurn {
            commands: directive.commands,
            status: MissionStatus::Replanned {
                attempt: self.replans,
            },
        })
    }

    fn plan(&mut self, snapshot: &WorldSnapshot) -> Result<Plan, MissionError> {
        let plan = match self.planner.plan(snapshot) {
            Ok(plan) => plan,
            Err(e) => {
                tracing::warn!(error = %e, "planning failed, halting");
                self.halted = true;
                return Err(e.into());
            }
        };

        if self.config.execution.save_plans {
            let output = &self.planner.config().output;
            plan.save_text(&output.plan_path)?;
            if output.write_json {
                plan.save_json(output.plan_path.with_extension("json"))?;
            }
            tracing::debug!(path = %output.plan_path.display(), "plan saved");
        }
        Ok(plan)
    }

    pub fn current_plan(&self) -> Option<&Plan> {
        self.current_plan.as_ref()
    }

    pub fn executor(&self) -> Option<&PlanExecutor> {
        self.executor.as_ref()
    }

    pub fn replan_count(&self) -> u32 {
        self.replans
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }
}
