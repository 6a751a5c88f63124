//! Turn-driven plan execution.
//!
//! The executor sits between the planner and the game. It turns each planned
//! action into unit commands, waits for every participant to report back, and
//! asks for a new plan when something goes wrong.
//!
//! # Modules
//!
//! - [`executor`]: Plan executor and participant synchronisation
//! - [`coordinator`]: Mission controller owning the re-planning policy
//! - [`config`]: Executor configuration

pub mod config;
pub mod coordinator;
pub mod executor;

pub use config::{ConfigError, ExecutionConfig, ExecutorConfig};
pub use coordinator::{Coordinator, MissionError, MissionStatus, MissionTurn};
pub use executor::{ExecutionError, ExecutionStatus, Participant, PlanExecutor, TurnDirective};
