//! Economic A* planner.
//!
//! Builds a root world state from a [`harvest_types::WorldSnapshot`], searches
//! over harvest, deposit and training actions until the gold and wood still
//! required both reach zero, and returns the winning action sequence as a
//! [`Plan`].

pub mod actions;
pub mod config;
pub mod heuristic;
pub mod plan;
pub mod search;
pub mod state;
pub mod successors;

// Re-export action types
pub use actions::{ActionTarget, BuildAgent, Deposit, GroundedAction, Harvest};

// Re-export configuration
pub use config::{
    ConfigError, EconomyConfig, OutputConfig, PlannerConfig, SearchConfig, DEFAULT_TUNING_PATH,
};

pub use heuristic::HeuristicKind;
pub use plan::{AgentBinding, Plan, PlanParseError};
pub use search::{AstarPlanner, PlanError, SearchOutcome, SearchStats};
pub use state::{initial_bindings, Agent, AgentOrdinal, ResourceNode, StateKey, WorldState};
