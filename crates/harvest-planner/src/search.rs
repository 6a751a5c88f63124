//! A* Planner
//!
//! Best-first search over world states ordered by `cost + heuristic`, with
//! FIFO tie-breaking so identical inputs always produce identical plans.
//! States are deduplicated by structural key. A cheaper path to a known key
//! replaces the old entry, and reopens it if it was already expanded.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::time::{Duration, Instant};

use harvest_types::{SnapshotError, WorldSnapshot};

use crate::config::{ConfigError, PlannerConfig};
use crate::plan::{Plan, PlanParseError};
use crate::state::{StateKey, WorldState};

/// Errors raised while planning.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("no plan reaches the goal ({expanded} states expanded)")]
    NoPlan { expanded: usize },
    #[error("search budget of {limit} expansions exhausted")]
    BudgetExhausted { limit: usize },
    #[error("search deadline of {limit_ms}ms exceeded after {expanded} expansions")]
    DeadlineExceeded { limit_ms: u64, expanded: usize },
    #[error("contract violation applying {action}: {reason}")]
    ContractViolation { action: String, reason: String },
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Parse(#[from] PlanParseError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

/// Counters describing one search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchStats {
    /// States popped and expanded
    pub expanded: usize,
    /// Successors produced
    pub generated: usize,
    /// Successors discarded because an equal-keyed state was no more expensive
    pub deduplicated: usize,
    /// Expanded states put back on the frontier after a cheaper path was found
    pub reopened: usize,
}

/// Outcome of a search: the goal state that ended it and the counters.
#[derive(Debug)]
pub struct SearchOutcome {
    pub goal: WorldState,
    pub stats: SearchStats,
}

struct FrontierEntry {
    priority: f64,
    seq: u64,
    key: StateKey,
    state: WorldState,
}

impl PartialEq for FrontierEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FrontierEntry {}

impl PartialOrd for FrontierEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FrontierEntry {
    // BinaryHeap is a max-heap: lowest priority, then earliest insertion, wins.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .total_cmp(&self.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

pub struct AstarPlanner {
    config: PlannerConfig,
}

impl AstarPlanner {
    pub fn new(config: PlannerConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(PlannerConfig::default())
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Plans from a snapshot: validates it, builds the root state, searches,
    /// and packages the winning history as a [`Plan`].
    pub fn plan(&self, snapshot: &WorldSnapshot) -> Result<Plan, PlanError> {
        snapshot.validate()?;
        let root =
            WorldState::from_snapshot(snapshot, self.config.economy, self.config.search.heuristic);

        tracing::info!(
            agents = root.agent_count(),
            required_gold = root.required_gold(),
            required_wood = root.required_wood(),
            heuristic = ?self.config.search.heuristic,
            "planning started"
        );

        let outcome = self.search(root)?;
        let plan = Plan::from_outcome(snapshot, &outcome);

        tracing::info!(
            steps = plan.len(),
            cost = plan.expected_cost,
            expanded = outcome.stats.expanded,
            generated = outcome.stats.generated,
            deduplicated = outcome.stats.deduplicated,
            reopened = outcome.stats.reopened,
            "planning finished"
        );
        Ok(plan)
    }

    /// Runs A* from `root` until a goal state is popped.
    pub fn search(&self, root: WorldState) -> Result<SearchOutcome, PlanError> {
        let limits = &self.config.search;
        let started = Instant::now();
        let deadline = limits.deadline_ms.map(Duration::from_millis);

        let mut stats = SearchStats::default();
        let mut open = BinaryHeap::new();
        let mut best_cost: HashMap<StateKey, f64> = HashMap::new();
        let mut closed: HashSet<StateKey> = HashSet::new();
        let mut seq = 0u64;

        let root_key = root.key();
        best_cost.insert(root_key.clone(), root.cost());
        open.push(FrontierEntry {
            priority: root.priority(),
            seq,
            key: root_key,
            state: root,
        });

        while let Some(entry) = open.pop() {
            let FrontierEntry { key, state, .. } = entry;

            // Superseded by a cheaper path pushed later
            if best_cost.get(&key).is_some_and(|best| state.cost() > *best) {
                continue;
            }
            if closed.contains(&key) {
                continue;
            }

            if state.is_goal() {
                tracing::debug!(cost = state.cost(), steps = state.history().len(), "goal reached");
                return Ok(SearchOutcome { goal: state, stats });
            }

            if stats.expanded >= limits.max_expansions {
                tracing::warn!(limit = limits.max_expansions, "search budget exhausted");
                return Err(PlanError::BudgetExhausted {
                    limit: limits.max_expansions,
                });
            }
            if let Some(limit) = deadline {
                if started.elapsed() >= limit {
                    tracing::warn!(limit_ms = limit.as_millis() as u64, "search deadline exceeded");
                    return Err(PlanError::DeadlineExceeded {
                        limit_ms: limit.as_millis() as u64,
                        expanded: stats.expanded,
                    });
                }
            }

            stats.expanded += 1;
            tracing::trace!(cost = state.cost(), h = state.heuristic(), "expanding\n{}", state);

            let successors = state.generate_successors()?;
            closed.insert(key);

            for child in successors {
                stats.generated += 1;
                let child_key = child.key();
                let child_cost = child.cost();

                if best_cost.get(&child_key).is_some_and(|best| *best <= child_cost) {
                    stats.deduplicated += 1;
                    continue;
                }
                if closed.remove(&child_key) {
                    stats.reopened += 1;
                }
                best_cost.insert(child_key.clone(), child_cost);

                seq += 1;
                open.push(FrontierEntry {
                    priority: child.priority(),
                    seq,
                    key: child_key,
                    state: child,
                });
            }
        }

        tracing::warn!(expanded = stats.expanded, "frontier exhausted without reaching the goal");
        Err(PlanError::NoPlan {
            expanded: stats.expanded,
        })
    }
}
