//! Grounded Actions
//!
//! The closed set of STRIPS actions the planner can apply: harvesting a
//! resource node, depositing carried loads at the town hall, and training a
//! new worker. Each variant checks its own preconditions, applies its effect
//! to an independent copy of a state, and names the workers it binds.

pub mod build;
pub mod deposit;
pub mod harvest;

pub use build::BuildAgent;
pub use deposit::Deposit;
pub use harvest::Harvest;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use harvest_types::{Position, ResourceId, ResourceKind, UnitId};

use crate::plan::PlanParseError;
use crate::search::PlanError;
use crate::state::{AgentOrdinal, ResourceNode, WorldState};

/// The real-world object an action addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum ActionTarget {
    Resource(ResourceId),
    Building(UnitId),
}

impl fmt::Display for ActionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionTarget::Resource(id) => write!(f, "resource {}", id),
            ActionTarget::Building(id) => write!(f, "building {}", id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum GroundedAction {
    Harvest(Harvest),
    Deposit(Deposit),
    BuildAgent(BuildAgent),
}

impl GroundedAction {
    /// Ungrounded harvest of `node` by `group_size` idle workers near `source`.
    pub fn harvest(source: Position, node: &ResourceNode, group_size: u32) -> Self {
        GroundedAction::Harvest(Harvest::new(source, node, group_size))
    }

    /// Ungrounded deposit by `group_size` carriers near `source`.
    pub fn deposit(source: Position, town_hall: UnitId, dropoff: Position, group_size: u32) -> Self {
        GroundedAction::Deposit(Deposit::new(source, town_hall, dropoff, group_size))
    }

    pub fn build_agent(town_hall: UnitId, at: Position) -> Self {
        GroundedAction::BuildAgent(BuildAgent::new(town_hall, at))
    }

    pub fn preconditions_met(&self, state: &WorldState) -> bool {
        match self {
            GroundedAction::Harvest(a) => a.preconditions_met(state),
            GroundedAction::Deposit(a) => a.preconditions_met(state),
            GroundedAction::BuildAgent(a) => a.preconditions_met(state),
        }
    }

    /// Applies the effect to a copy of `state`. The returned state's history
    /// ends with this action, grounded to the chosen participants.
    pub fn apply(&self, state: &WorldState) -> Result<WorldState, PlanError> {
        match self {
            GroundedAction::Harvest(a) => a.apply(state),
            GroundedAction::Deposit(a) => a.apply(state),
            GroundedAction::BuildAgent(a) => a.apply(state),
        }
    }

    /// Workers bound by this action. Empty until grounded, and always empty
    /// for `BuildAgent`, whose actor is the town hall.
    pub fn participants(&self) -> &[AgentOrdinal] {
        match self {
            GroundedAction::Harvest(a) => &a.participants,
            GroundedAction::Deposit(a) => &a.participants,
            GroundedAction::BuildAgent(_) => &[],
        }
    }

    pub fn group_size(&self) -> u32 {
        match self {
            GroundedAction::Harvest(a) => a.group_size,
            GroundedAction::Deposit(a) => a.group_size,
            GroundedAction::BuildAgent(_) => 1,
        }
    }

    pub fn target_id(&self) -> ActionTarget {
        match self {
            GroundedAction::Harvest(a) => ActionTarget::Resource(a.node),
            GroundedAction::Deposit(a) => ActionTarget::Building(a.town_hall),
            GroundedAction::BuildAgent(a) => ActionTarget::Building(a.town_hall),
        }
    }

    /// Name used in the text plan format.
    pub fn name(&self) -> &'static str {
        match self {
            GroundedAction::Harvest(a) => match a.kind {
                ResourceKind::Gold => "HarvestGold",
                ResourceKind::Wood => "HarvestWood",
            },
            GroundedAction::Deposit(_) => "Deposit",
            GroundedAction::BuildAgent(_) => "BuildPeasant",
        }
    }
}

impl fmt::Display for GroundedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroundedAction::Harvest(a) => write!(
                f,
                "{}({}, {}, {}, {}, {})",
                self.name(),
                a.node,
                a.source,
                a.target,
                a.group_size,
                OrdinalList(&a.participants)
            ),
            GroundedAction::Deposit(a) => write!(
                f,
                "{}({}, {}, {}, {}, {})",
                self.name(),
                a.town_hall,
                a.source,
                a.dropoff,
                a.group_size,
                OrdinalList(&a.participants)
            ),
            GroundedAction::BuildAgent(a) => {
                write!(f, "{}({}, {})", self.name(), a.town_hall, a.at)
            }
        }
    }
}

struct OrdinalList<'a>(&'a [AgentOrdinal]);

impl fmt::Display for OrdinalList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, ordinal) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", ordinal)?;
        }
        f.write_str("]")
    }
}

impl FromStr for GroundedAction {
    type Err = PlanParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let malformed = || PlanParseError::Malformed(line.to_string());

        let open = line.find('(').ok_or_else(malformed)?;
        if !line.ends_with(')') {
            return Err(malformed());
        }
        let name = line[..open].trim();
        let args = split_args(&line[open + 1..line.len() - 1]);

        match name {
            "HarvestGold" | "HarvestWood" => {
                let [node, source, target, k, participants] = take_args::<5>(line, &args)?;
                let kind = if name == "HarvestGold" {
                    ResourceKind::Gold
                } else {
                    ResourceKind::Wood
                };
                Ok(GroundedAction::Harvest(Harvest {
                    kind,
                    node: ResourceId(parse_number(node)?),
                    source: parse_position(source)?,
                    target: parse_position(target)?,
                    group_size: parse_number(k)?,
                    participants: parse_ordinals(participants)?,
                }))
            }
            "Deposit" => {
                let [hall, source, dropoff, k, participants] = take_args::<5>(line, &args)?;
                Ok(GroundedAction::Deposit(Deposit {
                    town_hall: UnitId(parse_number(hall)?),
                    source: parse_position(source)?,
                    dropoff: parse_position(dropoff)?,
                    group_size: parse_number(k)?,
                    participants: parse_ordinals(participants)?,
                }))
            }
            "BuildPeasant" => {
                let [hall, at] = take_args::<2>(line, &args)?;
                Ok(GroundedAction::build_agent(
                    UnitId(parse_number(hall)?),
                    parse_position(at)?,
                ))
            }
            other => Err(PlanParseError::UnknownAction(other.to_string())),
        }
    }
}

/// Splits on commas that are not nested inside parentheses or brackets.
fn split_args(inner: &str) -> Vec<&str> {
    let mut args = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in inner.char_indices() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => depth -= 1,
            ',' if depth == 0 => {
                args.push(inner[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    let last = inner[start..].trim();
    if !last.is_empty() || !args.is_empty() {
        args.push(last);
    }
    args
}

fn take_args<'a, const N: usize>(line: &str, args: &[&'a str]) -> Result<[&'a str; N], PlanParseError> {
    <[&str; N]>::try_from(args).map_err(|_| PlanParseError::ArgumentCount {
        line: line.to_string(),
        expected: N,
        found: args.len(),
    })
}

fn parse_number<T: FromStr>(text: &str) -> Result<T, PlanParseError> {
    text.trim()
        .parse()
        .map_err(|_| PlanParseError::InvalidNumber(text.to_string()))
}

fn parse_position(text: &str) -> Result<Position, PlanParseError> {
    let inner = text
        .trim()
        .strip_prefix('(')
        .and_then(|t| t.strip_suffix(')'))
        .ok_or_else(|| PlanParseError::InvalidPosition(text.to_string()))?;
    let (x, y) = inner
        .split_once(',')
        .ok_or_else(|| PlanParseError::InvalidPosition(text.to_string()))?;
    Ok(Position::new(parse_number(x)?, parse_number(y)?))
}

fn parse_ordinals(text: &str) -> Result<Vec<AgentOrdinal>, PlanParseError> {
    let inner = text
        .trim()
        .strip_prefix('[')
        .and_then(|t| t.strip_suffix(']'))
        .ok_or_else(|| PlanParseError::Malformed(text.to_string()))?;
    inner
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| parse_number(s).map(AgentOrdinal))
        .collect()
}

/// First `count` agents, in ordinal order, that satisfy `qualifies`.
pub(crate) fn select_participants<F>(state: &WorldState, count: u32, qualifies: F) -> Vec<AgentOrdinal>
where
    F: Fn(&crate::state::Agent) -> bool,
{
    state
        .agents()
        .filter(|a| qualifies(a))
        .take(count as usize)
        .map(|a| a.ordinal)
        .collect()
}
