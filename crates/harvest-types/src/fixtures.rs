//! Sample snapshots for testing.
//!
//! Enable the `test-fixtures` feature to access these helpers from other
//! crates.
//!
//! # Example
//!
//! ```ignore
//! // In your Cargo.toml:
//! // [dev-dependencies]
//! // harvest-types = { path = "../harvest-types", features = ["test-fixtures"] }
//!
//! use harvest_types::fixtures;
//!
//! let snapshot = fixtures::single_gold();
//! ```

use crate::WorldSnapshot;

fn parse(name: &str, json: &str) -> WorldSnapshot {
    WorldSnapshot::from_json(json)
        .unwrap_or_else(|e| panic!("Failed to parse fixture {}: {}", name, e))
}

/// One worker beside the town hall and one gold node holding 300.
///
/// Goal: 100 gold.
pub fn single_gold() -> WorldSnapshot {
    parse("single_gold.json", include_str!("../tests/fixtures/single_gold.json"))
}

/// Two workers, two gold nodes and two forests at different distances.
///
/// Goal: 300 gold, 200 wood. Food for two more workers.
pub fn gold_and_wood() -> WorldSnapshot {
    parse("gold_and_wood.json", include_str!("../tests/fixtures/gold_and_wood.json"))
}

/// A town hall with resources but no workers.
pub fn no_agents() -> WorldSnapshot {
    parse("no_agents.json", include_str!("../tests/fixtures/no_agents.json"))
}

/// One worker, a rich gold node, and 400 gold already banked, enough to
/// train a second worker straight away.
pub fn build_economy() -> WorldSnapshot {
    parse("build_economy.json", include_str!("../tests/fixtures/build_economy.json"))
}
