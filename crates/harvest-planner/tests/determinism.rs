//! Determinism and property tests on small random maps.
//!
//! Maps are generated from seeded `SmallRng`s so every failure is
//! reproducible from its seed.

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use harvest_planner::{
    AstarPlanner, EconomyConfig, HeuristicKind, PlanError, PlannerConfig, SearchConfig, WorldState,
};
use harvest_types::{
    AgentSnapshot, MapExtent, Position, ResourceAmounts, ResourceKind, ResourceSnapshot,
    TownHallSnapshot, UnitId, WorldSnapshot,
};

const SEEDS: u64 = 24;

fn random_snapshot(rng: &mut SmallRng) -> WorldSnapshot {
    let size = 8;
    let mut cells: Vec<Position> = (0..size)
        .flat_map(|x| (0..size).map(move |y| Position::new(x, y)))
        .collect();
    cells.shuffle(rng);
    let mut cells = cells.into_iter();
    let mut next_cell = || cells.next().unwrap_or(Position::new(0, 0));

    let hall = next_cell();
    let agent_count = rng.gen_range(1..=2);
    let agents = (0..agent_count)
        .map(|i| {
            let cell = next_cell();
            AgentSnapshot::idle(10 + i, cell.x, cell.y)
        })
        .collect();

    let node_count = rng.gen_range(1..=3);
    let resources = (0..node_count)
        .map(|i| {
            let cell = next_cell();
            let kind = if rng.gen_bool(0.5) {
                ResourceKind::Gold
            } else {
                ResourceKind::Wood
            };
            ResourceSnapshot::new(100 + i, kind, cell.x, cell.y, 100 * rng.gen_range(1..=4))
        })
        .collect();

    WorldSnapshot {
        map: MapExtent {
            width: size,
            height: size,
        },
        town_hall: TownHallSnapshot {
            id: UnitId(1),
            position: hall,
            food_capacity: rng.gen_range(1..=3),
        },
        agents,
        resources,
        stockpile: ResourceAmounts::new(if rng.gen_bool(0.3) { 400 } else { 0 }, 0),
        goal: ResourceAmounts::new(100 * rng.gen_range(0..=2), 100 * rng.gen_range(0..=2)),
    }
}

fn planner(heuristic: HeuristicKind) -> AstarPlanner {
    AstarPlanner::new(PlannerConfig {
        search: SearchConfig {
            heuristic,
            max_expansions: 50_000,
            deadline_ms: None,
        },
        ..PlannerConfig::default()
    })
}

/// Optimal remaining cost from `state`, by uniform-cost search.
fn optimal_remaining(state: &WorldState) -> Option<f64> {
    match planner(HeuristicKind::Zero).search(state.clone()) {
        Ok(outcome) => Some(outcome.goal.cost() - state.cost()),
        Err(PlanError::NoPlan { .. }) | Err(PlanError::BudgetExhausted { .. }) => None,
        Err(e) => panic!("unexpected error: {}", e),
    }
}

/// Test that planning twice on the same snapshot yields the same plan text
#[test]
fn test_plan_determinism() {
    for seed in 0..SEEDS {
        let snapshot = random_snapshot(&mut SmallRng::seed_from_u64(seed));
        let first = planner(HeuristicKind::DeliveryDistance).plan(&snapshot);
        let second = planner(HeuristicKind::DeliveryDistance).plan(&snapshot);
        match (first, second) {
            (Ok(a), Ok(b)) => {
                assert_eq!(a.to_text(), b.to_text(), "seed {}", seed);
                assert_eq!(a.stats, b.stats, "seed {}", seed);
            }
            (Err(a), Err(b)) => assert_eq!(a.to_string(), b.to_string(), "seed {}", seed),
            (a, b) => panic!("seed {}: runs disagree: {:?} vs {:?}", seed, a, b),
        }
    }
}

/// Test that the same seed produces the same map
#[test]
fn test_generator_determinism() {
    let a = random_snapshot(&mut SmallRng::seed_from_u64(7));
    let b = random_snapshot(&mut SmallRng::seed_from_u64(7));
    assert_eq!(a, b);
    assert!(a.validate().is_ok());
}

/// Test counters never grow and cost never shrinks along random walks
#[test]
fn test_random_walk_invariants() {
    for seed in 0..SEEDS {
        let mut rng = SmallRng::seed_from_u64(seed);
        let snapshot = random_snapshot(&mut rng);
        let mut state =
            WorldState::from_snapshot(&snapshot, EconomyConfig::default(), HeuristicKind::Zero);

        for _ in 0..12 {
            let successors = state.generate_successors().unwrap();
            let Some(next) = successors.choose(&mut rng) else {
                break;
            };
            assert!(next.required_gold() <= state.required_gold(), "seed {}", seed);
            assert!(next.required_wood() <= state.required_wood(), "seed {}", seed);
            assert!(next.cost() >= state.cost(), "seed {}", seed);
            assert_eq!(next.history().len(), state.history().len() + 1);
            assert!(next.resources().all(|n| {
                state
                    .resource_at(&n.position)
                    .is_some_and(|before| n.amount <= before.amount)
            }));
            assert_eq!(next.is_goal(), next.required_gold() == 0 && next.required_wood() == 0);
            state = next.clone();
        }
    }
}

/// Test the delivery-distance estimate never exceeds the true remaining cost
#[test]
fn test_heuristic_admissible_against_exhaustive_search() {
    let economy = EconomyConfig::default();
    for seed in 0..SEEDS {
        let mut rng = SmallRng::seed_from_u64(seed);
        let snapshot = random_snapshot(&mut rng);
        let mut informed =
            WorldState::from_snapshot(&snapshot, economy, HeuristicKind::DeliveryDistance);
        let mut uniform = WorldState::from_snapshot(&snapshot, economy, HeuristicKind::Zero);

        // Walk the same random path under both estimates
        for _ in 0..4 {
            if let Some(optimal) = optimal_remaining(&uniform) {
                assert!(
                    informed.heuristic() <= optimal + 1e-9,
                    "seed {}: h = {} exceeds optimal {}",
                    seed,
                    informed.heuristic(),
                    optimal
                );
            }

            let successors = uniform.generate_successors().unwrap();
            if successors.is_empty() {
                break;
            }
            let index = rng.gen_range(0..successors.len());
            let action = successors[index]
                .history()
                .last()
                .cloned()
                .expect("successor records its action");
            uniform = successors[index].clone();
            informed = action.apply(&informed).unwrap();
            assert_eq!(informed.key(), uniform.key());
        }
    }
}

/// Test informed search finds plans exactly as cheap as uniform-cost search
#[test]
fn test_informed_search_is_optimal() {
    for seed in 0..SEEDS {
        let snapshot = random_snapshot(&mut SmallRng::seed_from_u64(seed));
        let informed = planner(HeuristicKind::DeliveryDistance).plan(&snapshot);
        let uniform = planner(HeuristicKind::Zero).plan(&snapshot);
        match (informed, uniform) {
            (Ok(a), Ok(b)) => assert!(
                (a.expected_cost - b.expected_cost).abs() < 1e-6,
                "seed {}: {} vs {}",
                seed,
                a.expected_cost,
                b.expected_cost
            ),
            (Err(PlanError::NoPlan { .. }), Err(PlanError::NoPlan { .. })) => {}
            (Err(PlanError::BudgetExhausted { .. }), _) | (_, Err(PlanError::BudgetExhausted { .. })) => {}
            (a, b) => panic!("seed {}: outcomes disagree: {:?} vs {:?}", seed, a, b),
        }
    }
}
