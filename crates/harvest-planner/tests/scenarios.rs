//! End-to-end planning scenarios on the fixture maps.

use harvest_planner::{
    AstarPlanner, EconomyConfig, GroundedAction, HeuristicKind, PlanError, PlannerConfig,
    SearchConfig, WorldState,
};
use harvest_types::{fixtures, ResourceAmounts, ResourceKind, ResourceSnapshot, WorldSnapshot};

fn planner_with(economy: EconomyConfig, heuristic: HeuristicKind) -> AstarPlanner {
    AstarPlanner::new(PlannerConfig {
        economy,
        search: SearchConfig {
            heuristic,
            ..SearchConfig::default()
        },
        ..PlannerConfig::default()
    })
}

fn no_build() -> EconomyConfig {
    EconomyConfig {
        allow_build: false,
        ..EconomyConfig::default()
    }
}

/// Re-applies each step from the root, checking the path invariants.
fn replay(snapshot: &WorldSnapshot, steps: &[GroundedAction], economy: EconomyConfig) -> WorldState {
    let mut state = WorldState::from_snapshot(snapshot, economy, HeuristicKind::Zero);
    for step in steps {
        assert!(step.preconditions_met(&state), "step not applicable: {}", step);
        let next = step.apply(&state).unwrap();

        assert!(next.required_gold() <= state.required_gold());
        assert!(next.required_wood() <= state.required_wood());
        assert!(next.cost() >= state.cost());
        assert_eq!(next.history().last(), Some(step));
        assert_eq!(step.participants().len() as u32, match step {
            GroundedAction::BuildAgent(_) => 0,
            _ => step.group_size(),
        });
        state = next;
    }
    state
}

#[test]
fn test_one_trip_for_one_load() {
    let snapshot = fixtures::single_gold();
    let plan = AstarPlanner::with_defaults().plan(&snapshot).unwrap();

    assert_eq!(plan.len(), 2);
    match (&plan.steps[0], &plan.steps[1]) {
        (GroundedAction::Harvest(h), GroundedAction::Deposit(d)) => {
            assert_eq!(h.kind, ResourceKind::Gold);
            assert_eq!(h.group_size, 1);
            assert_eq!(h.node, snapshot.resources[0].id);
            assert_eq!(d.group_size, 1);
            assert_eq!(d.town_hall, snapshot.town_hall.id);
        }
        other => panic!("unexpected plan {:?}", other),
    }

    let goal = replay(&snapshot, &plan.steps, EconomyConfig::default());
    assert_eq!(goal.required_gold(), 0);
    assert!(goal.is_goal());
    assert!((goal.cost() - plan.expected_cost).abs() < 1e-9);
}

#[test]
fn test_two_loads_take_two_trips() {
    let snapshot = fixtures::single_gold().with_goal(ResourceAmounts::new(200, 0));
    let plan = AstarPlanner::with_defaults().plan(&snapshot).unwrap();
    let names: Vec<&str> = plan.steps.iter().map(|s| s.name()).collect();
    assert_eq!(names, vec!["HarvestGold", "Deposit", "HarvestGold", "Deposit"]);
    // 3 out, 4 back, 4 out, 4 back
    assert!((plan.expected_cost - 15.0).abs() < 1e-9);
}

#[test]
fn test_no_workers_no_plan() {
    let result = AstarPlanner::with_defaults().plan(&fixtures::no_agents());
    assert!(matches!(result, Err(PlanError::NoPlan { expanded: 1 })));
}

#[test]
fn test_goal_at_root_is_empty_plan_not_failure() {
    let snapshot = fixtures::gold_and_wood().with_goal(ResourceAmounts::new(0, 0));
    let plan = AstarPlanner::with_defaults().plan(&snapshot).unwrap();
    assert!(plan.is_empty());
    assert_eq!(plan.expected_cost, 0.0);

    // Stockpile already covering the goal is the same thing
    let mut covered = fixtures::single_gold();
    covered.stockpile = ResourceAmounts::new(100, 0);
    assert!(AstarPlanner::with_defaults().plan(&covered).unwrap().is_empty());
}

#[test]
fn test_depleted_source_reports_failure() {
    let mut snapshot = fixtures::gold_and_wood().with_goal(ResourceAmounts::new(200, 0));
    snapshot.resources = vec![ResourceSnapshot::new(10, ResourceKind::Gold, 10, 4, 100)];

    for economy in [EconomyConfig::default(), no_build()] {
        let result = planner_with(economy, HeuristicKind::DeliveryDistance).plan(&snapshot);
        assert!(matches!(result, Err(PlanError::NoPlan { .. })), "{:?}", result);
    }

    // A second source makes the goal reachable
    snapshot
        .resources
        .push(ResourceSnapshot::new(11, ResourceKind::Gold, 4, 12, 100));
    let plan = AstarPlanner::with_defaults().plan(&snapshot).unwrap();
    let goal = replay(&snapshot, &plan.steps, EconomyConfig::default());
    assert!(goal.is_goal());
}

#[test]
fn test_mixed_goal_path_invariants() {
    let snapshot = fixtures::gold_and_wood().with_goal(ResourceAmounts::new(200, 100));
    let plan = AstarPlanner::with_defaults().plan(&snapshot).unwrap();
    assert!(!plan.is_empty());

    let goal = replay(&snapshot, &plan.steps, EconomyConfig::default());
    assert!(goal.is_goal());
    assert!((goal.cost() - plan.expected_cost).abs() < 1e-9);
    assert!(plan.steps.iter().any(|s| s.name() == "HarvestWood"));
    assert!(plan.steps.iter().any(|s| s.name() == "HarvestGold"));
}

#[test]
fn test_heuristic_search_matches_uniform_cost() {
    let snapshot = fixtures::single_gold().with_goal(ResourceAmounts::new(300, 0));
    let informed = planner_with(no_build(), HeuristicKind::DeliveryDistance)
        .plan(&snapshot)
        .unwrap();
    let uniform = planner_with(no_build(), HeuristicKind::Zero)
        .plan(&snapshot)
        .unwrap();
    assert!((informed.expected_cost - uniform.expected_cost).abs() < 1e-9);
    assert!(informed.stats.expanded <= uniform.stats.expanded);
}

#[test]
fn test_training_used_when_it_pays_off() {
    let snapshot = fixtures::build_economy();
    let plan = AstarPlanner::with_defaults().plan(&snapshot).unwrap();
    let goal = replay(&snapshot, &plan.steps, EconomyConfig::default());
    assert!(goal.is_goal());

    // Without training the single worker needs five round trips
    let solo = planner_with(no_build(), HeuristicKind::DeliveryDistance)
        .plan(&snapshot)
        .unwrap();
    assert!(plan.expected_cost <= solo.expected_cost + 1e-9);
    assert!(solo.steps.iter().all(|s| s.name() != "BuildPeasant"));
    assert_eq!(solo.len(), 10);
}

#[test]
fn test_carried_cargo_is_delivered_first() {
    let mut snapshot = fixtures::single_gold();
    snapshot.agents[0].cargo = Some(harvest_types::Cargo::new(ResourceKind::Gold, 100));
    let plan = AstarPlanner::with_defaults().plan(&snapshot).unwrap();
    let names: Vec<&str> = plan.steps.iter().map(|s| s.name()).collect();
    assert_eq!(names, vec!["Deposit"]);
    assert!((plan.expected_cost - 1.0).abs() < 1e-9);
}
