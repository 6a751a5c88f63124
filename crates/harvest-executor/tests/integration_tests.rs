//! Integration tests for plan execution.
//!
//! Observations are scripted turn by turn, standing in for the game.

use harvest_executor::{
    Coordinator, ExecutionConfig, ExecutionError, ExecutionStatus, ExecutorConfig, MissionError,
    MissionStatus, PlanExecutor,
};
use harvest_planner::{AgentOrdinal, Plan, PlannerConfig};
use harvest_types::{
    fixtures, AgentSnapshot, Command, Feedback, ResourceAmounts, ResourceId, TurnObservation, UnitId,
    UnitTemplate, UnitView, WorldSnapshot,
};
use std::fs;
use tempfile::tempdir;

/// Builds a plan for `snapshot` from text lines.
fn scripted_plan(snapshot: &WorldSnapshot, text: &str) -> Plan {
    let steps = Plan::parse_steps(text).expect("Failed to parse plan text");
    Plan::from_steps(snapshot, steps)
}

fn coordinator(max_replans: u32) -> Coordinator {
    Coordinator::new(
        PlannerConfig::default(),
        ExecutorConfig {
            execution: ExecutionConfig {
                max_replans,
                save_plans: false,
            },
        },
    )
}

/// Test that a joint action with one completion and one failure does not
/// advance and asks for a new plan exactly once.
#[test]
fn test_partial_failure_requests_single_replan() {
    let snapshot = fixtures::gold_and_wood();
    let plan = scripted_plan(
        &snapshot,
        "HarvestGold(10, (5, 4), (10, 4), 2, [1, 2])\nDeposit(1, (10, 4), (4, 4), 2, [1, 2])\n",
    );
    let mut executor = PlanExecutor::new(&plan);

    let first = executor.step(&TurnObservation::new(1)).unwrap();
    assert_eq!(first.commands.len(), 2);
    assert_eq!(
        first.commands.get(&UnitId(2)),
        Some(&Command::Gather { node: ResourceId(10) })
    );
    assert_eq!(
        first.commands.get(&UnitId(3)),
        Some(&Command::Gather { node: ResourceId(10) })
    );

    let mut replan_reports = 0;
    let feedback = TurnObservation::new(2)
        .with_feedback(UnitId(2), Feedback::Completed)
        .with_feedback(UnitId(3), Feedback::Failed);
    let directive = executor.step(&feedback).unwrap();
    assert!(directive.commands.is_empty());
    if let ExecutionStatus::ReplanRequired { failed } = &directive.status {
        assert_eq!(failed, &vec![UnitId(3)]);
        replan_reports += 1;
    }

    for turn in 3..8 {
        let directive = executor
            .step(&TurnObservation::new(turn).with_feedback(UnitId(2), Feedback::Completed))
            .unwrap();
        assert!(directive.commands.is_empty());
        if matches!(directive.status, ExecutionStatus::ReplanRequired { .. }) {
            replan_reports += 1;
        }
        assert_eq!(directive.status, ExecutionStatus::AwaitingReplan);
    }

    assert_eq!(replan_reports, 1);
    assert_eq!(executor.completed_steps(), 0);
    assert_eq!(executor.current_action().map(|a| a.name()), Some("HarvestGold"));
    assert!(executor.awaiting_replan());
}

/// Test that a joint action waits for every participant.
#[test]
fn test_joint_action_waits_for_all() {
    let snapshot = fixtures::gold_and_wood();
    let plan = scripted_plan(
        &snapshot,
        "HarvestGold(10, (5, 4), (10, 4), 2, [1, 2])\nDeposit(1, (10, 4), (4, 4), 2, [1, 2])\n",
    );
    let mut executor = PlanExecutor::new(&plan);
    executor.step(&TurnObservation::new(1)).unwrap();

    let half = executor
        .step(&TurnObservation::new(2).with_feedback(UnitId(2), Feedback::Completed))
        .unwrap();
    assert!(half.commands.is_empty());
    assert_eq!(half.status, ExecutionStatus::Running);
    assert_eq!(executor.pending_units(), vec![UnitId(3)]);

    // Unit 2 is not re-issued its command while unit 3 is still working
    let still = executor
        .step(&TurnObservation::new(3).with_feedback(UnitId(3), Feedback::Pending))
        .unwrap();
    assert!(still.commands.is_empty());

    let both = executor
        .step(
            &TurnObservation::new(4)
                .with_agents([UnitView::new(2, 10, 4), UnitView::new(3, 5, 5)])
                .with_feedback(UnitId(3), Feedback::Completed),
        )
        .unwrap();
    assert_eq!(executor.completed_steps(), 1);
    assert_eq!(
        both.commands.get(&UnitId(2)),
        Some(&Command::Deposit { town_hall: UnitId(1) })
    );
    assert_eq!(
        both.commands.get(&UnitId(3)),
        Some(&Command::DepositAt {
            direction: harvest_types::Direction::NorthWest
        })
    );
}

/// Test that a trained worker is bound before the action that uses it.
#[test]
fn test_trained_worker_bound_on_first_sighting() {
    let snapshot = fixtures::build_economy();
    let plan = scripted_plan(
        &snapshot,
        "BuildPeasant(1, (2, 2))\nHarvestGold(30, (2, 2), (3, 4), 1, [2])\n",
    );
    let mut executor = PlanExecutor::new(&plan);

    let produce = executor
        .step(&TurnObservation::new(1).with_agents([UnitView::new(5, 3, 2)]))
        .unwrap();
    assert_eq!(
        produce.commands.get(&UnitId(1)),
        Some(&Command::Produce { template: UnitTemplate::Peasant })
    );

    let next = executor
        .step(
            &TurnObservation::new(2)
                .with_agents([UnitView::new(5, 3, 2), UnitView::new(42, 2, 2)])
                .with_feedback(UnitId(1), Feedback::Completed),
        )
        .unwrap();
    assert_eq!(executor.bindings().get(&AgentOrdinal(2)), Some(&UnitId(42)));
    assert_eq!(
        next.commands.get(&UnitId(42)),
        Some(&Command::Gather { node: ResourceId(30) })
    );
    assert!(!next.commands.contains_key(&UnitId(5)));
}

/// Test that a worker dying while idle fails a later step that names it.
#[test]
fn test_idle_death_named_by_later_step_requests_replan() {
    let snapshot = fixtures::gold_and_wood();
    let plan = scripted_plan(
        &snapshot,
        "HarvestGold(10, (5, 4), (10, 4), 1, [1])\nHarvestGold(10, (4, 5), (10, 4), 1, [2])\n",
    );
    let mut executor = PlanExecutor::new(&plan);

    let first = executor.step(&TurnObservation::new(1)).unwrap();
    assert_eq!(first.commands.len(), 1);
    assert!(first.commands.contains_key(&UnitId(2)));

    let mut replan_reports = 0;
    for turn in 2..8 {
        let directive = executor
            .step(
                &TurnObservation::new(turn)
                    .with_death(UnitId(3))
                    .with_feedback(UnitId(2), Feedback::Completed),
            )
            .unwrap();
        assert!(directive.commands.is_empty());
        match directive.status {
            ExecutionStatus::ReplanRequired { failed } => {
                assert_eq!(turn, 2);
                assert_eq!(failed, vec![UnitId(3)]);
                replan_reports += 1;
            }
            status => assert_eq!(status, ExecutionStatus::AwaitingReplan),
        }
    }

    assert_eq!(replan_reports, 1);
    assert!(executor.awaiting_replan());
    assert!(!executor.bindings().contains_key(&AgentOrdinal(2)));
}

/// Test that an idle death not named by any remaining step is harmless.
#[test]
fn test_idle_death_of_unused_worker_keeps_running() {
    let snapshot = fixtures::gold_and_wood();
    let plan = scripted_plan(&snapshot, "HarvestGold(10, (5, 4), (10, 4), 1, [1])\n");
    let mut executor = PlanExecutor::new(&plan);
    executor.step(&TurnObservation::new(1)).unwrap();

    let directive = executor
        .step(&TurnObservation::new(2).with_death(UnitId(3)))
        .unwrap();
    assert_eq!(directive.status, ExecutionStatus::Running);
    assert_eq!(executor.pending_units(), vec![UnitId(2)]);
}

/// Test that an unbound ordinal fails the dispatch turn but can be retried.
#[test]
fn test_unbound_ordinal_is_retried() {
    let snapshot = fixtures::build_economy();
    let plan = scripted_plan(&snapshot, "HarvestGold(30, (2, 2), (3, 4), 1, [2])\n");
    let mut executor = PlanExecutor::new(&plan);

    let err = executor.step(&TurnObservation::new(1)).unwrap_err();
    assert_eq!(
        err,
        ExecutionError::UnboundAgent {
            ordinal: AgentOrdinal(2),
            action: "HarvestGold(30, (2, 2), (3, 4), 1, [2])".to_string(),
        }
    );

    let retry = executor
        .step(&TurnObservation::new(2).with_agents([UnitView::new(5, 3, 2), UnitView::new(8, 3, 3)]))
        .unwrap();
    assert_eq!(
        retry.commands.get(&UnitId(8)),
        Some(&Command::GatherAt {
            direction: harvest_types::Direction::South
        })
    );
}

/// Test a full mission that survives one failure.
#[test]
fn test_coordinator_replans_after_failure() {
    let snapshot = fixtures::single_gold();
    let mut mission = coordinator(3);
    let first_id = mission.start(&snapshot).unwrap().id;
    assert_eq!(mission.current_plan().map(|p| p.len()), Some(2));

    let t1 = mission.turn(&snapshot, &TurnObservation::new(1)).unwrap();
    assert_eq!(t1.status, MissionStatus::Executing);
    assert_eq!(t1.commands.len(), 1);

    let t2 = mission
        .turn(&snapshot, &TurnObservation::new(2).with_feedback(UnitId(2), Feedback::Failed))
        .unwrap();
    assert_eq!(t2.status, MissionStatus::Replanned { attempt: 1 });
    assert_eq!(
        t2.commands.get(&UnitId(2)),
        Some(&Command::Gather { node: ResourceId(10) })
    );
    assert_ne!(mission.current_plan().map(|p| p.id), Some(first_id));
    assert_eq!(mission.replan_count(), 1);

    let t3 = mission
        .turn(&snapshot, &TurnObservation::new(3).with_feedback(UnitId(2), Feedback::Completed))
        .unwrap();
    assert_eq!(t3.status, MissionStatus::Executing);
    assert_eq!(
        t3.commands.get(&UnitId(2)),
        Some(&Command::Deposit { town_hall: UnitId(1) })
    );

    let mut delivered = snapshot.clone();
    delivered.stockpile = ResourceAmounts::new(100, 0);
    let t4 = mission
        .turn(&delivered, &TurnObservation::new(4).with_feedback(UnitId(2), Feedback::Completed))
        .unwrap();
    assert_eq!(t4.status, MissionStatus::Complete);
    assert!(t4.commands.is_empty());
}

/// Test that losing a planned worker before its action re-plans once and the
/// mission still completes.
#[test]
fn test_coordinator_replans_after_idle_death() {
    let survivors = fixtures::single_gold();
    let mut snapshot = survivors.clone();
    snapshot.agents.push(AgentSnapshot::idle(3, 8, 5));

    let mut mission = coordinator(3);
    let plan = mission.start(&snapshot).unwrap();
    assert!(plan
        .steps
        .iter()
        .all(|step| step.participants() == [AgentOrdinal(2)]));

    let mut replans = 0;
    let t1 = mission
        .turn(
            &survivors,
            &TurnObservation::new(1)
                .with_agents([UnitView::new(2, 6, 5)])
                .with_death(UnitId(3)),
        )
        .unwrap();
    if matches!(t1.status, MissionStatus::Replanned { .. }) {
        replans += 1;
    }
    assert_eq!(t1.status, MissionStatus::Replanned { attempt: 1 });
    assert_eq!(
        t1.commands.get(&UnitId(2)),
        Some(&Command::Gather { node: ResourceId(10) })
    );
    let installed: Vec<_> = mission.executor().unwrap().remaining_steps().cloned().collect();
    assert_eq!(mission.current_plan().map(|p| &p.steps), Some(&installed));

    let t2 = mission
        .turn(&survivors, &TurnObservation::new(2).with_feedback(UnitId(2), Feedback::Completed))
        .unwrap();
    if matches!(t2.status, MissionStatus::Replanned { .. }) {
        replans += 1;
    }
    assert_eq!(
        t2.commands.get(&UnitId(2)),
        Some(&Command::Deposit { town_hall: UnitId(1) })
    );

    let mut delivered = survivors.clone();
    delivered.stockpile = ResourceAmounts::new(100, 0);
    let t3 = mission
        .turn(&delivered, &TurnObservation::new(3).with_feedback(UnitId(2), Feedback::Completed))
        .unwrap();
    assert_eq!(t3.status, MissionStatus::Complete);
    assert_eq!(replans, 1);
    assert_eq!(mission.replan_count(), 1);
}

/// Test that a plan finishing short of the goal triggers a new plan.
#[test]
fn test_coordinator_replans_when_goal_not_reached() {
    let snapshot = fixtures::single_gold();
    let mut mission = coordinator(3);
    mission.start(&snapshot).unwrap();

    mission.turn(&snapshot, &TurnObservation::new(1)).unwrap();
    mission
        .turn(&snapshot, &TurnObservation::new(2).with_feedback(UnitId(2), Feedback::Completed))
        .unwrap();
    // Deposit reported done but the stockpile never moved
    let t3 = mission
        .turn(&snapshot, &TurnObservation::new(3).with_feedback(UnitId(2), Feedback::Completed))
        .unwrap();
    assert_eq!(t3.status, MissionStatus::Replanned { attempt: 1 });
    assert_eq!(t3.commands.len(), 1);
}

/// Test that the re-plan limit halts the mission.
#[test]
fn test_coordinator_replan_limit() {
    let snapshot = fixtures::single_gold();
    let mut mission = coordinator(0);
    mission.start(&snapshot).unwrap();
    mission.turn(&snapshot, &TurnObservation::new(1)).unwrap();

    let err = mission
        .turn(&snapshot, &TurnObservation::new(2).with_feedback(UnitId(2), Feedback::Failed))
        .unwrap_err();
    assert!(matches!(err, MissionError::ReplanLimit { limit: 0 }));
    assert!(mission.is_halted());
    assert!(matches!(
        mission.turn(&snapshot, &TurnObservation::new(3)),
        Err(MissionError::Halted)
    ));
}

/// Test that a re-plan finding nothing is fatal.
#[test]
fn test_coordinator_no_plan_after_failure_is_fatal() {
    let snapshot = fixtures::single_gold();
    let mut mission = coordinator(3);
    mission.start(&snapshot).unwrap();
    mission.turn(&snapshot, &TurnObservation::new(1)).unwrap();

    let mut exhausted = snapshot.clone();
    exhausted.resources.clear();
    let err = mission
        .turn(&exhausted, &TurnObservation::new(2).with_feedback(UnitId(2), Feedback::Failed))
        .unwrap_err();
    assert!(matches!(err, MissionError::NoPlan));
    assert!(mission.is_halted());
}

/// Test start-up failures.
#[test]
fn test_coordinator_start_errors() {
    let mut mission = Coordinator::with_defaults();
    assert!(matches!(
        mission.turn(&fixtures::single_gold(), &TurnObservation::new(1)),
        Err(MissionError::NotStarted)
    ));
    assert!(matches!(
        mission.start(&fixtures::no_agents()),
        Err(MissionError::NoPlan)
    ));
}

/// Test that plans are written when configured.
#[test]
fn test_coordinator_saves_plans() {
    let dir = tempdir().unwrap();
    let plan_path = dir.path().join("saves").join("plan.txt");

    let mut planner_config = PlannerConfig::default();
    planner_config.output.plan_path = plan_path.clone();
    planner_config.output.write_json = true;
    let mut mission = Coordinator::new(
        planner_config,
        ExecutorConfig {
            execution: ExecutionConfig {
                max_replans: 1,
                save_plans: true,
            },
        },
    );

    let text = mission.start(&fixtures::single_gold()).unwrap().to_text();
    assert_eq!(fs::read_to_string(&plan_path).unwrap(), text);
    let saved = Plan::load_json(plan_path.with_extension("json")).unwrap();
    assert_eq!(Some(&saved), mission.current_plan());
}

/// Test status serialization used in mission logs.
#[test]
fn test_status_serialization() {
    let json = serde_json::to_string(&MissionStatus::Replanned { attempt: 2 }).unwrap();
    assert_eq!(json, r#"{"status":"replanned","attempt":2}"#);
    let json = serde_json::to_string(&ExecutionStatus::ReplanRequired {
        failed: vec![UnitId(3)],
    })
    .unwrap();
    assert_eq!(json, r#"{"status":"replan_required","failed":[3]}"#);
}
