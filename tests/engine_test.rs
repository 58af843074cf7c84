mod common;

use std::time::Duration;

use embodied_bt::{
    bridge::{PrimitiveBridge, PrimitiveStatus, SimulatedBackend},
    config::SimulationConfig,
    driver::{DriveOutcome, SimulatedClock, TickDriver},
    engine::{BehaviorTree, ExecutionStatus},
    parse_plan, resolve,
};
use pretty_assertions::assert_eq;

use common::{document, Call, ScriptedBackend};

fn build(text: &str) -> BehaviorTree {
    let plan = parse_plan(text).unwrap();
    BehaviorTree::build(&resolve(&plan).unwrap()).unwrap()
}

fn drive(text: &str, backend: ScriptedBackend, max_ticks: u64) -> DriveOutcome {
    let mut tree = build(text);
    let mut bridge = PrimitiveBridge::new(backend);
    let mut clock = SimulatedClock::new(Duration::from_millis(100));
    TickDriver::new(max_ticks).run(&mut tree, &mut bridge, &mut clock)
}

#[test]
fn test_scenario_navigate_then_grasp() {
    let backend = ScriptedBackend::new();
    let calls = backend.calls();
    let outcome = drive(
        &document(
            r#"<Sequence>
                 <Action ID="NAVIGATE_TO" obj="apple"/>
                 <Action ID="GRASP" obj="apple"/>
               </Sequence>"#,
        ),
        backend,
        100,
    );
    assert_eq!(
        outcome,
        DriveOutcome::Completed {
            status: ExecutionStatus::Success,
            ticks: 2
        }
    );
    assert_eq!(
        *calls.borrow(),
        vec![
            Call {
                tick: 1,
                primitive: "NAVIGATE_TO".to_string(),
                obj: Some("apple".to_string())
            },
            Call {
                tick: 2,
                primitive: "GRASP".to_string(),
                obj: Some("apple".to_string())
            },
        ]
    );
}

#[test]
fn test_scenario_retry_exhaustion() {
    let backend = ScriptedBackend::new().with_status("GRASP", PrimitiveStatus::Failure);
    let calls = backend.calls();
    let outcome = drive(
        &document(
            r#"<RetryUntilSuccessful num_attempts="3">
                 <Action ID="GRASP" obj="apple"/>
               </RetryUntilSuccessful>"#,
        ),
        backend,
        100,
    );
    assert_eq!(
        outcome,
        DriveOutcome::Completed {
            status: ExecutionStatus::Failure,
            ticks: 3
        }
    );
    assert_eq!(calls.borrow().len(), 3);
}

#[test]
fn test_scenario_timeout_on_crossing_tick() {
    let backend = ScriptedBackend::new().with_status("NAVIGATE_TO", PrimitiveStatus::Running);
    let calls = backend.calls();
    let aborts = backend.aborts();
    let outcome = drive(
        &document(r#"<Timeout msec="5000"><Action ID="NAVIGATE_TO" obj="fridge"/></Timeout>"#),
        backend,
        1000,
    );
    // tick n is credited 100ms * (n - 1); tick 51 is the first at 5000ms
    assert_eq!(
        outcome,
        DriveOutcome::Completed {
            status: ExecutionStatus::Failure,
            ticks: 51
        }
    );
    assert_eq!(calls.borrow().len(), 50);
    assert_eq!(*aborts.borrow(), vec!["NAVIGATE_TO".to_string()]);
}

#[test]
fn test_timeout_propagates_child_result_within_budget() {
    let outcome = drive(
        &document(
            r#"<Timeout msec="5000">
                 <Sequence>
                   <Action ID="NAVIGATE_TO" obj="apple"/>
                   <Action ID="GRASP" obj="apple"/>
                 </Sequence>
               </Timeout>"#,
        ),
        ScriptedBackend::new().with_status("GRASP", PrimitiveStatus::Failure),
        100,
    );
    assert_eq!(
        outcome,
        DriveOutcome::Completed {
            status: ExecutionStatus::Failure,
            ticks: 2
        }
    );
}

#[test]
fn test_sequence_failure_skips_later_siblings() {
    let backend = ScriptedBackend::new().with_status("OPEN", PrimitiveStatus::Failure);
    let calls = backend.calls();
    drive(
        &document(
            r#"<Sequence>
                 <Action ID="NAVIGATE_TO" obj="fridge"/>
                 <Action ID="OPEN" obj="fridge"/>
                 <Action ID="GRASP" obj="milk"/>
               </Sequence>"#,
        ),
        backend,
        100,
    );
    let dispatched: Vec<String> = calls.borrow().iter().map(|c| c.primitive.clone()).collect();
    assert_eq!(dispatched, vec!["NAVIGATE_TO", "OPEN"]);
}

#[test]
fn test_fallback_condition_short_circuits() {
    let backend = ScriptedBackend::new().with_predicate("IS_HOLDING", "apple", true);
    let calls = backend.calls();
    let outcome = drive(
        &document(
            r#"<Fallback>
                 <Condition ID="IS_HOLDING" obj="apple"/>
                 <Action ID="GRASP" obj="apple"/>
               </Fallback>"#,
        ),
        backend,
        100,
    );
    assert_eq!(
        outcome,
        DriveOutcome::Completed {
            status: ExecutionStatus::Success,
            ticks: 1
        }
    );
    assert!(calls.borrow().is_empty());
}

#[test]
fn test_running_child_is_resumed_not_restarted() {
    // NAVIGATE_TO keeps running; earlier siblings must not be re-ticked
    let backend = ScriptedBackend::new().with_status("NAVIGATE_TO", PrimitiveStatus::Running);
    let calls = backend.calls();
    let outcome = drive(
        &document(
            r#"<Sequence>
                 <Action ID="OPEN" obj="door"/>
                 <Action ID="NAVIGATE_TO" obj="kitchen"/>
               </Sequence>"#,
        ),
        backend,
        10,
    );
    assert_eq!(outcome, DriveOutcome::BudgetExhausted { ticks: 10 });
    let opens = calls
        .borrow()
        .iter()
        .filter(|call| call.primitive == "OPEN")
        .count();
    assert_eq!(opens, 1);
}

#[test]
fn test_subtree_matches_manual_inlining() {
    let with_subtree = r#"<root main_tree_to_execute="MainTree">
      <BehaviorTree ID="MainTree">
        <Sequence>
          <SubTree ID="Navigate" target="apple"/>
          <Action ID="GRASP" obj="apple"/>
        </Sequence>
      </BehaviorTree>
      <BehaviorTree ID="Navigate">
        <Sequence>
          <Action ID="NAVIGATE_TO" obj="{target}"/>
          <Condition ID="IS_REACHABLE" obj="{target}"/>
        </Sequence>
      </BehaviorTree>
    </root>"#;
    let inlined = document(
        r#"<Sequence>
             <Sequence>
               <Action ID="NAVIGATE_TO" obj="apple"/>
               <Condition ID="IS_REACHABLE" obj="apple"/>
             </Sequence>
             <Action ID="GRASP" obj="apple"/>
           </Sequence>"#,
    );

    let run = |text: &str| {
        let backend = ScriptedBackend::new().with_predicate("IS_REACHABLE", "apple", true);
        let calls = backend.calls();
        let outcome = drive(text, backend, 100);
        let calls = calls.borrow().clone();
        (outcome, calls)
    };
    assert_eq!(run(with_subtree), run(inlined.as_str()));
}

#[test]
fn test_simulated_backend_multi_tick_plan() {
    let mut tree = build(&document(
        r#"<Sequence>
             <Action ID="NAVIGATE_TO" obj="apple"/>
             <Action ID="GRASP" obj="apple"/>
             <Action ID="NAVIGATE_TO" obj="table"/>
             <Action ID="PLACE_ON_TOP" obj="table"/>
             <Action ID="RELEASE"/>
           </Sequence>"#,
    ));
    let mut bridge = PrimitiveBridge::new(SimulatedBackend::new(SimulationConfig::default()));
    let mut clock = SimulatedClock::new(Duration::from_millis(100));
    let outcome = TickDriver::new(1000).run(&mut tree, &mut bridge, &mut clock);
    // 5 + 3 + 5 + 3 + 2 steps, one dispatch per tick
    assert_eq!(
        outcome,
        DriveOutcome::Completed {
            status: ExecutionStatus::Success,
            ticks: 18
        }
    );
    assert_eq!(bridge.dispatch_count(), 18);
    assert!(bridge.trace().failures.is_empty());
}

#[test]
fn test_simulated_timeout_aborts_navigation() {
    let config = SimulationConfig {
        navigation_steps: 100,
        ..SimulationConfig::default()
    };
    let mut tree = build(&document(
        r#"<Sequence>
             <Timeout msec="1000"><Action ID="NAVIGATE_TO" obj="garage"/></Timeout>
             <Action ID="OPEN" obj="garage"/>
           </Sequence>"#,
    ));
    let mut bridge = PrimitiveBridge::new(SimulatedBackend::new(config));
    let mut clock = SimulatedClock::new(Duration::from_millis(100));
    let outcome = TickDriver::new(1000).run(&mut tree, &mut bridge, &mut clock);
    assert_eq!(
        outcome,
        DriveOutcome::Completed {
            status: ExecutionStatus::Failure,
            ticks: 11
        }
    );
    assert_eq!(bridge.dispatch_count(), 10);
}
