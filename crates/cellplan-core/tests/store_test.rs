//! Integration tests for `PlanStore` over a scripted remote cell.

use std::sync::Arc;
use std::time::Duration;

use cellplan_core::plan::{Annotation, decode, render_plan};
use cellplan_core::{PlanError, PlanStore, PlanTemplate, TaskStatus, Transition, WriteMode};
use cellplan_sheets::{CellRef, RemoteError, ResilientCell, RetryPolicy};
use cellplan_test_utils::{Op, ScriptedTransport};
use chrono::Local;

const SCENARIO: &str = "\
# Plan: Test
Goal: Ship it
### Phase 1: Build
- [ ] 1.1 Write code
- [ ] 1.2 Write tests
";

fn plan_cell() -> CellRef {
    "_plan!A1".parse().expect("valid cell ref")
}

fn store(transport: &Arc<ScriptedTransport>) -> PlanStore {
    let policy = RetryPolicy::default()
        .with_max_attempts(3)
        .with_delays(Duration::from_millis(5), Duration::from_millis(20));
    PlanStore::new(ResilientCell::new(transport.clone(), plan_cell(), policy))
}

fn seeded(text: &str) -> Arc<ScriptedTransport> {
    Arc::new(ScriptedTransport::with_cell(&plan_cell(), text))
}

// ---------------------------------------------------------------------------
// Scenario
// ---------------------------------------------------------------------------

#[tokio::test]
async fn start_then_complete_then_next() {
    let transport = seeded(SCENARIO);
    let store = store(&transport);

    store.update_task("1.1", Transition::Doing).await.unwrap();
    store.update_task("1.1", Transition::Done).await.unwrap();

    let text = transport.stored(&plan_cell()).await.unwrap();
    let today = Local::now().date_naive().format("%Y-%m-%d").to_string();
    let line = text.lines().nth(3).unwrap();
    assert_eq!(line, format!("- [x] 1.1 Write code ✅ {today}"));

    let next = store.get_next_task().await.unwrap().expect("a todo task");
    assert_eq!(next.step, "1.2");
}

// ---------------------------------------------------------------------------
// Codec properties through the store
// ---------------------------------------------------------------------------

#[tokio::test]
async fn created_plan_round_trips() {
    let transport = seeded("");
    let store = store(&transport);
    let template = PlanTemplate::new("Budget review", "Reconcile Q1")
        .phase("Collect", ["Export ledger", "Export bank statements"])
        .phase("Reconcile", ["Match rows", "Flag gaps", "Summarize"]);

    store.create_plan(&template).await.unwrap();
    let plan = store.get_plan().await.unwrap().expect("plan");

    assert_eq!(plan.title, template.title);
    assert_eq!(plan.goal, template.goal);
    assert_eq!(plan.phases.len(), template.phases.len());
    for (phase, expected) in plan.phases.iter().zip(&template.phases) {
        let titles: Vec<&str> = phase.tasks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, expected.steps);
        for (idx, task) in phase.tasks.iter().enumerate() {
            assert_eq!(task.step, format!("{}.{}", phase.number, idx + 1));
            assert_eq!(task.status, TaskStatus::Todo);
        }
    }
    assert_eq!(decode(&plan.raw).unwrap(), plan);
}

#[tokio::test]
async fn every_mutation_touches_exactly_one_line() {
    let template = PlanTemplate::new("T", "G")
        .phase("A", ["a1", "a2"])
        .phase("B", ["b1"]);
    let original = format!("{}Some note\n", render_plan(&template));

    let transitions = [
        Transition::Doing,
        Transition::Done,
        Transition::blocked("waiting"),
        Transition::review("look"),
    ];
    for step in ["1.1", "1.2", "2.1"] {
        for transition in transitions.clone() {
            let transport = seeded(&original);
            store(&transport)
                .update_task(step, transition.clone())
                .await
                .unwrap();
            let updated = transport.stored(&plan_cell()).await.unwrap();

            let before: Vec<&str> = original.split('\n').collect();
            let after: Vec<&str> = updated.split('\n').collect();
            assert_eq!(before.len(), after.len());
            let changed = before.iter().zip(&after).filter(|(a, b)| a != b).count();
            assert_eq!(changed, 1, "{step} {transition:?}");
        }
    }
}

#[tokio::test]
async fn annotations_are_exclusive_after_each_transition() {
    let transport = seeded(SCENARIO);
    let store = store(&transport);

    let sequence = [
        Transition::Doing,
        Transition::blocked("no access"),
        Transition::Doing,
        Transition::review("check totals"),
        Transition::Doing,
        Transition::Done,
        Transition::review("reopened"),
    ];
    for transition in sequence {
        let expected = transition.target();
        let task = store.update_task("1.1", transition).await.unwrap();
        assert_eq!(task.status, expected);
        assert_eq!(task.title, "Write code");

        let populated = [
            task.completed_date.is_some(),
            task.blocked_reason.is_some(),
            task.review_note.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count();
        match (expected, task.annotation()) {
            (TaskStatus::Doing, None) => assert_eq!(populated, 0),
            (TaskStatus::Done, Some(Annotation::Completed(_)))
            | (TaskStatus::Blocked, Some(Annotation::BlockedReason(_)))
            | (TaskStatus::Review, Some(Annotation::ReviewNote(_))) => assert_eq!(populated, 1),
            other => panic!("unexpected annotation state: {other:?}"),
        }
    }
}

#[tokio::test]
async fn dashed_title_survives_block_and_restart() {
    let transport = seeded("### Phase 1: Layout\n- [ ] 1.1 Compare old — new layout\n");
    let store = store(&transport);

    store.start("1.1").await.unwrap();
    let blocked = store.block("1.1", "waiting — on design").await.unwrap();
    assert_eq!(blocked.title, "Compare old — new layout");
    assert_eq!(blocked.blocked_reason.as_deref(), Some("waiting - on design"));

    store.start("1.1").await.unwrap();
    let flagged = store.flag_review("1.1", "check spacing").await.unwrap();
    assert_eq!(flagged.title, "Compare old — new layout");
    assert_eq!(flagged.review_note.as_deref(), Some("check spacing"));

    let restarted = store.start("1.1").await.unwrap();
    assert_eq!(restarted.title, "Compare old — new layout");
    let text = transport.stored(&plan_cell()).await.unwrap();
    assert_eq!(text.lines().nth(1), Some("- [/] 1.1 Compare old — new layout"));
}

// ---------------------------------------------------------------------------
// Domain errors
// ---------------------------------------------------------------------------

#[tokio::test]
async fn next_task_skips_blocked_and_review() {
    let transport = seeded(
        "### Phase 1: A\n- [>] 1.1 first — stuck\n- [ ] 1.2 second\n- [!] 1.3 third — check\n",
    );
    let next = store(&transport).get_next_task().await.unwrap().unwrap();
    assert_eq!(next.step, "1.2");
}

#[tokio::test]
async fn unknown_step_is_an_error_and_writes_nothing() {
    let transport = seeded(SCENARIO);
    let err = store(&transport)
        .update_task("9.9", Transition::Doing)
        .await
        .unwrap_err();

    match err {
        PlanError::TaskNotFound { step, available } => {
            assert_eq!(step, "9.9");
            assert_eq!(available, vec!["1.1", "1.2"]);
        }
        other => panic!("expected TaskNotFound, got {other:?}"),
    }
    assert_eq!(transport.set_calls(), 0);
}

#[tokio::test]
async fn blank_reason_or_note_is_rejected_before_any_io() {
    let transport = seeded(SCENARIO);
    let store = store(&transport);
    store.start("1.2").await.unwrap();
    let before = transport.stored(&plan_cell()).await.unwrap();
    let (gets, sets) = (transport.get_calls(), transport.set_calls());

    for err in [
        store.block("1.2", "").await.unwrap_err(),
        store.flag_review("1.2", " \n ").await.unwrap_err(),
        store
            .update_task("1.1", Transition::blocked("   "))
            .await
            .unwrap_err(),
    ] {
        assert!(
            matches!(err, PlanError::MissingAnnotation { .. }),
            "expected MissingAnnotation, got {err:?}"
        );
    }

    assert_eq!(transport.get_calls(), gets);
    assert_eq!(transport.set_calls(), sets);
    assert_eq!(transport.stored(&plan_cell()).await.unwrap(), before);
}

#[tokio::test]
async fn notes_never_touch_phases() {
    let transport = seeded(SCENARIO);
    let store = store(&transport);
    store.append_notes("first").await.unwrap();
    store.append_notes("second").await.unwrap();

    let plan = store.get_plan().await.unwrap().unwrap();
    assert_eq!(plan.notes, "first\nsecond");
    assert_eq!(plan.steps(), vec!["1.1", "1.2"]);
    assert!(plan.raw.starts_with(SCENARIO));
}

// ---------------------------------------------------------------------------
// Remote failures and concurrency
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn transient_read_failures_are_absorbed() {
    let transport = seeded(SCENARIO);
    transport
        .fail_times(Op::Get, 2, RemoteError::http(503, "unavailable"))
        .await;

    let plan = store(&transport).get_plan().await.unwrap();
    assert!(plan.is_some());
    assert_eq!(transport.get_calls(), 3);
}

#[tokio::test]
async fn fatal_write_failure_propagates_once() {
    let transport = seeded(SCENARIO);
    transport
        .fail_next(Op::Set, RemoteError::http(403, "forbidden"))
        .await;

    let err = store(&transport)
        .start("1.1")
        .await
        .unwrap_err();
    assert!(err.is_fatal_remote());
    assert_eq!(transport.set_calls(), 1);
    assert_eq!(transport.stored(&plan_cell()).await.as_deref(), Some(SCENARIO));
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_surface_last_error() {
    let transport = seeded(SCENARIO);
    transport
        .fail_times(Op::Get, 3, RemoteError::http(429, "quota"))
        .await;

    let err = store(&transport).get_plan().await.unwrap_err();
    assert!(err.is_retry_exhausted());
    assert_eq!(transport.get_calls(), 3);
}

#[tokio::test]
async fn check_version_detects_concurrent_edit() {
    let transport = seeded(SCENARIO);
    let store = store(&transport).with_write_mode(WriteMode::CheckVersion);

    let snapshot = store.get_plan_versioned().await.unwrap().unwrap();
    transport
        .overwrite(&plan_cell(), &SCENARIO.replace("Write tests", "Write more tests"))
        .await;

    let err = store
        .update_task_if("1.1", Transition::Doing, &snapshot.version)
        .await
        .unwrap_err();
    assert!(matches!(err, PlanError::StaleWrite { .. }));
    assert_eq!(transport.set_calls(), 0);

    // Without a stale token the store re-reads and succeeds.
    store.start("1.1").await.unwrap();
    let text = transport.stored(&plan_cell()).await.unwrap();
    assert!(text.contains("- [/] 1.1 Write code\n"));
    assert!(text.contains("Write more tests"));
}

#[tokio::test]
async fn last_write_wins_is_default() {
    let transport = seeded(SCENARIO);
    let store = store(&transport);
    assert_eq!(store.write_mode(), WriteMode::LastWriteWins);

    store.start("1.1").await.unwrap();
    // Exactly one read and one write per mutation.
    assert_eq!(transport.get_calls(), 1);
    assert_eq!(transport.set_calls(), 1);
}
