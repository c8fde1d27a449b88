//! Integration tests for the resilient access layer.
//!
//! Drives `ResilientCell` against a scripted transport and checks exact
//! attempt counts for transient, fatal and exhausted failures.

use std::sync::Arc;
use std::time::Duration;

use cellplan_sheets::{CellRef, NetworkCode, RemoteError, ResilientCell, RetryPolicy};
use cellplan_test_utils::{Op, ScriptedTransport};

fn plan_cell() -> CellRef {
    "_plan!A1".parse().expect("valid cell ref")
}

fn fast_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::default()
        .with_max_attempts(max_attempts)
        .with_delays(Duration::from_millis(10), Duration::from_millis(40))
}

fn resilient(transport: &Arc<ScriptedTransport>, policy: RetryPolicy) -> ResilientCell {
    ResilientCell::new(transport.clone(), plan_cell(), policy)
}

// ---------------------------------------------------------------------------
// Retry boundary
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn two_503s_then_success_with_three_attempts() {
    let transport = Arc::new(ScriptedTransport::with_cell(&plan_cell(), "# Plan: X\n"));
    transport
        .fail_times(Op::Get, 2, RemoteError::http(503, "backend unavailable"))
        .await;

    let text = resilient(&transport, fast_policy(3))
        .read()
        .await
        .expect("third attempt should succeed");

    assert_eq!(text, "# Plan: X\n");
    assert_eq!(transport.get_calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn two_503s_exhaust_two_attempts() {
    let transport = Arc::new(ScriptedTransport::with_cell(&plan_cell(), "# Plan: X\n"));
    transport
        .fail_times(Op::Get, 2, RemoteError::http(503, "backend unavailable"))
        .await;

    let err = resilient(&transport, fast_policy(2))
        .read()
        .await
        .expect_err("budget of two should be exhausted");

    assert_eq!(err, RemoteError::http(503, "backend unavailable"));
    assert_eq!(transport.get_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn last_error_is_returned_as_is() {
    let transport = Arc::new(ScriptedTransport::new());
    transport
        .fail_next(Op::Set, RemoteError::http(500, "first"))
        .await;
    transport
        .fail_next(Op::Set, RemoteError::network(NetworkCode::ConnectionReset, "second"))
        .await;

    let err = resilient(&transport, fast_policy(2))
        .write("x")
        .await
        .expect_err("both attempts fail");

    assert_eq!(
        err,
        RemoteError::network(NetworkCode::ConnectionReset, "second")
    );
    assert_eq!(transport.set_calls(), 2);
    assert_eq!(transport.stored(&plan_cell()).await, None);
}

// ---------------------------------------------------------------------------
// No-retry class
// ---------------------------------------------------------------------------

#[tokio::test]
async fn forbidden_is_attempted_exactly_once() {
    for max_attempts in [1, 3, 10] {
        let transport = Arc::new(ScriptedTransport::new());
        transport
            .fail_times(Op::Get, 5, RemoteError::http(403, "permission denied"))
            .await;

        let err = resilient(&transport, fast_policy(max_attempts))
            .read()
            .await
            .expect_err("403 is fatal");

        assert_eq!(err.status(), Some(403));
        assert_eq!(
            transport.get_calls(),
            1,
            "max_attempts={max_attempts} should still call once"
        );
    }
}

#[tokio::test]
async fn unclassified_errors_are_fatal() {
    let transport = Arc::new(ScriptedTransport::new());
    transport
        .fail_times(Op::Get, 3, RemoteError::Other("mystery".into()))
        .await;

    let err = resilient(&transport, fast_policy(3)).read().await.unwrap_err();
    assert_eq!(err, RemoteError::Other("mystery".into()));
    assert_eq!(transport.get_calls(), 1);
}

#[tokio::test]
async fn disabled_retry_fails_fast() {
    let transport = Arc::new(ScriptedTransport::new());
    transport
        .fail_next(Op::Set, RemoteError::http(429, "quota"))
        .await;

    let err = resilient(&transport, RetryPolicy::disabled())
        .write("x")
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(429));
    assert_eq!(transport.set_calls(), 1);
}

// ---------------------------------------------------------------------------
// Backoff timing
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn backoff_is_capped() {
    let transport = Arc::new(ScriptedTransport::new());
    transport
        .fail_times(Op::Get, 4, RemoteError::network(NetworkCode::TimedOut, "slow"))
        .await;

    let started = tokio::time::Instant::now();
    resilient(&transport, fast_policy(5))
        .read()
        .await
        .expect("fifth attempt succeeds");

    // 10 + 20 + 40 + 40 (capped)
    assert_eq!(started.elapsed(), Duration::from_millis(110));
    assert_eq!(transport.get_calls(), 5);
}

#[tokio::test(start_paused = true)]
async fn retry_after_overrides_backoff() {
    let transport = Arc::new(ScriptedTransport::new());
    transport
        .fail_next(
            Op::Get,
            RemoteError::http(429, "quota").with_retry_after(Duration::from_secs(2)),
        )
        .await;

    let started = tokio::time::Instant::now();
    resilient(&transport, fast_policy(3)).read().await.unwrap();

    assert_eq!(started.elapsed(), Duration::from_secs(2));
    assert_eq!(transport.get_calls(), 2);
}
