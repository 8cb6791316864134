//! Concurrency Controller Tests
//!
//! Tests verify:
//! - Counts add up: succeeded + failed == attempted == sessions
//! - Session-unique keys never collide
//! - Failure categories are tallied separately
//! - One failing session does not affect its siblings

#[path = "../support/mod.rs"]
mod support;

use std::collections::HashSet;

use parking_lot::Mutex;

use kvprobe::protocol::{Command, Response, ValueType};
use kvprobe::scenarios::{self, Scenario};
use kvprobe::workflow::{Predicate, Workflow};
use kvprobe::{Config, Controller, FailureKind, ProbeError};
use support::{closed_port, Behavior, FakeServer};

// =============================================================================
// Tally Tests
// =============================================================================

#[test]
fn test_concurrent_round_trips_all_succeed() {
    let server = FakeServer::start();
    let config = server.config().sessions(200).concurrency(32).build().unwrap();
    let controller = Controller::new(config).unwrap();

    let report = controller
        .run(|i| Scenario::RoundTrip.workflow("client", i))
        .unwrap();

    assert_eq!(report.attempted, 200);
    assert_eq!(report.succeeded, 200);
    assert_eq!(report.failed, 0);
    assert_eq!(report.succeeded + report.failed, report.attempted);
    assert_eq!(report.commands_sent, 600);
    assert!(report.all_succeeded());
    assert_eq!(server.accepted(), 200);
    assert_eq!(server.stored_keys(), 0);
}

#[test]
fn test_sessions_never_see_each_others_keys() {
    let server = FakeServer::start();
    let config = server.config().sessions(100).concurrency(16).build().unwrap();
    let controller = Controller::new(config).unwrap();
    let seen = Mutex::new(HashSet::new());

    let report = controller
        .run_with(
            |i| scenarios::put_then_get(&scenarios::session_key("iso", i), &format!("value-{i}")),
            |outcome| {
                // The GET reply must carry this session's own value
                let expected = format!("value-{}", outcome.session_id);
                let got = outcome.exchanges[1].response().and_then(Response::payload);
                assert_eq!(got, Some(expected.as_bytes()));
                seen.lock().insert(outcome.session_id);
            },
        )
        .unwrap();

    assert_eq!(report.succeeded, 100);
    assert_eq!(seen.lock().len(), 100);
    assert_eq!(server.stored_keys(), 100);
}

#[test]
fn test_run_uniform() {
    let server = FakeServer::start();
    let config = server.config().sessions(50).concurrency(8).build().unwrap();

    let report = Controller::new(config).unwrap().run_uniform(&scenarios::ping()).unwrap();

    assert_eq!(report.attempted, 50);
    assert_eq!(report.succeeded, 50);
}

#[test]
fn test_single_worker_runs_everything() {
    let server = FakeServer::start();
    let config = server.config().sessions(10).concurrency(1).build().unwrap();

    let report = Controller::new(config)
        .unwrap()
        .run(|i| Scenario::MultiRequest.workflow("solo", i))
        .unwrap();

    assert_eq!(report.succeeded, 10);
    assert_eq!(report.commands_sent, 60);
}

// =============================================================================
// Failure Category Tests
// =============================================================================

#[test]
fn test_unreachable_server_is_systematic_connection_failure() {
    let config = Config::builder()
        .host("127.0.0.1")
        .port(closed_port())
        .sessions(20)
        .concurrency(4)
        .io_timeout_ms(1000)
        .build()
        .unwrap();

    let report = Controller::new(config).unwrap().run_uniform(&scenarios::ping()).unwrap();

    assert_eq!(report.attempted, 20);
    assert_eq!(report.failed, 20);
    assert_eq!(report.failures_of(FailureKind::Connection), 20);
    assert_eq!(report.dominant_failure(), Some(FailureKind::Connection));
    assert_eq!(report.failures.len(), 20);
}

#[test]
fn test_garbage_replies_are_protocol_failures() {
    let server = FakeServer::with_behavior(Behavior::Garbage);
    let config = server.config().sessions(10).concurrency(4).build().unwrap();

    let report = Controller::new(config).unwrap().run_uniform(&scenarios::ping()).unwrap();

    assert_eq!(report.failed, 10);
    assert_eq!(report.dominant_failure(), Some(FailureKind::Protocol));
}

#[test]
fn test_mixed_outcomes_are_isolated() {
    let server = FakeServer::start();
    let config = server.config().sessions(30).concurrency(6).build().unwrap();

    // Every third session expects a value that was never written
    let report = Controller::new(config)
        .unwrap()
        .run(|i| {
            if i % 3 == 0 {
                Workflow::new().then(Command::get(format!("ghost{i}")), Predicate::Present)
            } else {
                Workflow::new()
                    .then(
                        Command::put(ValueType::Int, format!("n{i}"), i.to_string()),
                        Predicate::Ok,
                    )
                    .then(Command::get(format!("n{i}")), Predicate::payload(i.to_string()))
            }
        })
        .unwrap();

    assert_eq!(report.attempted, 30);
    assert_eq!(report.failed, 10);
    assert_eq!(report.succeeded, 20);
    assert_eq!(report.failures_of(FailureKind::Application), 10);
    assert!(report.failures.iter().all(|f| f.session_id % 3 == 0));
}

#[test]
fn test_timeouts_do_not_hang_the_controller() {
    let server = FakeServer::with_behavior(Behavior::Stall);
    let config = server
        .config()
        .read_timeout_ms(150)
        .sessions(8)
        .concurrency(8)
        .build()
        .unwrap();

    let report = Controller::new(config).unwrap().run_uniform(&scenarios::ping()).unwrap();

    assert_eq!(report.failed, 8);
    assert_eq!(report.failures_of(FailureKind::Transport), 8);
}

#[test]
fn test_failure_list_respects_cap() {
    let config = Config::builder()
        .host("127.0.0.1")
        .port(closed_port())
        .sessions(15)
        .keep_failures(5)
        .io_timeout_ms(1000)
        .build()
        .unwrap();

    let report = Controller::new(config).unwrap().run_uniform(&scenarios::ping()).unwrap();

    assert_eq!(report.failed, 15);
    assert_eq!(report.failures.len(), 5);
    assert_eq!(report.failures_dropped, 10);
}

#[test]
fn test_panicking_observer_keeps_partial_tally() {
    let server = FakeServer::start();
    let config = server.config().sessions(10).concurrency(2).build().unwrap();

    let report = Controller::new(config)
        .unwrap()
        .run_with(
            |_| scenarios::ping(),
            |outcome| {
                if outcome.session_id == 3 {
                    panic!("observer failure");
                }
            },
        )
        .unwrap();

    // Session 3 was recorded before its observer ran; the surviving
    // worker drains the rest of the queue
    assert_eq!(report.attempted, 10);
    assert_eq!(report.succeeded, 10);
}

// =============================================================================
// Configuration Tests
// =============================================================================

#[test]
fn test_invalid_config_is_rejected() {
    let config = Config {
        sessions: 0,
        ..Config::default()
    };
    assert!(matches!(Controller::new(config), Err(ProbeError::Config(_))));
}

#[test]
fn test_report_renders_summary() {
    let server = FakeServer::start();
    let config = server.config().sessions(3).build().unwrap();

    let report = Controller::new(config).unwrap().run_uniform(&scenarios::ping()).unwrap();
    let text = report.to_string();

    assert!(text.contains("3 sessions attempted, 3 succeeded, 0 failed"));
}
