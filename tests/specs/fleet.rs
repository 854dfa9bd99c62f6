// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Muster Contributors

//! Fleet controller scenarios: liveness, safety gating, rolling restart,
//! and the registry/journal invariants.

use crate::prelude::*;
use std::collections::BTreeMap;
use std::time::Duration;

/// Heartbeat timeout drives a silent worker offline, with a system audit
/// entry recording the transition.
#[tokio::test]
async fn heartbeat_timeout_marks_worker_offline() {
    let clock = FakeClock::new();
    clock.set_epoch_ms(1_000_000);
    let config = ControllerConfig { heartbeat_timeout_ms: 5_000, ..Default::default() };
    let stack = fleet_stack(clock.clone(), config);

    stack.registry.register(prod_worker("w1")).await.unwrap();

    clock.advance(Duration::from_secs(6));
    stack.monitor.tick().await.unwrap();

    assert_eq!(
        stack.registry.get(&WorkerId::new("w1")).await.unwrap().state,
        WorkerState::Offline
    );

    let entries = stack.journal.query(&AuditFilter::default()).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].initiator, "system");
    assert_eq!(entries[0].reason, "heartbeat-timeout");
    assert_eq!(entries[0].pre_state, Some(WorkerState::Running));
    assert_eq!(entries[0].post_state, Some(WorkerState::Offline));
}

/// Draining two of three workers with a quorum of two is rejected outright:
/// registry untouched, one rejected audit entry.
#[tokio::test]
async fn drain_honors_minimum_running() {
    let config = ControllerConfig {
        min_running: 2,
        signal_ack_timeout_ms: 200,
        ..Default::default()
    };
    let stack = fleet_stack(SystemClock, config);
    for id in ["w1", "w2", "w3"] {
        stack.registry.register(prod_worker(id)).await.unwrap();
    }

    let deadline = SystemClock.epoch_ms() + 30_000;
    let err = stack
        .controller
        .drain(
            TargetSelector::Workers(vec![WorkerId::new("w1"), WorkerId::new("w2")]),
            "rebalance",
            "ops",
            deadline,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, FleetError::SafetyViolation { ref rule, .. } if rule == "min-running"));

    for id in ["w1", "w2", "w3"] {
        assert_eq!(
            stack.registry.get(&WorkerId::new(id)).await.unwrap().state,
            WorkerState::Running
        );
    }
    let entries = stack.journal.query(&AuditFilter::default()).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].outcome, AuditOutcome::Rejected);
}

/// Rolling restart over four prod workers in batches of two: drain then
/// stop per batch, eight audit entries in order, quorum held throughout.
#[tokio::test]
async fn rolling_restart_in_batches() {
    let config = ControllerConfig {
        min_running: 1,
        min_drain_duration_ms: 1_000,
        signal_ack_timeout_ms: 1_000,
        ..Default::default()
    };
    let stack = fleet_stack(SystemClock, config);
    for id in ["w1", "w2", "w3", "w4"] {
        stack.registry.register(prod_worker(id)).await.unwrap();
        spawn_acker(&stack, id, true);
    }

    let mut labels = BTreeMap::new();
    labels.insert("env".to_string(), "prod".to_string());
    let reports = stack
        .controller
        .rolling_restart(labels, 2, 60_000, "deploy", "ops")
        .await
        .unwrap();
    assert_eq!(reports.len(), 4);
    assert!(reports.iter().all(|r| r.outcome == AuditOutcome::Accepted));

    let entries = stack.journal.query(&AuditFilter::default()).await.unwrap();
    let sequence: Vec<(String, String)> =
        entries.iter().map(|e| (e.kind.clone(), e.target.clone())).collect();
    assert_eq!(
        sequence,
        vec![
            ("drain".to_string(), "w1".to_string()),
            ("drain".to_string(), "w2".to_string()),
            ("stop".to_string(), "w1".to_string()),
            ("stop".to_string(), "w2".to_string()),
            ("drain".to_string(), "w3".to_string()),
            ("drain".to_string(), "w4".to_string()),
            ("stop".to_string(), "w3".to_string()),
            ("stop".to_string(), "w4".to_string()),
        ]
    );
    assert!(entries.iter().all(|e| e.outcome == AuditOutcome::Accepted));
}

/// Exactly one record per registered id, membership in the same
/// transaction, and removal clears both together.
#[tokio::test]
async fn registry_record_and_membership_stay_paired() {
    let stack = fleet_stack(SystemClock, ControllerConfig::default());

    for id in ["w1", "w2"] {
        stack.registry.register(prod_worker(id)).await.unwrap();
    }
    stack.registry.register(prod_worker("w1")).await.unwrap();

    let members = stack.store.set_members(keys::ACTIVE_WORKERS).await.unwrap();
    assert_eq!(members, vec!["w1", "w2"]);
    let (workers, skipped) = stack.registry.snapshot().await.unwrap();
    assert_eq!(workers.len(), 2);
    assert_eq!(skipped, 0);

    stack.registry.remove(&WorkerId::new("w1")).await.unwrap();
    assert!(stack.store.get(&keys::worker("w1")).await.unwrap().is_none());
    assert_eq!(stack.store.set_members(keys::ACTIVE_WORKERS).await.unwrap(), vec!["w2"]);
}

/// The stored heartbeat is the maximum over all accepted updates.
#[tokio::test]
async fn heartbeat_is_monotonic_max() {
    let stack = fleet_stack(SystemClock, ControllerConfig::default());
    stack.registry.register(prod_worker("w1")).await.unwrap();
    let id = WorkerId::new("w1");

    let base = stack.registry.get(&id).await.unwrap().last_heartbeat_ms;
    for offset in [50i64, -20, 10, 200, -100, 150] {
        let at = (base as i64 + offset) as u64;
        stack.registry.heartbeat(&id, at, None).await.unwrap();
    }
    assert_eq!(stack.registry.get(&id).await.unwrap().last_heartbeat_ms, base + 200);
}

/// A successful SetState is immediately visible; a rejected one changes
/// nothing.
#[tokio::test]
async fn set_state_is_atomic_per_worker() {
    let stack = fleet_stack(SystemClock, ControllerConfig::default());
    stack.registry.register(prod_worker("w1")).await.unwrap();
    let id = WorkerId::new("w1");

    stack.registry.set_state(&id, WorkerState::Paused).await.unwrap();
    assert_eq!(stack.registry.get(&id).await.unwrap().state, WorkerState::Paused);

    let err = stack.registry.set_state(&id, WorkerState::Stopped).await.unwrap_err();
    assert!(matches!(err, FleetError::IllegalTransition { .. }));
    assert_eq!(stack.registry.get(&id).await.unwrap().state, WorkerState::Paused);
}

/// For one worker, each audit entry's pre-state chains from the previous
/// entry's post-state.
#[tokio::test]
async fn audit_entries_chain_per_worker() {
    let config = ControllerConfig {
        min_running: 0,
        min_drain_duration_ms: 1_000,
        signal_ack_timeout_ms: 1_000,
        ..Default::default()
    };
    let stack = fleet_stack(SystemClock, config);
    stack.registry.register(prod_worker("w1")).await.unwrap();
    spawn_acker(&stack, "w1", false);
    let target = TargetSelector::Worker(WorkerId::new("w1"));

    stack.controller.pause(target.clone(), "hold", "ops", None).await.unwrap();
    stack.controller.resume(target.clone(), "release", "ops").await.unwrap();
    let deadline = SystemClock.epoch_ms() + 30_000;
    stack.controller.drain(target.clone(), "wind down", "ops", deadline).await.unwrap();
    stack.controller.stop(target, "decommission", "ops", None, false).await.unwrap();

    let entries = stack.journal.query(&AuditFilter::default()).await.unwrap();
    let for_w1: Vec<_> = entries.iter().filter(|e| e.target == "w1").collect();
    assert_eq!(for_w1.len(), 4);
    for pair in for_w1.windows(2) {
        assert_eq!(pair[1].pre_state, pair[0].post_state);
    }
}

/// Control actions against a timed-out worker resolve as partial and the
/// worker lands in unknown, to be recovered by its next heartbeat.
#[tokio::test]
async fn unacked_stop_is_partial_and_recoverable() {
    let config = ControllerConfig {
        min_running: 0,
        signal_ack_timeout_ms: 100,
        ..Default::default()
    };
    let stack = fleet_stack(SystemClock, config);
    stack.registry.register(prod_worker("w1")).await.unwrap();
    let id = WorkerId::new("w1");

    let report = stack
        .controller
        .stop(TargetSelector::Worker(id.clone()), "decommission", "ops", None, false)
        .await
        .unwrap();
    assert_eq!(report.outcome, AuditOutcome::Partial);
    assert_eq!(stack.registry.get(&id).await.unwrap().state, WorkerState::Unknown);

    // The worker was alive after all; its heartbeat recovers it.
    stack.registry.heartbeat(&id, SystemClock.epoch_ms() + 1, None).await.unwrap();
    assert_eq!(stack.registry.get(&id).await.unwrap().state, WorkerState::Running);
}
