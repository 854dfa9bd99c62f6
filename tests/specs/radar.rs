// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Muster Contributors

//! Anomaly radar scenarios: budget math, worst-of status, alert lifecycle.

use crate::prelude::*;
use muster_core::AlertNotification;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn snapshot(requests: u64, errors: u64, backlog: u64, p95: f64) -> MetricSnapshot {
    MetricSnapshot {
        request_count: requests,
        error_count: errors,
        backlog_size: backlog,
        p95_ms: p95,
        ..Default::default()
    }
}

fn radar_with(
    collector: Arc<ScriptedCollector>,
    config: RadarConfig,
) -> (Arc<Radar<FakeClock>>, FakeClock) {
    let clock = FakeClock::new();
    clock.set_epoch_ms(10_000_000);
    let radar = Arc::new(Radar::new(collector, clock.clone(), config).unwrap());
    (radar, clock)
}

/// Three 1000-request snapshots with 5/10/15 errors against a 99% target:
/// budget 30, fully consumed, unhealthy.
#[tokio::test]
async fn slo_budget_math() {
    let collector = ScriptedCollector::new();
    collector.push_ok(snapshot(1_000, 5, 0, 200.0));
    collector.push_ok(snapshot(1_000, 10, 0, 300.0));
    collector.push_ok(snapshot(1_000, 15, 0, 250.0));
    let (radar, clock) = radar_with(collector, RadarConfig::default());
    let cancel = CancellationToken::new();

    for _ in 0..3 {
        radar.tick(&cancel).await;
        clock.advance(Duration::from_secs(10));
    }

    let (_, budget) = radar.current_status();
    assert!((budget.total - 30.0).abs() < 1e-9);
    assert!((budget.consumed - 30.0).abs() < 1e-9);
    assert!((budget.utilization - 1.0).abs() < 1e-9);
    assert!(budget.remaining.abs() < 1e-9);
    assert!(!budget.is_healthy);
}

/// Warning error rate + critical p95 + healthy backlog growth: the overall
/// status is the worst of the three.
#[tokio::test]
async fn anomaly_overall_is_worst() {
    let collector = ScriptedCollector::new();
    // Forgiving SLO keeps the budget level at none; the anomaly thresholds
    // alone drive the statuses here.
    let mut config = RadarConfig::default();
    config.slo.availability_target = 0.9;
    config.slo.latency_threshold_ms = 5_000.0;

    // Two ticks 10s apart: backlog +50 -> growth 5 items/s.
    collector.push_ok(snapshot(10_000, 150, 100, 1_200.0));
    collector.push_ok(snapshot(10_000, 150, 150, 1_200.0));
    let (radar, clock) = radar_with(collector, config);
    let cancel = CancellationToken::new();

    radar.tick(&cancel).await;
    clock.advance(Duration::from_secs(10));
    radar.tick(&cancel).await;

    let (status, budget) = radar.current_status();
    assert_eq!(budget.alert_level, Severity::None);
    assert_eq!(status.metrics["error_rate"].severity, Severity::Warning);
    assert_eq!(status.metrics["latency_p95"].severity, Severity::Critical);
    assert_eq!(status.metrics["backlog_growth"].severity, Severity::None);
    assert!((status.metrics["backlog_growth"].value - 5.0).abs() < 1e-9);
    assert_eq!(status.overall, Severity::Critical);
}

/// Alert id stability across cycles, then resolution: one raise, silence
/// while the condition persists, one resolve.
#[tokio::test]
async fn alert_id_stability_and_resolution() {
    let collector = ScriptedCollector::new();
    let mut config = RadarConfig::default();
    config.slo.availability_target = 0.9;

    // Cycle N and N+1 breach (value changes), cycle N+2 is clean.
    collector.push_ok(snapshot(1_000, 20, 0, 100.0));
    collector.push_ok(snapshot(1_000, 30, 0, 100.0));
    collector.push_ok(snapshot(1_000, 0, 0, 100.0));
    let (radar, clock) = radar_with(collector, config);
    let cancel = CancellationToken::new();

    let seen: Arc<Mutex<Vec<AlertNotification>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    radar.register_alert_callback(move |note| sink.lock().push(note));

    radar.tick(&cancel).await;
    let t1 = seen.lock()[0].alert().created_at_ms;

    clock.advance(Duration::from_secs(10));
    radar.tick(&cancel).await;
    // Still one notification; the active alert kept its created_at.
    assert_eq!(seen.lock().len(), 1);
    let active = radar.active_alerts();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].created_at_ms, t1);
    assert!(active[0].updated_at_ms > t1);

    clock.advance(Duration::from_secs(10));
    radar.tick(&cancel).await;
    let seen = seen.lock();
    assert_eq!(seen.len(), 2);
    assert!(matches!(&seen[1], AlertNotification::Resolved(a) if a.id == "error_rate"));
}

/// After stop, no further callbacks fire and the metric window stops
/// moving.
#[tokio::test]
async fn stop_quiesces_the_radar() {
    let collector = ScriptedCollector::new();
    let mut config = RadarConfig::default();
    config.slo.availability_target = 0.9;
    config.monitoring_interval_ms = 10;
    for i in 0..1_000u64 {
        collector.push_ok(snapshot(1_000, if i % 2 == 0 { 20 } else { 0 }, 0, 100.0));
    }
    let (radar, _clock) = radar_with(collector, config);

    let count: Arc<Mutex<usize>> = Arc::new(Mutex::new(0));
    let sink = count.clone();
    radar.register_alert_callback(move |_| *sink.lock() += 1);

    radar.start(CancellationToken::new());
    tokio::time::sleep(Duration::from_millis(100)).await;
    radar.stop().await;

    let notifications = *count.lock();
    let snapshots = radar.metrics(u64::MAX / 2).len();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(*count.lock(), notifications);
    assert_eq!(radar.metrics(u64::MAX / 2).len(), snapshots);
}
