// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Muster Contributors

use super::*;
use muster_core::Severity;

const TOLERANCE: f64 = 1e-9;

fn engine(target: f64, latency_threshold_ms: f64) -> BudgetEngine {
    BudgetEngine::new(SloConfig {
        availability_target: target,
        latency_threshold_ms,
        window_ms: 60 * 60 * 1000,
        ..Default::default()
    })
}

fn snapshot(ts: u64, requests: u64, errors: u64, p95: f64) -> MetricSnapshot {
    MetricSnapshot {
        timestamp_ms: ts,
        request_count: requests,
        error_count: errors,
        p95_ms: p95,
        ..Default::default()
    }
}

fn window_of(snapshots: Vec<MetricSnapshot>, now: u64) -> RollingWindow {
    let mut window = RollingWindow::new(24 * 60 * 60 * 1000, 10_000);
    for s in snapshots {
        window.push(s, now);
    }
    window
}

#[test]
fn exhausted_budget_is_unhealthy() {
    // 3000 requests at 99% target give a budget of 30; 30 errors and no
    // latency violations consume exactly all of it.
    let now = 10 * 60 * 1000;
    let window = window_of(
        vec![
            snapshot(now - 3_000, 1000, 5, 200.0),
            snapshot(now - 2_000, 1000, 10, 300.0),
            snapshot(now - 1_000, 1000, 15, 250.0),
        ],
        now,
    );
    let budget = engine(0.99, 1000.0).evaluate(&window, now).unwrap();

    assert!((budget.total - 30.0).abs() < TOLERANCE);
    assert!((budget.consumed - 30.0).abs() < TOLERANCE);
    assert!((budget.remaining - 0.0).abs() < TOLERANCE);
    assert!((budget.utilization - 1.0).abs() < TOLERANCE);
    assert!(!budget.is_healthy);
}

#[test]
fn latency_violations_consume_whole_batches() {
    let now = 10 * 60 * 1000;
    let window = window_of(
        vec![snapshot(now - 2_000, 1000, 0, 200.0), snapshot(now - 1_000, 500, 0, 1_500.0)],
        now,
    );
    let budget = engine(0.99, 1000.0).evaluate(&window, now).unwrap();

    // 1500 requests -> budget 15; the slow batch's 500 requests all count.
    assert!((budget.total - 15.0).abs() < TOLERANCE);
    assert!((budget.consumed - 500.0).abs() < TOLERANCE);
    assert!((budget.remaining - 0.0).abs() < TOLERANCE);
    assert!((budget.utilization - 1.0).abs() < TOLERANCE);
}

#[test]
fn healthy_budget_keeps_headroom() {
    let now = 10 * 60 * 1000;
    let window = window_of(vec![snapshot(now - 1_000, 10_000, 3, 100.0)], now);
    let budget = engine(0.99, 1000.0).evaluate(&window, now).unwrap();

    assert!((budget.total - 100.0).abs() < TOLERANCE);
    assert!((budget.consumed - 3.0).abs() < TOLERANCE);
    assert!((budget.remaining - 97.0).abs() < TOLERANCE);
    assert!(budget.is_healthy);
    assert_eq!(budget.alert_level, Severity::None);
}

#[test]
fn empty_window_skips_the_update() {
    let window = RollingWindow::new(60 * 60 * 1000, 100);
    assert!(engine(0.99, 1000.0).evaluate(&window, 1_000_000).is_none());
}

#[test]
fn zero_request_snapshots_skip_the_update() {
    let now = 10 * 60 * 1000;
    let window = window_of(vec![snapshot(now - 1_000, 0, 0, 100.0)], now);
    assert!(engine(0.99, 1000.0).evaluate(&window, now).is_none());
}

#[test]
fn burn_rate_reduces_to_error_rate_over_budget_fraction() {
    // error rate 0.02 against a 1% budget burns at 2x.
    let now = 10 * 60 * 1000;
    let window = window_of(vec![snapshot(now - 1_000, 5_000, 100, 100.0)], now);
    let budget = engine(0.99, 1000.0).evaluate(&window, now).unwrap();
    assert!((budget.burn_rate - 2.0).abs() < TOLERANCE);
    assert!(budget.time_to_exhaustion > 0.0);
}

#[test]
fn zero_burn_means_zero_time_to_exhaustion() {
    let now = 10 * 60 * 1000;
    let window = window_of(vec![snapshot(now - 1_000, 1_000, 0, 100.0)], now);
    let budget = engine(0.99, 1000.0).evaluate(&window, now).unwrap();
    assert_eq!(budget.burn_rate, 0.0);
    assert_eq!(budget.time_to_exhaustion, 0.0);
}

#[test]
fn snapshots_outside_the_slo_window_are_ignored() {
    let mut config = SloConfig { window_ms: 1_000, ..Default::default() };
    config.availability_target = 0.99;
    let engine = BudgetEngine::new(config);

    let now = 10 * 60 * 1000;
    let mut window = RollingWindow::new(24 * 60 * 60 * 1000, 10_000);
    window.push(snapshot(now - 5_000, 1_000, 1_000, 100.0), now);
    window.push(snapshot(now - 500, 1_000, 0, 100.0), now);

    let budget = engine.evaluate(&window, now).unwrap();
    assert!((budget.total - 10.0).abs() < TOLERANCE);
    assert!((budget.consumed - 0.0).abs() < TOLERANCE);
}

#[test]
fn totals_match_summed_inputs_within_tolerance() {
    let now = 60 * 60 * 1000;
    let snapshots: Vec<MetricSnapshot> =
        (0..100).map(|i| snapshot(now - 100 * (i + 1), 137, 3, 250.0)).collect();
    let window = window_of(snapshots, now);
    let budget = engine(0.999, 1000.0).evaluate(&window, now).unwrap();

    let expected_total = 100.0 * 137.0 * 0.001;
    assert!((budget.total - expected_total).abs() < TOLERANCE);
    assert!((budget.consumed - 300.0).abs() < TOLERANCE);
    assert!(budget.utilization >= 0.0 && budget.utilization <= 1.0);
    assert!(budget.remaining >= 0.0);
    assert_eq!(budget.is_healthy, budget.utilization < 1.0);
}
