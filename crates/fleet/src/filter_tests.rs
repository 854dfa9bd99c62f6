// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Muster Contributors

use super::*;
use muster_core::{CurrentJob, Worker, WorkerHealth};

fn worker(id: &str, hostname: &str) -> Worker {
    Worker::builder().id(id).hostname(hostname).build()
}

#[test]
fn empty_filter_matches_everything() {
    let filter = WorkerFilter::all();
    assert!(filter.matches(&worker("w-1", "a")));
    assert!(filter.matches(&worker("w-2", "b")));
}

#[test]
fn predicates_and_together() {
    let mut w = worker("w-1", "host-a");
    w.labels.insert("env".to_string(), "prod".to_string());
    w.capabilities.insert("gpu".to_string());

    let filter = WorkerFilter::all()
        .with(WorkerPredicate::LabelEquals { key: "env".to_string(), value: "prod".to_string() })
        .with(WorkerPredicate::HasCapability("gpu".to_string()));
    assert!(filter.matches(&w));

    let filter = filter.with(WorkerPredicate::HasCapability("tpu".to_string()));
    assert!(!filter.matches(&w));
}

#[yare::parameterized(
    state_hit     = { WorkerPredicate::StateIn(vec![WorkerState::Running]), true },
    state_miss    = { WorkerPredicate::StateIn(vec![WorkerState::Paused]), false },
    hb_after_hit  = { WorkerPredicate::HeartbeatAfter(500), true },
    hb_after_miss = { WorkerPredicate::HeartbeatAfter(1_500), false },
    hb_before_hit = { WorkerPredicate::HeartbeatBefore(1_500), true },
    hb_before_miss= { WorkerPredicate::HeartbeatBefore(500), false },
    no_job        = { WorkerPredicate::HasCurrentJob(false), true },
    has_job       = { WorkerPredicate::HasCurrentJob(true), false },
    version_hit   = { WorkerPredicate::VersionIs("1.0.0".into()), true },
    version_miss  = { WorkerPredicate::VersionIs("2.0.0".into()), false },
    host_hit      = { WorkerPredicate::HostnameIs("host-1".into()), true },
    text_id       = { WorkerPredicate::TextMatch("w-".into()), true },
    text_host     = { WorkerPredicate::TextMatch("ost-1".into()), true },
    text_miss     = { WorkerPredicate::TextMatch("zzz".into()), false },
)]
fn single_predicates(predicate: WorkerPredicate, expected: bool) {
    let mut w = Worker::builder().id("w-test").hostname("host-1").build();
    w.last_heartbeat_ms = 1_000;
    assert_eq!(predicate.matches(&w), expected);
}

#[test]
fn sort_is_stable_with_id_tiebreak() {
    let mut a = worker("w-b", "same");
    let mut b = worker("w-a", "same");
    let mut c = worker("w-c", "other");
    a.last_heartbeat_ms = 5;
    b.last_heartbeat_ms = 5;
    c.last_heartbeat_ms = 1;

    let mut workers = vec![a, b, c];
    Sort::by(SortKey::LastHeartbeat).apply(&mut workers);
    let ids: Vec<&str> = workers.iter().map(|w| w.id.as_str()).collect();
    assert_eq!(ids, vec!["w-c", "w-a", "w-b"]);
}

#[test]
fn sort_descending_keeps_id_ascending_on_ties() {
    let mut a = worker("w-b", "x");
    let mut b = worker("w-a", "x");
    a.jobs_processed = 10;
    b.jobs_processed = 10;
    let mut workers = vec![a, b];
    Sort { key: SortKey::JobsProcessed, descending: true }.apply(&mut workers);
    let ids: Vec<&str> = workers.iter().map(|w| w.id.as_str()).collect();
    assert_eq!(ids, vec!["w-a", "w-b"]);
}

#[test]
fn sort_key_parses_known_names_only() {
    assert_eq!("last_heartbeat".parse::<SortKey>().unwrap(), SortKey::LastHeartbeat);
    assert!(matches!(
        "uptime".parse::<SortKey>(),
        Err(FleetError::ConfigInvalid { field, .. }) if field == "sort"
    ));
}

#[test]
fn page_clamps_to_limits() {
    let page = Page { number: 0, size: 0 }.clamped();
    assert_eq!(page.number, 1);
    assert_eq!(page.size, 1);

    let page = Page { number: 3, size: 10_000 }.clamped();
    assert_eq!(page.number, 3);
    assert_eq!(page.size, MAX_PAGE_SIZE);
}

#[test]
fn summary_counts_states_health_and_jobs() {
    let mut w1 = worker("w-1", "a");
    let mut w2 = worker("w-2", "b");
    let mut w3 = worker("w-3", "c");
    w1.cpu_percent = 30.0;
    w2.cpu_percent = 60.0;
    w2.state = WorkerState::Paused;
    w3.state = WorkerState::Paused;
    w1.health = WorkerHealth { status: HealthStatus::Healthy, score: 1.0, last_check_ms: 0 };
    w1.current_job = Some(CurrentJob {
        id: "j".to_string(),
        queue: "q".to_string(),
        attempts: 0,
        started_at_ms: 0,
        tags: vec![],
    });

    let summary = FleetSummary::compute(&[w1, w2, w3], 999);
    assert_eq!(summary.total, 3);
    assert_eq!(summary.by_state[&WorkerState::Running], 1);
    assert_eq!(summary.by_state[&WorkerState::Paused], 2);
    assert_eq!(summary.by_health[&HealthStatus::Healthy], 1);
    assert_eq!(summary.by_health[&HealthStatus::Unknown], 2);
    assert_eq!(summary.active_jobs, 1);
    assert!((summary.avg_cpu_percent - 30.0).abs() < 1e-9);
    assert_eq!(summary.computed_at_ms, 999);
}

#[test]
fn summary_of_empty_fleet_is_zeroed() {
    let summary = FleetSummary::compute(&[], 1);
    assert_eq!(summary.total, 0);
    assert_eq!(summary.avg_cpu_percent, 0.0);
    assert!(summary.by_state.is_empty());
}
