// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Muster Contributors

//! Fleet list queries: predicates, sorting, pagination, summary.

use crate::config::MAX_PAGE_SIZE;
use crate::error::FleetError;
use muster_core::{HealthStatus, Worker, WorkerState};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::str::FromStr;

/// One filter predicate. Absence of a predicate is structural: an empty
/// predicate list matches the whole fleet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerPredicate {
    /// State is one of the given set.
    StateIn(Vec<WorkerState>),
    /// Label `key` equals `value`; multiple predicates AND together.
    LabelEquals { key: String, value: String },
    /// Worker declares this capability; multiple predicates AND together.
    HasCapability(String),
    /// Health status is one of the given set.
    HealthIn(Vec<HealthStatus>),
    /// last_heartbeat >= bound.
    HeartbeatAfter(u64),
    /// last_heartbeat < bound.
    HeartbeatBefore(u64),
    /// Whether a current job is set.
    HasCurrentJob(bool),
    VersionIs(String),
    HostnameIs(String),
    /// Case-sensitive substring match on id or hostname.
    TextMatch(String),
}

impl WorkerPredicate {
    pub fn matches(&self, worker: &Worker) -> bool {
        match self {
            Self::StateIn(states) => states.contains(&worker.state),
            Self::LabelEquals { key, value } => worker.labels.get(key) == Some(value),
            Self::HasCapability(cap) => worker.capabilities.contains(cap),
            Self::HealthIn(statuses) => statuses.contains(&worker.health.status),
            Self::HeartbeatAfter(t) => worker.last_heartbeat_ms >= *t,
            Self::HeartbeatBefore(t) => worker.last_heartbeat_ms < *t,
            Self::HasCurrentJob(wanted) => worker.current_job.is_some() == *wanted,
            Self::VersionIs(v) => worker.version == *v,
            Self::HostnameIs(h) => worker.hostname == *h,
            Self::TextMatch(text) => {
                worker.id.as_str().contains(text.as_str()) || worker.hostname.contains(text.as_str())
            }
        }
    }
}

/// Conjunction of predicates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkerFilter {
    pub predicates: Vec<WorkerPredicate>,
}

impl WorkerFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with(mut self, predicate: WorkerPredicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn matches(&self, worker: &Worker) -> bool {
        self.predicates.iter().all(|p| p.matches(worker))
    }
}

/// Closed set of sortable fields; unknown keys are rejected at ingress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    Id,
    Hostname,
    Version,
    State,
    LastHeartbeat,
    StartedAt,
    JobsProcessed,
    JobsFailed,
    HealthScore,
}

impl FromStr for SortKey {
    type Err = FleetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "id" => Ok(Self::Id),
            "hostname" => Ok(Self::Hostname),
            "version" => Ok(Self::Version),
            "state" => Ok(Self::State),
            "last_heartbeat" => Ok(Self::LastHeartbeat),
            "started_at" => Ok(Self::StartedAt),
            "jobs_processed" => Ok(Self::JobsProcessed),
            "jobs_failed" => Ok(Self::JobsFailed),
            "health_score" => Ok(Self::HealthScore),
            other => Err(FleetError::ConfigInvalid {
                field: "sort".to_string(),
                reason: format!("unknown sort key: {other}"),
            }),
        }
    }
}

/// Sort order: key plus direction. Ties always break on id ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Sort {
    pub key: SortKey,
    pub descending: bool,
}

impl Sort {
    pub fn by(key: SortKey) -> Self {
        Self { key, descending: false }
    }

    fn compare(&self, a: &Worker, b: &Worker) -> Ordering {
        let ord = match self.key {
            SortKey::Id => a.id.cmp(&b.id),
            SortKey::Hostname => a.hostname.cmp(&b.hostname),
            SortKey::Version => a.version.cmp(&b.version),
            SortKey::State => a.state.cmp(&b.state),
            SortKey::LastHeartbeat => a.last_heartbeat_ms.cmp(&b.last_heartbeat_ms),
            SortKey::StartedAt => a.started_at_ms.cmp(&b.started_at_ms),
            SortKey::JobsProcessed => a.jobs_processed.cmp(&b.jobs_processed),
            SortKey::JobsFailed => a.jobs_failed.cmp(&b.jobs_failed),
            SortKey::HealthScore => {
                a.health.score.partial_cmp(&b.health.score).unwrap_or(Ordering::Equal)
            }
        };
        let ord = if self.descending { ord.reverse() } else { ord };
        ord.then_with(|| a.id.cmp(&b.id))
    }

    /// Stable sort with id tie-break.
    pub fn apply(&self, workers: &mut [Worker]) {
        workers.sort_by(|a, b| self.compare(a, b));
    }
}

/// 1-based page request; size is clamped to `[1, MAX_PAGE_SIZE]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub number: usize,
    pub size: usize,
}

impl Page {
    pub fn first(size: usize) -> Self {
        Self { number: 1, size }
    }

    pub(crate) fn clamped(self) -> Self {
        Self { number: self.number.max(1), size: self.size.clamp(1, MAX_PAGE_SIZE) }
    }
}

/// Full list request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub filter: WorkerFilter,
    #[serde(default)]
    pub sort: Sort,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<Page>,
}

/// One page of fleet state plus the summary over the whole filtered set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListResult {
    pub workers: Vec<Worker>,
    /// Matching workers before pagination.
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    pub summary: FleetSummary,
    /// Set when results are degraded (e.g. undecodable records skipped).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Aggregates over a set of workers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FleetSummary {
    pub total: usize,
    pub by_state: BTreeMap<WorkerState, usize>,
    pub by_health: BTreeMap<HealthStatus, usize>,
    pub active_jobs: usize,
    pub avg_cpu_percent: f64,
    pub computed_at_ms: u64,
}

impl FleetSummary {
    pub fn compute(workers: &[Worker], computed_at_ms: u64) -> Self {
        let mut summary = Self { total: workers.len(), computed_at_ms, ..Self::default() };
        let mut cpu_total = 0.0;
        for worker in workers {
            *summary.by_state.entry(worker.state).or_default() += 1;
            *summary.by_health.entry(worker.health.status).or_default() += 1;
            if worker.current_job.is_some() {
                summary.active_jobs += 1;
            }
            cpu_total += worker.cpu_percent;
        }
        if !workers.is_empty() {
            summary.avg_cpu_percent = cpu_total / workers.len() as f64;
        }
        summary
    }
}

#[cfg(test)]
#[path = "filter_tests.rs"]
mod tests;
