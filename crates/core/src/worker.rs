// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Muster Contributors

//! Worker record and state machine.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Unique identifier for a worker instance.
///
/// Worker ids are caller-supplied (the worker process picks its own stable
/// id at startup), so this is a plain string newtype rather than a
/// generated [`crate::define_id!`] id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkerId(pub String);

impl WorkerId {
    /// Create a new WorkerId from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the string value of this WorkerId.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for WorkerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for WorkerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl PartialEq<str> for WorkerId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for WorkerId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl Borrow<str> for WorkerId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Lifecycle state of a worker.
///
/// Transitions outside [`WorkerState::can_transition_to`] are illegal and
/// leave the stored record untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    /// Accepting and processing jobs.
    Running,
    /// Holding: no new jobs, in-flight work frozen.
    Paused,
    /// No new jobs, in-flight work completing.
    Draining,
    /// Shutdown signalled, awaiting confirmation.
    Stopping,
    /// Confirmed stopped.
    Stopped,
    /// Missed heartbeats past the liveness cutoff.
    Offline,
    /// Signal delivery timed out; actual state unconfirmed.
    Unknown,
}

crate::simple_display! {
    WorkerState {
        Running => "running",
        Paused => "paused",
        Draining => "draining",
        Stopping => "stopping",
        Stopped => "stopped",
        Offline => "offline",
        Unknown => "unknown",
    }
}

impl WorkerState {
    /// States in which the worker is expected to heartbeat.
    ///
    /// The heartbeat sweeper only marks these offline; a worker that is
    /// already stopped or unknown is not re-penalized for silence.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Running | Self::Paused | Self::Draining)
    }

    /// States in which a current-job reference may be held.
    pub fn may_hold_job(self) -> bool {
        matches!(self, Self::Running | Self::Draining)
    }

    /// Whether `self -> to` is an edge of the worker state machine.
    pub fn can_transition_to(self, to: WorkerState) -> bool {
        use WorkerState::*;
        match (self, to) {
            // pause / drain / stop from a live worker
            (Running, Paused) | (Running, Draining) | (Running, Stopping) => true,
            // resume, or stop/drain without resuming first
            (Paused, Running) | (Paused, Draining) | (Paused, Stopping) => true,
            // drained out (jobs=0 or deadline)
            (Draining, Stopping) => true,
            // shutdown confirmed
            (Stopping, Stopped) => true,
            // heartbeat timeout from any active state
            (s, Offline) if s.is_active() => true,
            // heartbeat recovered
            (Offline, Running) | (Unknown, Running) => true,
            // unconfirmed signal outcome
            (s, Unknown) if s.is_active() || s == Stopping => true,
            // late stop confirmation after a dispatch timeout
            (Unknown, Stopped) => true,
            _ => false,
        }
    }
}

/// Health classification reported by the worker.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
    #[default]
    Unknown,
}

crate::simple_display! {
    HealthStatus {
        Healthy => "healthy",
        Degraded => "degraded",
        Unhealthy => "unhealthy",
        Unknown => "unknown",
    }
}

/// Worker-reported health sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct WorkerHealth {
    pub status: HealthStatus,
    /// Normalized score in [0, 1]; 1.0 is fully healthy.
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub last_check_ms: u64,
}

/// The job a worker is currently executing, as reported via heartbeat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentJob {
    pub id: String,
    pub queue: String,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default)]
    pub started_at_ms: u64,
    /// Tags declared by the worker; a "critical" tag shields the job from
    /// destructive signals unless the operator forces.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl CurrentJob {
    pub fn is_critical(&self) -> bool {
        self.tags.iter().any(|t| t == "critical")
    }
}

/// A worker record as held in the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Worker {
    pub id: WorkerId,
    pub hostname: String,
    pub version: String,
    /// Arbitrary key/value labels (e.g. env=prod); keys unique, order irrelevant.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Declared capability set (e.g. "gpu", "video-transcode").
    #[serde(default)]
    pub capabilities: BTreeSet<String>,
    pub state: WorkerState,
    #[serde(default)]
    pub health: WorkerHealth,
    pub last_heartbeat_ms: u64,
    pub started_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_job: Option<CurrentJob>,
    #[serde(default)]
    pub jobs_processed: u64,
    #[serde(default)]
    pub jobs_failed: u64,
    #[serde(default)]
    pub busy_ms: u64,
    #[serde(default)]
    pub cpu_percent: f64,
    #[serde(default)]
    pub memory_mb: f64,
}

impl Worker {
    /// Create a minimal registration record; the registry fills timestamps.
    pub fn new(id: impl Into<WorkerId>, hostname: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            hostname: hostname.into(),
            version: version.into(),
            labels: BTreeMap::new(),
            capabilities: BTreeSet::new(),
            state: WorkerState::Running,
            health: WorkerHealth::default(),
            last_heartbeat_ms: 0,
            started_at_ms: 0,
            current_job: None,
            jobs_processed: 0,
            jobs_failed: 0,
            busy_ms: 0,
            cpu_percent: 0.0,
            memory_mb: 0.0,
        }
    }

    /// Whether this worker matches every label in `selector`.
    pub fn matches_labels(&self, selector: &BTreeMap<String, String>) -> bool {
        selector.iter().all(|(k, v)| self.labels.get(k) == Some(v))
    }

    /// Apply a merge patch: `Some` fields replace, `None` fields are untouched.
    pub fn apply_patch(&mut self, patch: WorkerPatch) {
        if let Some(hostname) = patch.hostname {
            self.hostname = hostname;
        }
        if let Some(version) = patch.version {
            self.version = version;
        }
        if let Some(labels) = patch.labels {
            self.labels = labels;
        }
        if let Some(capabilities) = patch.capabilities {
            self.capabilities = capabilities;
        }
        if let Some(health) = patch.health {
            self.health = health;
        }
        if let Some(jobs_processed) = patch.jobs_processed {
            self.jobs_processed = jobs_processed;
        }
        if let Some(jobs_failed) = patch.jobs_failed {
            self.jobs_failed = jobs_failed;
        }
        if let Some(busy_ms) = patch.busy_ms {
            self.busy_ms = busy_ms;
        }
        if let Some(cpu_percent) = patch.cpu_percent {
            self.cpu_percent = cpu_percent;
        }
        if let Some(memory_mb) = patch.memory_mb {
            self.memory_mb = memory_mb;
        }
    }
}

/// Partial update for [`Worker`]; absent fields leave the record unchanged.
///
/// Absence is structural (`Option`), not a sentinel value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkerPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<WorkerHealth>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jobs_processed: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jobs_failed: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub busy_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_percent: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_mb: Option<f64>,
}

impl WorkerPatch {
    crate::setters! {
        option {
            hostname: String,
            version: String,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.hostname.is_none()
            && self.version.is_none()
            && self.labels.is_none()
            && self.capabilities.is_none()
            && self.health.is_none()
            && self.jobs_processed.is_none()
            && self.jobs_failed.is_none()
            && self.busy_ms.is_none()
            && self.cpu_percent.is_none()
            && self.memory_mb.is_none()
    }
}

crate::builder! {
    pub struct WorkerBuilder => Worker {
        into {
            id: WorkerId = "w-test",
            hostname: String = "host-1",
            version: String = "1.0.0",
        }
        set {
            labels: BTreeMap<String, String> = BTreeMap::new(),
            capabilities: BTreeSet<String> = BTreeSet::new(),
            state: WorkerState = WorkerState::Running,
            health: WorkerHealth = WorkerHealth::default(),
            last_heartbeat_ms: u64 = 0,
            started_at_ms: u64 = 0,
            jobs_processed: u64 = 0,
            jobs_failed: u64 = 0,
            busy_ms: u64 = 0,
            cpu_percent: f64 = 0.0,
            memory_mb: f64 = 0.0,
        }
        option {
            current_job: CurrentJob = None,
        }
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
