// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Muster Contributors

//! Safety gating for control actions.
//!
//! Rules evaluate in a fixed order against a fleet snapshot; the first
//! violated rule rejects the whole action with a machine-readable code and
//! a remediation hint. `force` bypasses the quorum and critical-job rules
//! only; deadline sanity and version gates always hold.

use crate::config::ControllerConfig;
use crate::error::FleetError;
use muster_core::{ControlAction, ControlKind, Worker, WorkerId, WorkerState};
use tracing::debug;

pub const RULE_MIN_RUNNING: &str = "min-running";
pub const RULE_CRITICAL_JOB: &str = "critical-job";
pub const RULE_DRAIN_DEADLINE: &str = "drain-deadline";
pub const RULE_VERSION_GATE: &str = "version-gate";

pub struct SafetyChecker {
    min_running: usize,
    min_drain_duration_ms: u64,
    require_version: Option<String>,
}

impl SafetyChecker {
    pub fn new(config: &ControllerConfig) -> Self {
        Self {
            min_running: config.min_running,
            min_drain_duration_ms: config.min_drain_duration_ms,
            require_version: config.require_version.clone(),
        }
    }

    /// Approve or reject `action` against the resolved targets and the
    /// current fleet snapshot. Returns the approved target id set.
    pub fn check(
        &self,
        action: &ControlAction,
        targets: &[Worker],
        fleet: &[Worker],
        now_ms: u64,
    ) -> Result<Vec<WorkerId>, FleetError> {
        self.check_min_running(action, targets, fleet)?;
        self.check_critical_jobs(action, targets)?;
        self.check_drain_deadline(action, now_ms)?;
        self.check_version_gate(targets)?;
        debug!(action_id = %action.id, targets = targets.len(), "safety check passed");
        Ok(targets.iter().map(|w| w.id.clone()).collect())
    }

    /// Rule 1: the fleet must keep its running quorum after the action.
    fn check_min_running(
        &self,
        action: &ControlAction,
        targets: &[Worker],
        fleet: &[Worker],
    ) -> Result<(), FleetError> {
        if action.force || !removes_from_running(action.kind) {
            return Ok(());
        }
        let running_now = fleet.iter().filter(|w| w.state == WorkerState::Running).count();
        let running_targeted = targets.iter().filter(|w| w.state == WorkerState::Running).count();
        let survivors = running_now.saturating_sub(running_targeted);
        if survivors < self.min_running {
            return Err(FleetError::SafetyViolation {
                rule: RULE_MIN_RUNNING.to_string(),
                hint: format!(
                    "action would leave {survivors} running, need at least {}; shrink the target set or pass force",
                    self.min_running
                ),
            });
        }
        Ok(())
    }

    /// Rule 2: no destructive signal to a worker mid critical-tagged job.
    fn check_critical_jobs(
        &self,
        action: &ControlAction,
        targets: &[Worker],
    ) -> Result<(), FleetError> {
        if action.force || !is_destructive(action.kind) {
            return Ok(());
        }
        if let Some(worker) = targets
            .iter()
            .find(|w| w.current_job.as_ref().is_some_and(|j| j.is_critical()))
        {
            return Err(FleetError::SafetyViolation {
                rule: RULE_CRITICAL_JOB.to_string(),
                hint: format!(
                    "worker {} is executing a critical-tagged job; wait for completion or pass force",
                    worker.id
                ),
            });
        }
        Ok(())
    }

    /// Rule 3: a drain needs room to actually drain.
    fn check_drain_deadline(&self, action: &ControlAction, now_ms: u64) -> Result<(), FleetError> {
        if !matches!(action.kind, ControlKind::Drain | ControlKind::RollingRestart) {
            return Ok(());
        }
        let Some(deadline) = action.deadline_ms else {
            return Err(FleetError::SafetyViolation {
                rule: RULE_DRAIN_DEADLINE.to_string(),
                hint: "drain requires a deadline".to_string(),
            });
        };
        let room = deadline.saturating_sub(now_ms);
        if room < self.min_drain_duration_ms {
            return Err(FleetError::SafetyViolation {
                rule: RULE_DRAIN_DEADLINE.to_string(),
                hint: format!(
                    "deadline leaves {room}ms to drain, minimum is {}ms; extend the deadline",
                    self.min_drain_duration_ms
                ),
            });
        }
        Ok(())
    }

    /// Rule 4: refuse targets below the required version.
    fn check_version_gate(&self, targets: &[Worker]) -> Result<(), FleetError> {
        let Some(required) = self.require_version.as_deref() else {
            return Ok(());
        };
        if let Some(worker) = targets.iter().find(|w| version_lt(&w.version, required)) {
            return Err(FleetError::SafetyViolation {
                rule: RULE_VERSION_GATE.to_string(),
                hint: format!(
                    "worker {} runs version {} below required {required}; upgrade it first",
                    worker.id, worker.version
                ),
            });
        }
        Ok(())
    }
}

/// Kinds that take a worker out of the running pool.
fn removes_from_running(kind: ControlKind) -> bool {
    matches!(
        kind,
        ControlKind::Pause | ControlKind::Drain | ControlKind::Stop | ControlKind::RollingRestart
    )
}

/// Kinds that may kill in-flight work.
fn is_destructive(kind: ControlKind) -> bool {
    matches!(kind, ControlKind::Stop | ControlKind::RollingRestart)
}

/// Dotted-numeric version comparison; non-numeric segments compare as
/// strings. `1.2.10` > `1.2.9`, `1.10` > `1.9`.
fn version_lt(version: &str, required: &str) -> bool {
    let mut a = version.split('.');
    let mut b = required.split('.');
    loop {
        match (a.next(), b.next()) {
            (None, None) => return false,
            (None, Some(_)) => return true,
            (Some(_), None) => return false,
            (Some(x), Some(y)) => {
                let ord = match (x.parse::<u64>(), y.parse::<u64>()) {
                    (Ok(xn), Ok(yn)) => xn.cmp(&yn),
                    _ => x.cmp(y),
                };
                match ord {
                    std::cmp::Ordering::Less => return true,
                    std::cmp::Ordering::Greater => return false,
                    std::cmp::Ordering::Equal => continue,
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "safety_tests.rs"]
mod tests;
