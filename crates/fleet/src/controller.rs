// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Muster Contributors

//! Fleet controller: validates, safety-checks, transitions, dispatches,
//! audits.
//!
//! Each accepted action runs the same pipeline per worker: transition the
//! registry, publish the signal, resolve the confirmation, write the audit
//! record. Workers are serialized individually; the controller never holds a
//! registry lock across a dispatch wait.

use crate::audit::AuditJournal;
use crate::config::ControllerConfig;
use crate::error::FleetError;
use crate::filter::{FleetSummary, ListQuery, ListResult};
use crate::registry::Registry;
use crate::safety::SafetyChecker;
use crate::signal::{SignalDispatcher, SignalEnvelope, SignalOutcome};
use muster_core::{
    AuditFilter, AuditOutcome, AuditRecord, Clock, ControlAction, ControlKind, CurrentJob,
    TargetSelector, Worker, WorkerId, WorkerPatch, WorkerState,
};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Poll cadence while waiting for a restarted worker to re-register.
const REREGISTER_POLL: Duration = Duration::from_millis(100);

/// Per-worker outcome of one control action.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerActionResult {
    pub worker_id: WorkerId,
    pub pre_state: Option<WorkerState>,
    pub post_state: Option<WorkerState>,
    pub signal: Option<SignalOutcome>,
    pub outcome: AuditOutcome,
    pub error: Option<String>,
}

/// Aggregate outcome of one control action.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlReport {
    pub action_id: muster_core::ActionId,
    pub kind: ControlKind,
    pub outcome: AuditOutcome,
    pub results: Vec<WorkerActionResult>,
}

impl ControlReport {
    /// Ids whose signal did not confirm in time.
    pub fn unconfirmed(&self) -> Vec<WorkerId> {
        self.results
            .iter()
            .filter(|r| r.outcome == AuditOutcome::Partial)
            .map(|r| r.worker_id.clone())
            .collect()
    }
}

pub struct FleetController<C: Clock> {
    registry: Arc<Registry<C>>,
    journal: Arc<AuditJournal<C>>,
    safety: SafetyChecker,
    dispatcher: SignalDispatcher,
    clock: C,
    config: ControllerConfig,
    // One async mutex per worker id; control requests for the same worker
    // run sequentially, different workers in parallel.
    worker_locks: Mutex<HashMap<WorkerId, Arc<tokio::sync::Mutex<()>>>>,
}

impl<C: Clock> FleetController<C> {
    pub fn new(
        registry: Arc<Registry<C>>,
        journal: Arc<AuditJournal<C>>,
        dispatcher: SignalDispatcher,
        clock: C,
        config: ControllerConfig,
    ) -> Result<Self, FleetError> {
        config.validate()?;
        Ok(Self {
            registry,
            journal,
            safety: SafetyChecker::new(&config),
            dispatcher,
            clock,
            config,
            worker_locks: Mutex::new(HashMap::new()),
        })
    }

    // --- registry surface ---

    pub async fn register_worker(&self, worker: Worker) -> Result<Worker, FleetError> {
        self.registry.register(worker).await
    }

    pub async fn heartbeat(
        &self,
        id: &WorkerId,
        at_ms: u64,
        current_job: Option<CurrentJob>,
    ) -> Result<(), FleetError> {
        self.registry.heartbeat(id, at_ms, current_job).await
    }

    pub async fn update_worker(
        &self,
        id: &WorkerId,
        patch: WorkerPatch,
    ) -> Result<Worker, FleetError> {
        self.registry.update(id, patch).await
    }

    pub async fn get_worker(&self, id: &WorkerId) -> Result<Worker, FleetError> {
        self.registry.get(id).await
    }

    pub async fn list_workers(&self, query: &ListQuery) -> Result<ListResult, FleetError> {
        self.registry.list(query).await
    }

    pub async fn get_fleet_summary(&self) -> Result<FleetSummary, FleetError> {
        Ok(self.registry.list(&ListQuery::default()).await?.summary)
    }

    /// Remove a worker; idempotent, always audited.
    pub async fn remove_worker(
        &self,
        id: &WorkerId,
        initiator: &str,
    ) -> Result<bool, FleetError> {
        let pre_state = self.registry.get(id).await.ok().map(|w| w.state);
        let existed = self.registry.remove(id).await?;
        let mut record = AuditRecord::system("remove", id.as_str()).reason("operator remove");
        record.initiator = initiator.to_string();
        record.pre_state = pre_state;
        self.journal.append(record).await?;
        Ok(existed)
    }

    pub async fn get_audit_logs(
        &self,
        filter: &AuditFilter,
    ) -> Result<Vec<AuditRecord>, FleetError> {
        self.journal.query(filter).await
    }

    // --- control surface ---

    pub async fn pause(
        &self,
        target: TargetSelector,
        reason: &str,
        initiator: &str,
        deadline_ms: Option<u64>,
    ) -> Result<ControlReport, FleetError> {
        let mut builder = ControlAction::builder(ControlKind::Pause, target)
            .reason(reason)
            .initiator(initiator)
            .requested_at_ms(self.clock.epoch_ms());
        if let Some(d) = deadline_ms {
            builder = builder.deadline_ms(d);
        }
        self.apply(builder.build()).await
    }

    pub async fn resume(
        &self,
        target: TargetSelector,
        reason: &str,
        initiator: &str,
    ) -> Result<ControlReport, FleetError> {
        let action = ControlAction::builder(ControlKind::Resume, target)
            .reason(reason)
            .initiator(initiator)
            .requested_at_ms(self.clock.epoch_ms())
            .build();
        self.apply(action).await
    }

    pub async fn drain(
        &self,
        target: TargetSelector,
        reason: &str,
        initiator: &str,
        deadline_ms: u64,
    ) -> Result<ControlReport, FleetError> {
        let action = ControlAction::builder(ControlKind::Drain, target)
            .reason(reason)
            .initiator(initiator)
            .requested_at_ms(self.clock.epoch_ms())
            .deadline_ms(deadline_ms)
            .build();
        self.apply(action).await
    }

    pub async fn stop(
        &self,
        target: TargetSelector,
        reason: &str,
        initiator: &str,
        deadline_ms: Option<u64>,
        force: bool,
    ) -> Result<ControlReport, FleetError> {
        let mut builder = ControlAction::builder(ControlKind::Stop, target)
            .reason(reason)
            .initiator(initiator)
            .requested_at_ms(self.clock.epoch_ms())
            .force(force);
        if let Some(d) = deadline_ms {
            builder = builder.deadline_ms(d);
        }
        self.apply(builder.build()).await
    }

    /// Apply one validated control action through the full pipeline.
    pub async fn apply(&self, action: ControlAction) -> Result<ControlReport, FleetError> {
        let desired = desired_state(action.kind)?;
        let (fleet, _) = self.registry.snapshot().await?;
        let targets = resolve_targets(&action.target, &fleet)?;

        let approved =
            match self.safety.check(&action, &targets, &fleet, self.clock.epoch_ms()) {
                Ok(ids) => ids,
                Err(err) => {
                    if let FleetError::SafetyViolation { rule, hint } = &err {
                        self.journal
                            .append(
                                AuditRecord::for_action(
                                    action.id,
                                    action.kind,
                                    action.initiator.clone(),
                                    action.target.describe(),
                                )
                                .outcome(AuditOutcome::Rejected)
                                .reason(action.reason.clone())
                                .detail("rule", rule.clone())
                                .detail("hint", hint.clone()),
                            )
                            .await?;
                    }
                    return Err(err);
                }
            };

        info!(
            action_id = %action.id,
            kind = %action.kind,
            targets = approved.len(),
            initiator = %action.initiator,
            "control action approved"
        );

        let mut results = Vec::with_capacity(approved.len());
        for id in &approved {
            results.push(self.apply_to_worker(&action, id, desired).await?);
        }

        let outcome = aggregate_outcome(&results);
        Ok(ControlReport { action_id: action.id, kind: action.kind, outcome, results })
    }

    /// Rolling restart: per label-selected batch, drain then stop then wait
    /// for the replacement to register.
    ///
    /// `drain_window_ms` is the per-batch drain allowance; each batch gets a
    /// fresh absolute deadline. Safety failures mid-sequence halt the run.
    pub async fn rolling_restart(
        &self,
        label_selector: BTreeMap<String, String>,
        batch_size: usize,
        drain_window_ms: u64,
        reason: &str,
        initiator: &str,
    ) -> Result<Vec<ControlReport>, FleetError> {
        if batch_size == 0 {
            return Err(FleetError::ConfigInvalid {
                field: "batch_size".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        let (fleet, _) = self.registry.snapshot().await?;
        let mut members: Vec<WorkerId> = fleet
            .iter()
            .filter(|w| w.matches_labels(&label_selector))
            .map(|w| w.id.clone())
            .collect();
        members.sort();

        let mut reports = Vec::new();
        for batch in members.chunks(batch_size) {
            let targets = TargetSelector::Workers(batch.to_vec());
            let deadline = self.clock.epoch_ms() + drain_window_ms;

            let drained = self.drain(targets.clone(), reason, initiator, deadline).await?;
            reports.push(drained);

            let stopped = self.stop(targets, reason, initiator, Some(deadline), false).await?;
            reports.push(stopped);

            self.await_reregistration(batch, deadline).await?;
        }
        Ok(reports)
    }

    /// Poll until every worker in `batch` has registered back as running,
    /// or the deadline passes.
    async fn await_reregistration(
        &self,
        batch: &[WorkerId],
        deadline_ms: u64,
    ) -> Result<(), FleetError> {
        loop {
            let mut pending = Vec::new();
            for id in batch {
                match self.registry.get(id).await {
                    Ok(w) if w.state == WorkerState::Running => {}
                    Ok(_) | Err(FleetError::NotFound(_)) => pending.push(id.clone()),
                    Err(other) => return Err(other),
                }
            }
            if pending.is_empty() {
                return Ok(());
            }
            if self.clock.epoch_ms() >= deadline_ms {
                let stragglers =
                    pending.iter().map(|w| w.as_str()).collect::<Vec<_>>().join(",");
                warn!(%stragglers, "rolling restart halted: workers did not re-register");
                self.journal
                    .append(
                        AuditRecord::system("rolling-restart", stragglers.clone())
                            .outcome(AuditOutcome::Partial)
                            .reason("re-registration deadline passed"),
                    )
                    .await?;
                return Err(FleetError::internal(format!(
                    "rolling restart halted: {stragglers} did not re-register"
                )));
            }
            tokio::time::sleep(REREGISTER_POLL).await;
        }
    }

    /// The per-worker pipeline: transition, dispatch, resolve, audit.
    async fn apply_to_worker(
        &self,
        action: &ControlAction,
        id: &WorkerId,
        desired: WorkerState,
    ) -> Result<WorkerActionResult, FleetError> {
        let lock = self.worker_lock(id);
        let _guard = lock.lock().await;

        let pre = match self.registry.set_state(id, desired).await {
            Ok(previous) => previous,
            Err(FleetError::IllegalTransition { from, to }) => {
                self.journal
                    .append(
                        AuditRecord::for_action(
                            action.id,
                            action.kind,
                            action.initiator.clone(),
                            id.as_str(),
                        )
                        .pre_state(from)
                        .outcome(AuditOutcome::Rejected)
                        .reason(format!("illegal transition: {from} -> {to}")),
                    )
                    .await?;
                return Ok(WorkerActionResult {
                    worker_id: id.clone(),
                    pre_state: Some(from),
                    post_state: Some(from),
                    signal: None,
                    outcome: AuditOutcome::Rejected,
                    error: Some(format!("illegal transition: {from} -> {to}")),
                });
            }
            Err(other) => return Err(other),
        };

        let envelope = SignalEnvelope {
            action: action.kind,
            action_id: action.id,
            worker_id: id.clone(),
            deadline_ms: action.deadline_ms,
        };
        let signal = self.dispatcher.dispatch(&envelope).await?;

        let (post_state, outcome, error) = match &signal {
            SignalOutcome::Acked => {
                let post = if action.kind == ControlKind::Stop {
                    match self.registry.set_state(id, WorkerState::Stopped).await {
                        Ok(_) => WorkerState::Stopped,
                        // Worker re-registered or recovered between the ack
                        // and finalization; report what is actually there.
                        Err(FleetError::IllegalTransition { from, .. }) => from,
                        Err(other) => return Err(other),
                    }
                } else {
                    desired
                };
                (post, AuditOutcome::Accepted, None)
            }
            SignalOutcome::Timeout => {
                self.registry.set_state(id, WorkerState::Unknown).await?;
                (
                    WorkerState::Unknown,
                    AuditOutcome::Partial,
                    Some(format!(
                        "no ack within {}ms",
                        self.dispatcher.ack_timeout_ms()
                    )),
                )
            }
            SignalOutcome::Rejected { detail } => {
                // The worker refused; its actual state is unconfirmed.
                self.registry.set_state(id, WorkerState::Unknown).await?;
                let detail =
                    detail.clone().unwrap_or_else(|| "worker rejected signal".to_string());
                (WorkerState::Unknown, AuditOutcome::Partial, Some(detail))
            }
        };

        let mut record = AuditRecord::for_action(
            action.id,
            action.kind,
            action.initiator.clone(),
            id.as_str(),
        )
        .pre_state(pre.state)
        .post_state(post_state)
        .outcome(outcome)
        .reason(action.reason.clone())
        .detail("signal", signal.to_string());
        if let Some(err) = &error {
            record = record.detail("error", err.clone());
        }
        self.journal.append(record).await?;

        Ok(WorkerActionResult {
            worker_id: id.clone(),
            pre_state: Some(pre.state),
            post_state: Some(post_state),
            signal: Some(signal),
            outcome,
            error,
        })
    }

    fn worker_lock(&self, id: &WorkerId) -> Arc<tokio::sync::Mutex<()>> {
        self.worker_locks.lock().entry(id.clone()).or_default().clone()
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }
}

/// Registry state a control kind drives its targets into.
fn desired_state(kind: ControlKind) -> Result<WorkerState, FleetError> {
    match kind {
        ControlKind::Pause => Ok(WorkerState::Paused),
        ControlKind::Resume => Ok(WorkerState::Running),
        ControlKind::Drain => Ok(WorkerState::Draining),
        ControlKind::Stop => Ok(WorkerState::Stopping),
        // Rolling restart is a scripted sequence, not a single transition.
        ControlKind::RollingRestart => Err(FleetError::internal(
            "rolling restart cannot be applied as a single action",
        )),
    }
}

/// Resolve a selector against the fleet snapshot. Explicit ids must exist;
/// a label selector silently matches whatever is there.
fn resolve_targets(
    selector: &TargetSelector,
    fleet: &[Worker],
) -> Result<Vec<Worker>, FleetError> {
    let by_id = |id: &WorkerId| -> Result<Worker, FleetError> {
        fleet
            .iter()
            .find(|w| w.id == *id)
            .cloned()
            .ok_or_else(|| FleetError::NotFound(id.clone()))
    };
    match selector {
        TargetSelector::Worker(id) => Ok(vec![by_id(id)?]),
        TargetSelector::Workers(ids) => ids.iter().map(by_id).collect(),
        TargetSelector::Labels(labels) => {
            let mut matched: Vec<Worker> =
                fleet.iter().filter(|w| w.matches_labels(labels)).cloned().collect();
            matched.sort_by(|a, b| a.id.cmp(&b.id));
            Ok(matched)
        }
    }
}

fn aggregate_outcome(results: &[WorkerActionResult]) -> AuditOutcome {
    if results.iter().any(|r| r.outcome == AuditOutcome::Partial) {
        return AuditOutcome::Partial;
    }
    if !results.is_empty() && results.iter().all(|r| r.outcome == AuditOutcome::Rejected) {
        return AuditOutcome::Rejected;
    }
    if results.iter().any(|r| r.outcome == AuditOutcome::Rejected) {
        return AuditOutcome::Partial;
    }
    AuditOutcome::Accepted
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
