// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Muster Contributors

//! Worker registry: the authoritative view of the fleet.
//!
//! Writers serialize behind one async mutex; every logical write batches its
//! record and membership mutations into a single store pipeline so the two
//! never diverge. Readers go straight to the store and tolerate a snapshot.

use crate::config::ControllerConfig;
use crate::error::FleetError;
use crate::filter::{FleetSummary, ListQuery, ListResult, Page};
use crate::retry;
use muster_core::{Clock, CurrentJob, Worker, WorkerId, WorkerPatch, WorkerState};
use muster_store::{keys, Op, SharedStore};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub struct Registry<C: Clock> {
    store: SharedStore,
    clock: C,
    max_retries: u32,
    default_page_size: usize,
    write_lock: Mutex<()>,
}

impl<C: Clock> Registry<C> {
    pub fn new(store: SharedStore, clock: C, config: &ControllerConfig) -> Self {
        Self {
            store,
            clock,
            max_retries: config.max_retries,
            default_page_size: config.default_page_size,
            write_lock: Mutex::new(()),
        }
    }

    /// Register a worker, idempotently by id.
    ///
    /// Fills `started_at` when the worker didn't report one, stamps the
    /// heartbeat, and forces the initial state to running.
    pub async fn register(&self, mut worker: Worker) -> Result<Worker, FleetError> {
        let _guard = self.write_lock.lock().await;
        let now = self.clock.epoch_ms();
        if worker.started_at_ms == 0 {
            worker.started_at_ms = now;
        }
        worker.last_heartbeat_ms = now;
        worker.state = WorkerState::Running;

        let record = encode(&worker)?;
        let id = worker.id.as_str().to_string();
        self.write_pipeline(vec![
            Op::Set { key: keys::worker(&id), value: record },
            Op::SetAdd { key: keys::ACTIVE_WORKERS.to_string(), member: id.clone() },
        ])
        .await?;
        info!(worker_id = %worker.id, hostname = %worker.hostname, "worker registered");
        Ok(worker)
    }

    /// Merge non-empty patch fields into the stored record.
    ///
    /// An update is a liveness signal: an offline or unknown worker that
    /// reaches us again is put back to running.
    pub async fn update(&self, id: &WorkerId, patch: WorkerPatch) -> Result<Worker, FleetError> {
        let _guard = self.write_lock.lock().await;
        let mut worker = self.load(id).await?;
        worker.apply_patch(patch);
        self.recover_if_silent(&mut worker);
        self.put(&worker).await?;
        Ok(worker)
    }

    pub async fn get(&self, id: &WorkerId) -> Result<Worker, FleetError> {
        self.load(id).await
    }

    /// Record a heartbeat, monotonically.
    ///
    /// A heartbeat at or before the stored timestamp is discarded without
    /// error. The optional current job lands in the same pipeline as the
    /// timestamp so the pair is never half-applied.
    pub async fn heartbeat(
        &self,
        id: &WorkerId,
        at_ms: u64,
        current_job: Option<CurrentJob>,
    ) -> Result<(), FleetError> {
        let _guard = self.write_lock.lock().await;
        let mut worker = self.load(id).await?;
        if at_ms <= worker.last_heartbeat_ms {
            debug!(worker_id = %id, at_ms, stored = worker.last_heartbeat_ms, "stale heartbeat discarded");
            return Ok(());
        }
        worker.last_heartbeat_ms = at_ms;
        self.recover_if_silent(&mut worker);
        if worker.state.may_hold_job() {
            worker.current_job = current_job;
        }
        self.put(&worker).await?;
        Ok(())
    }

    /// Transition a worker, enforcing the state machine.
    ///
    /// Returns the pre-transition record. A state that cannot hold a job
    /// sheds the current-job reference in the same write.
    pub async fn set_state(
        &self,
        id: &WorkerId,
        new_state: WorkerState,
    ) -> Result<Worker, FleetError> {
        let _guard = self.write_lock.lock().await;
        let mut worker = self.load(id).await?;
        let previous = worker.clone();
        if !worker.state.can_transition_to(new_state) {
            return Err(FleetError::IllegalTransition { from: worker.state, to: new_state });
        }
        worker.state = new_state;
        if !new_state.may_hold_job() {
            worker.current_job = None;
        }
        self.put(&worker).await?;
        debug!(worker_id = %id, from = %previous.state, to = %new_state, "state transition");
        Ok(previous)
    }

    /// Remove a worker record and its membership entry together.
    ///
    /// Idempotent: removing an unknown id succeeds and reports `false`.
    pub async fn remove(&self, id: &WorkerId) -> Result<bool, FleetError> {
        let _guard = self.write_lock.lock().await;
        let existed = self.load(id).await.is_ok();
        let key = keys::worker(id.as_str());
        self.write_pipeline(vec![
            Op::Del { key },
            Op::SetRemove {
                key: keys::ACTIVE_WORKERS.to_string(),
                member: id.as_str().to_string(),
            },
        ])
        .await?;
        if existed {
            info!(worker_id = %id, "worker removed");
        }
        Ok(existed)
    }

    /// Filtered, sorted, paginated fleet snapshot with a summary over the
    /// whole filtered set.
    ///
    /// Never errors on an empty fleet; undecodable records are skipped and
    /// flagged via `warning`.
    pub async fn list(&self, query: &ListQuery) -> Result<ListResult, FleetError> {
        let (mut workers, skipped) = self.snapshot().await?;
        workers.retain(|w| query.filter.matches(w));
        query.sort.apply(&mut workers);

        let summary = FleetSummary::compute(&workers, self.clock.epoch_ms());
        let total = workers.len();

        let page = query.page.unwrap_or(Page { number: 1, size: self.default_page_size }).clamped();
        let start = (page.number - 1).saturating_mul(page.size);
        let workers: Vec<Worker> = workers.into_iter().skip(start).take(page.size).collect();

        let warning = (skipped > 0).then(|| format!("{skipped} undecodable worker records skipped"));
        Ok(ListResult {
            workers,
            total,
            page: page.number,
            page_size: page.size,
            summary,
            warning,
        })
    }

    /// Every decodable worker record, plus the count of skipped ones.
    pub async fn snapshot(&self) -> Result<(Vec<Worker>, usize), FleetError> {
        let store = &self.store;
        let max_retries = self.max_retries;
        let record_keys = retry::with_retry(max_retries, || store.scan(keys::WORKER_SCAN)).await?;
        let mut workers = Vec::with_capacity(record_keys.len());
        let mut skipped = 0;
        for key in record_keys {
            let value = retry::with_retry(max_retries, || store.get(&key)).await?;
            match value.map(decode) {
                Some(Ok(worker)) => workers.push(worker),
                Some(Err(err)) => {
                    warn!(%key, %err, "skipping undecodable worker record");
                    skipped += 1;
                }
                None => {}
            }
        }
        Ok((workers, skipped))
    }

    async fn load(&self, id: &WorkerId) -> Result<Worker, FleetError> {
        let key = keys::worker(id.as_str());
        let store = &self.store;
        let value = retry::with_retry(self.max_retries, || store.get(&key)).await?;
        match value {
            Some(value) => decode(value),
            None => Err(FleetError::NotFound(id.clone())),
        }
    }

    async fn put(&self, worker: &Worker) -> Result<(), FleetError> {
        let record = encode(worker)?;
        let key = keys::worker(worker.id.as_str());
        self.write_pipeline(vec![Op::Set { key, value: record }]).await
    }

    async fn write_pipeline(&self, ops: Vec<Op>) -> Result<(), FleetError> {
        let store = &self.store;
        retry::with_retry(self.max_retries, || store.pipeline(ops.clone())).await?;
        Ok(())
    }

    /// Liveness recovery: offline/unknown workers that reach us go back to
    /// running.
    fn recover_if_silent(&self, worker: &mut Worker) {
        if matches!(worker.state, WorkerState::Offline | WorkerState::Unknown) {
            info!(worker_id = %worker.id, from = %worker.state, "heartbeat recovered");
            worker.state = WorkerState::Running;
        }
    }
}

fn encode(worker: &Worker) -> Result<Value, FleetError> {
    serde_json::to_value(worker)
        .map_err(|e| FleetError::internal(format!("encode worker {}: {e}", worker.id)))
}

fn decode(value: Value) -> Result<Worker, FleetError> {
    serde_json::from_value(value).map_err(|e| FleetError::internal(format!("decode worker: {e}")))
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
