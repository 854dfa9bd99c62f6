// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Muster Contributors

//! Shared fixtures for the scenario specs.

pub use muster_core::{
    AuditFilter, AuditOutcome, Clock, CurrentJob, FakeClock, MetricSnapshot, Severity,
    SystemClock, TargetSelector, Worker, WorkerId, WorkerState,
};
pub use muster_fleet::{
    AuditJournal, ControllerConfig, FleetController, FleetError, HeartbeatMonitor, ListQuery,
    Registry, ReplyStatus, SignalDispatcher, SignalEnvelope, SignalReply, StoreSignalTransport,
};
pub use muster_radar::{MetricsCollector, Radar, RadarConfig, RadarError};
pub use muster_store::{keys, MemoryStore, Store};

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// A fleet stack over one in-memory store.
pub struct FleetStack<C: Clock> {
    pub store: Arc<MemoryStore>,
    pub registry: Arc<Registry<C>>,
    pub journal: Arc<AuditJournal<C>>,
    pub monitor: HeartbeatMonitor<C>,
    pub controller: Arc<FleetController<C>>,
}

pub fn fleet_stack<C: Clock>(clock: C, config: ControllerConfig) -> FleetStack<C> {
    let store = Arc::new(MemoryStore::new());
    let registry = Arc::new(Registry::new(store.clone(), clock.clone(), &config));
    let journal = Arc::new(AuditJournal::new(
        store.clone(),
        clock.clone(),
        config.audit_retention_ms,
        config.max_retries,
    ));
    let monitor =
        HeartbeatMonitor::new(registry.clone(), journal.clone(), clock.clone(), &config);
    let dispatcher = SignalDispatcher::new(
        Arc::new(StoreSignalTransport::new(store.clone())),
        Duration::from_millis(config.signal_ack_timeout_ms),
    );
    let controller = Arc::new(
        FleetController::new(registry.clone(), journal.clone(), dispatcher, clock, config)
            .expect("valid config"),
    );
    FleetStack { store, registry, journal, monitor, controller }
}

/// Acks every envelope for `worker_id`; optionally re-registers after a
/// finalized stop, emulating a restarting worker process.
pub fn spawn_acker<C: Clock>(stack: &FleetStack<C>, worker_id: &str, reregister: bool) {
    let store = stack.store.clone();
    let registry = stack.registry.clone();
    let mut signals = stack.store.subscribe(&keys::signal_channel(worker_id));
    let worker_id = worker_id.to_string();
    tokio::spawn(async move {
        while let Some(value) = signals.recv().await {
            let envelope: SignalEnvelope =
                serde_json::from_value(value).expect("valid envelope");
            let reply = SignalReply {
                action_id: envelope.action_id,
                status: ReplyStatus::Acked,
                detail: None,
            };
            store
                .publish(
                    &keys::reply_channel(envelope.action_id.as_str()),
                    serde_json::to_value(&reply).expect("encodable reply"),
                )
                .await
                .expect("publish reply");

            if reregister && envelope.action == muster_core::ControlKind::Stop {
                let id = WorkerId::new(&worker_id);
                loop {
                    match registry.get(&id).await {
                        Ok(w) if w.state == WorkerState::Stopped => break,
                        Err(_) => break,
                        _ => tokio::time::sleep(Duration::from_millis(5)).await,
                    }
                }
                registry
                    .register(prod_worker(&worker_id))
                    .await
                    .expect("re-registration");
            }
        }
    });
}

pub fn prod_worker(id: &str) -> Worker {
    let mut worker = Worker::new(id, format!("host-{id}"), "1.0.0");
    worker.labels.insert("env".to_string(), "prod".to_string());
    worker
}

/// Collector replaying a script of snapshots for radar scenarios.
pub struct ScriptedCollector {
    script: Mutex<VecDeque<Result<MetricSnapshot, RadarError>>>,
}

impl ScriptedCollector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { script: Mutex::new(VecDeque::new()) })
    }

    pub fn push_ok(&self, snapshot: MetricSnapshot) {
        self.script.lock().push_back(Ok(snapshot));
    }
}

#[async_trait::async_trait]
impl MetricsCollector for ScriptedCollector {
    async fn collect(&self, _cancel: &CancellationToken) -> Result<MetricSnapshot, RadarError> {
        self.script
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(RadarError::CollectionFailed("script exhausted".to_string())))
    }
}
