// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Muster Contributors

//! Service composition and shutdown.

use crate::lifecycle::{Config, LifecycleError};
use muster_core::SystemClock;
use muster_fleet::{
    AuditJournal, FleetController, HeartbeatMonitor, Registry, SignalDispatcher,
    StoreSignalTransport,
};
use muster_radar::{MetricsCollector, Radar};
use muster_store::{MemoryStore, SharedStore};
use std::fs::File;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// The assembled control plane.
///
/// Owns the store, the fleet controller, the radar, and both background
/// tasks. Dropping the service releases the daemon lock.
pub struct Service {
    pub controller: Arc<FleetController<SystemClock>>,
    pub radar: Arc<Radar<SystemClock>>,
    cancel: CancellationToken,
    sweeper: JoinHandle<()>,
    // NOTE(lifetime): held to maintain the exclusive pid lock; released on drop
    #[allow(dead_code)]
    lock_file: Option<File>,
}

impl Service {
    /// Build everything and spawn the background tasks.
    pub fn start(
        config: &Config,
        collector: Arc<dyn MetricsCollector>,
        lock_file: Option<File>,
    ) -> Result<Self, LifecycleError> {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let clock = SystemClock;

        let registry = Arc::new(Registry::new(store.clone(), clock.clone(), &config.controller));
        let journal = Arc::new(AuditJournal::new(
            store.clone(),
            clock.clone(),
            config.controller.audit_retention_ms,
            config.controller.max_retries,
        ));
        let dispatcher = SignalDispatcher::new(
            Arc::new(StoreSignalTransport::new(store.clone())),
            Duration::from_millis(config.controller.signal_ack_timeout_ms),
        );
        let controller = Arc::new(FleetController::new(
            registry.clone(),
            journal.clone(),
            dispatcher,
            clock.clone(),
            config.controller.clone(),
        )?);

        let radar = Arc::new(Radar::new(collector, clock.clone(), config.radar.clone())?);

        let cancel = CancellationToken::new();
        let sweeper = Arc::new(HeartbeatMonitor::new(registry, journal, clock, &config.controller))
            .spawn(cancel.child_token());
        radar.start(cancel.child_token());

        info!("control plane started");
        Ok(Self { controller, radar, cancel, sweeper, lock_file })
    }

    /// Cooperative shutdown: cancel both loops and wait them out. In-flight
    /// signal dispatches finish up to their own ack timeouts first.
    pub async fn shutdown(self) {
        info!("shutting down control plane");
        self.cancel.cancel();
        if let Err(err) = self.sweeper.await {
            warn!(%err, "heartbeat monitor join failed");
        }
        self.radar.stop().await;
        info!("control plane shutdown complete");
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
