// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Muster Contributors

//! Heartbeat sweeper: marks silent workers offline and prunes the long-dead.

use crate::audit::AuditJournal;
use crate::config::ControllerConfig;
use crate::error::FleetError;
use crate::registry::Registry;
use muster_core::{AuditRecord, Clock, WorkerState};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub struct HeartbeatMonitor<C: Clock> {
    registry: Arc<Registry<C>>,
    journal: Arc<AuditJournal<C>>,
    clock: C,
    heartbeat_timeout_ms: u64,
    sweep_interval: Duration,
    offline_retention_ms: u64,
}

impl<C: Clock> HeartbeatMonitor<C> {
    pub fn new(
        registry: Arc<Registry<C>>,
        journal: Arc<AuditJournal<C>>,
        clock: C,
        config: &ControllerConfig,
    ) -> Self {
        Self {
            registry,
            journal,
            clock,
            heartbeat_timeout_ms: config.heartbeat_timeout_ms,
            sweep_interval: Duration::from_millis(config.sweep_interval_ms),
            offline_retention_ms: config.offline_retention_ms,
        }
    }

    /// Run the sweeper until cancelled.
    pub fn spawn(self: Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(interval_ms = self.sweep_interval.as_millis() as u64, "heartbeat monitor started");
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(self.sweep_interval) => {
                        if let Err(err) = self.tick().await {
                            warn!(%err, "heartbeat sweep failed");
                        }
                    }
                }
            }
            info!("heartbeat monitor stopped");
        })
    }

    /// One sweep: offline the stale, prune the long-dead, trim the journal.
    pub async fn tick(&self) -> Result<(), FleetError> {
        let now = self.clock.epoch_ms();
        let cutoff = now.saturating_sub(self.heartbeat_timeout_ms);
        let (workers, _) = self.registry.snapshot().await?;

        for worker in &workers {
            if worker.state.is_active() && worker.last_heartbeat_ms < cutoff {
                let pre = self.registry.set_state(&worker.id, WorkerState::Offline).await?;
                info!(worker_id = %worker.id, last_heartbeat_ms = worker.last_heartbeat_ms, "worker offline");
                self.journal
                    .append(
                        AuditRecord::system("heartbeat-timeout", worker.id.as_str())
                            .pre_state(pre.state)
                            .post_state(WorkerState::Offline)
                            .reason("heartbeat-timeout")
                            .detail("cutoff_ms", cutoff.to_string())
                            .detail("last_heartbeat_ms", worker.last_heartbeat_ms.to_string()),
                    )
                    .await?;
            }
        }

        self.prune_offline(&workers, now).await?;
        self.journal.purge_expired().await?;
        Ok(())
    }

    /// Retention policy: a worker offline past `offline_retention` is gone
    /// for good and its record is removed.
    async fn prune_offline(
        &self,
        workers: &[muster_core::Worker],
        now: u64,
    ) -> Result<(), FleetError> {
        let cutoff = now.saturating_sub(self.offline_retention_ms);
        for worker in workers {
            if worker.state == WorkerState::Offline && worker.last_heartbeat_ms < cutoff {
                self.registry.remove(&worker.id).await?;
                self.journal
                    .append(
                        AuditRecord::system("remove", worker.id.as_str())
                            .pre_state(WorkerState::Offline)
                            .reason("offline-retention"),
                    )
                    .await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "heartbeat_tests.rs"]
mod tests;
