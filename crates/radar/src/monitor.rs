// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Muster Contributors

//! The monitoring loop and the radar's public surface.
//!
//! One cooperative task per radar: collect, append to the window, derive
//! rates, update the budget, detect anomalies, reconcile alerts, all under
//! a single exclusive section so outside readers always observe a
//! consistent picture.

use crate::alerts::AlertManager;
use crate::anomaly::{AnomalyDetector, AnomalyStatus};
use crate::budget::BudgetEngine;
use crate::collector::MetricsCollector;
use crate::config::RadarConfig;
use crate::error::RadarError;
use crate::window::RollingWindow;
use muster_core::{
    Alert, AlertKind, AlertNotification, Clock, MetricSnapshot, Severity, SloBudget, SloConfig,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

struct MonitorState {
    config: RadarConfig,
    window: RollingWindow,
    budget_engine: BudgetEngine,
    detector: AnomalyDetector,
    budget: SloBudget,
    status: AnomalyStatus,
}

pub struct Radar<C: Clock> {
    state: Mutex<MonitorState>,
    alerts: AlertManager<C>,
    collector: Arc<dyn MetricsCollector>,
    clock: C,
    // Tick serialization: callbacks for one cycle finish before the next
    // cycle begins.
    tick_lock: tokio::sync::Mutex<()>,
    cancel: Mutex<Option<CancellationToken>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<C: Clock> Radar<C> {
    pub fn new(
        collector: Arc<dyn MetricsCollector>,
        clock: C,
        config: RadarConfig,
    ) -> Result<Self, RadarError> {
        config.validate()?;
        let window = RollingWindow::new(config.metric_retention_ms, config.max_snapshots);
        let budget_engine = BudgetEngine::new(config.slo.clone());
        let detector = AnomalyDetector::new(config.thresholds);
        Ok(Self {
            state: Mutex::new(MonitorState {
                config,
                window,
                budget_engine,
                detector,
                budget: SloBudget::default(),
                status: AnomalyStatus::default(),
            }),
            alerts: AlertManager::new(clock.clone()),
            collector,
            clock,
            tick_lock: tokio::sync::Mutex::new(()),
            cancel: Mutex::new(None),
            task: Mutex::new(None),
        })
    }

    // --- public surface ---

    pub fn register_alert_callback(
        &self,
        callback: impl Fn(AlertNotification) + Send + Sync + 'static,
    ) {
        self.alerts.register(callback);
    }

    pub fn current_status(&self) -> (AnomalyStatus, SloBudget) {
        let state = self.state.lock();
        (state.status.clone(), state.budget.clone())
    }

    pub fn active_alerts(&self) -> Vec<Alert> {
        self.alerts.active()
    }

    /// Snapshots within the given trailing window, oldest first.
    pub fn metrics(&self, window_ms: u64) -> Vec<MetricSnapshot> {
        let now = self.clock.epoch_ms();
        self.state.lock().window.within(window_ms, now).into_iter().cloned().collect()
    }

    /// Nearest-rank percentile over the p95 series in the window.
    /// `None` when the window is empty or `p` is out of range.
    pub fn percentile(&self, p: f64, window_ms: u64) -> Option<f64> {
        if !(p > 0.0 && p < 1.0) {
            return None;
        }
        let mut values: Vec<f64> = self
            .metrics(window_ms)
            .iter()
            .map(|s| s.p95_ms)
            .filter(|v| v.is_finite())
            .collect();
        if values.is_empty() {
            return None;
        }
        values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let rank = ((p * values.len() as f64).ceil() as usize).clamp(1, values.len());
        Some(values[rank - 1])
    }

    /// Validate and swap the radar configuration atomically.
    pub fn update_config(&self, config: RadarConfig) -> Result<(), RadarError> {
        config.validate()?;
        let mut state = self.state.lock();
        state.window.reconfigure(config.metric_retention_ms, config.max_snapshots);
        state.budget_engine.set_config(config.slo.clone());
        state.detector.set_thresholds(config.thresholds);
        state.config = config;
        Ok(())
    }

    pub fn config(&self) -> RadarConfig {
        self.state.lock().config.clone()
    }

    /// Spawn the monitoring loop. Idempotent: a second start is a no-op
    /// until `stop` is called.
    pub fn start(self: &Arc<Self>, cancel: CancellationToken) {
        let mut task = self.task.lock();
        if task.is_some() {
            return;
        }
        *self.cancel.lock() = Some(cancel.clone());
        let radar = self.clone();
        *task = Some(tokio::spawn(async move {
            let interval = Duration::from_millis(radar.state.lock().config.monitoring_interval_ms);
            info!(interval_ms = interval.as_millis() as u64, "monitoring loop started");
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {
                        radar.tick(&cancel).await;
                    }
                }
            }
            info!("monitoring loop stopped");
        }));
    }

    /// Cancel the loop and wait for it to wind down. No callbacks fire
    /// after this returns.
    pub async fn stop(&self) {
        if let Some(cancel) = self.cancel.lock().take() {
            cancel.cancel();
        }
        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(err) = task.await {
                warn!(%err, "monitoring loop join failed");
            }
        }
        // A tick in flight at cancellation still holds this lock.
        let _guard = self.tick_lock.lock().await;
    }

    /// One monitoring cycle. Public for tests and for callers that drive
    /// the loop themselves.
    pub async fn tick(&self, cancel: &CancellationToken) {
        let _cycle = self.tick_lock.lock().await;

        let snapshot = match self.collector.collect(cancel).await {
            Ok(snapshot) => snapshot,
            Err(RadarError::CollectionFailed(reason)) => {
                warn!(%reason, "metrics collection failed, skipping cycle");
                return;
            }
            Err(err) => {
                warn!(%err, "unexpected collector error, skipping cycle");
                return;
            }
        };

        let now = self.clock.epoch_ms();
        let (budget, status) = {
            let mut state = self.state.lock();

            let mut snapshot = snapshot;
            snapshot.derive_error_rate();
            if let Some(previous) = state.window.latest() {
                snapshot.derive_backlog_growth(previous);
            }
            state.window.push(snapshot, now);

            if let Some(budget) = state.budget_engine.evaluate(&state.window, now) {
                state.budget = budget;
            }
            let budget_level = state.budget.alert_level;
            // The freshly pushed snapshot is the latest by construction.
            let status = match state.window.latest() {
                Some(latest) => state.detector.evaluate(latest, budget_level, now),
                None => AnomalyStatus::default(),
            };
            state.status = status.clone();
            (state.budget.clone(), status)
        };

        let slo = self.state.lock().config.slo.clone();
        let desired = desired_alerts(&status, &budget, &slo);
        self.alerts.reconcile(desired).await;
    }
}

/// Build the desired alert set for this cycle from the anomaly statuses and
/// the budget level.
fn desired_alerts(status: &AnomalyStatus, budget: &SloBudget, slo: &SloConfig) -> Vec<Alert> {
    let mut desired = Vec::new();
    for metric in status.metrics.values() {
        if metric.severity > Severity::None {
            desired.push(Alert {
                id: metric.kind.id().to_string(),
                kind: metric.kind,
                severity: metric.severity,
                message: format!(
                    "{} at {:.4} breaches {:.4} threshold",
                    metric.kind, metric.value, metric.threshold
                ),
                value: metric.value,
                threshold: metric.threshold,
                created_at_ms: 0,
                updated_at_ms: 0,
            });
        }
    }
    if budget.alert_level > Severity::None {
        let threshold = if budget.alert_level == Severity::Critical {
            slo.burn_rate_fast
        } else {
            slo.burn_rate_slow
        };
        desired.push(Alert {
            id: AlertKind::BurnRate.id().to_string(),
            kind: AlertKind::BurnRate,
            severity: budget.alert_level,
            message: format!(
                "error budget {:.0}% consumed, burning at {:.2}x",
                budget.utilization * 100.0,
                budget.burn_rate
            ),
            value: budget.burn_rate,
            threshold,
            created_at_ms: 0,
            updated_at_ms: 0,
        });
    }
    desired
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
