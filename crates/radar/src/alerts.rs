// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Muster Contributors

//! Alert lifecycle: reconcile desired vs. active, fan out notifications.

use indexmap::IndexMap;
use muster_core::{Alert, AlertNotification, Clock};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Synchronous alert consumer. Must return quickly; the manager enforces a
/// per-call timeout and isolates panics.
pub type AlertCallback = Arc<dyn Fn(AlertNotification) + Send + Sync>;

const DEFAULT_CALLBACK_TIMEOUT: Duration = Duration::from_secs(1);

pub struct AlertManager<C: Clock> {
    clock: C,
    callback_timeout: Duration,
    // Registration order is delivery order.
    callbacks: RwLock<Vec<AlertCallback>>,
    active: Mutex<IndexMap<String, Alert>>,
}

impl<C: Clock> AlertManager<C> {
    pub fn new(clock: C) -> Self {
        Self::with_callback_timeout(clock, DEFAULT_CALLBACK_TIMEOUT)
    }

    pub fn with_callback_timeout(clock: C, callback_timeout: Duration) -> Self {
        Self {
            clock,
            callback_timeout,
            callbacks: RwLock::new(Vec::new()),
            active: Mutex::new(IndexMap::new()),
        }
    }

    pub fn register(&self, callback: impl Fn(AlertNotification) + Send + Sync + 'static) {
        self.callbacks.write().push(Arc::new(callback));
    }

    /// Currently active alerts, oldest registration first.
    pub fn active(&self) -> Vec<Alert> {
        self.active.lock().values().cloned().collect()
    }

    /// Reconcile one cycle's desired alerts against the active set.
    ///
    /// New ids notify `Raised`; persisting ids refresh in place (re-notify
    /// only when severity changed); absent ids notify `Resolved` and drop.
    /// All callbacks for this cycle complete before the call returns.
    pub async fn reconcile(&self, desired: Vec<Alert>) -> Vec<AlertNotification> {
        let now = self.clock.epoch_ms();
        let mut notifications = Vec::new();
        {
            let mut active = self.active.lock();
            let mut next = IndexMap::new();
            for mut alert in desired {
                match active.shift_remove(&alert.id) {
                    None => {
                        alert.created_at_ms = now;
                        alert.updated_at_ms = now;
                        notifications.push(AlertNotification::Raised(alert.clone()));
                        next.insert(alert.id.clone(), alert);
                    }
                    Some(existing) => {
                        alert.created_at_ms = existing.created_at_ms;
                        alert.updated_at_ms = now;
                        if alert.severity != existing.severity {
                            notifications.push(AlertNotification::Raised(alert.clone()));
                        }
                        next.insert(alert.id.clone(), alert);
                    }
                }
            }
            // Whatever is left in the active set was not re-raised.
            for (_, mut resolved) in active.drain(..) {
                resolved.updated_at_ms = now;
                notifications.push(AlertNotification::Resolved(resolved));
            }
            *active = next;
        }

        for notification in &notifications {
            self.fan_out(notification).await;
        }
        notifications
    }

    /// Deliver one notification to every callback, in registration order.
    ///
    /// Each call runs on a blocking thread with a timeout, so a slow or
    /// panicking callback cannot wedge the others or the monitoring loop.
    async fn fan_out(&self, notification: &AlertNotification) {
        let callbacks: Vec<AlertCallback> = self.callbacks.read().clone();
        for callback in callbacks {
            let note = notification.clone();
            let call = tokio::task::spawn_blocking(move || callback(note));
            match tokio::time::timeout(self.callback_timeout, call).await {
                Ok(Ok(())) => {}
                Ok(Err(join_err)) => {
                    warn!(%join_err, "alert callback panicked");
                }
                Err(_) => {
                    warn!(
                        timeout_ms = self.callback_timeout.as_millis() as u64,
                        "alert callback timed out"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "alerts_tests.rs"]
mod tests;
