// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Muster Contributors

//! Queue metric snapshots shared between the radar and daemon crates.

use serde::{Deserialize, Serialize};

/// One point-in-time sample of queue health.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MetricSnapshot {
    pub timestamp_ms: u64,
    pub backlog_size: u64,
    pub request_count: u64,
    pub error_count: u64,
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    /// Derived: error_count / request_count, in [0, 1]. Filled by the
    /// monitoring loop after collection.
    #[serde(default)]
    pub error_rate: f64,
    /// Derived: backlog delta per second against the previous snapshot.
    #[serde(default)]
    pub backlog_growth: f64,
}

impl MetricSnapshot {
    /// Recompute `error_rate` from the raw counts.
    pub fn derive_error_rate(&mut self) {
        self.error_rate = if self.request_count == 0 {
            0.0
        } else {
            self.error_count as f64 / self.request_count as f64
        };
    }

    /// Recompute `backlog_growth` (items/second) against `previous`.
    ///
    /// Leaves the field untouched when the timestamps do not advance,
    /// so a duplicate-timestamp snapshot keeps its prior derivation.
    pub fn derive_backlog_growth(&mut self, previous: &MetricSnapshot) {
        let dt_ms = self.timestamp_ms.saturating_sub(previous.timestamp_ms);
        if dt_ms == 0 {
            return;
        }
        let delta = self.backlog_size as f64 - previous.backlog_size as f64;
        self.backlog_growth = delta / (dt_ms as f64 / 1000.0);
    }
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;
