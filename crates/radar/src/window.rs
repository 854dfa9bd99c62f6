// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Muster Contributors

//! Rolling metric window, bounded by both time and count.

use muster_core::MetricSnapshot;
use std::collections::VecDeque;

/// Time- and count-bounded sequence of snapshots, sorted by timestamp.
/// Duplicate timestamps are allowed and keep insertion order. Eviction is
/// always from the head (oldest first).
#[derive(Debug, Clone)]
pub struct RollingWindow {
    retention_ms: u64,
    max_snapshots: usize,
    snapshots: VecDeque<MetricSnapshot>,
}

impl RollingWindow {
    pub fn new(retention_ms: u64, max_snapshots: usize) -> Self {
        Self { retention_ms, max_snapshots, snapshots: VecDeque::new() }
    }

    /// Insert a snapshot, stamping a missing timestamp with `now_ms`, then
    /// trim expired and excess entries from the head.
    pub fn push(&mut self, mut snapshot: MetricSnapshot, now_ms: u64) {
        if snapshot.timestamp_ms == 0 {
            snapshot.timestamp_ms = now_ms;
        }
        // Keep ordering even for a late-arriving sample.
        let at = self
            .snapshots
            .partition_point(|s| s.timestamp_ms <= snapshot.timestamp_ms);
        self.snapshots.insert(at, snapshot);

        let cutoff = now_ms.saturating_sub(self.retention_ms);
        while self.snapshots.front().is_some_and(|s| s.timestamp_ms < cutoff) {
            self.snapshots.pop_front();
        }
        while self.snapshots.len() > self.max_snapshots {
            self.snapshots.pop_front();
        }
    }

    /// Snapshots strictly after `now_ms − window_ms`, oldest first.
    pub fn within(&self, window_ms: u64, now_ms: u64) -> Vec<&MetricSnapshot> {
        let cutoff = now_ms.saturating_sub(window_ms);
        self.snapshots.iter().filter(|s| s.timestamp_ms > cutoff).collect()
    }

    pub fn latest(&self) -> Option<&MetricSnapshot> {
        self.snapshots.back()
    }

    /// The snapshot just before the latest.
    pub fn previous(&self) -> Option<&MetricSnapshot> {
        let len = self.snapshots.len();
        if len < 2 {
            None
        } else {
            self.snapshots.get(len - 2)
        }
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetricSnapshot> {
        self.snapshots.iter()
    }

    /// Adopt new bounds (config update); trims immediately to the new count
    /// bound, time trimming happens on the next insert.
    pub fn reconfigure(&mut self, retention_ms: u64, max_snapshots: usize) {
        self.retention_ms = retention_ms;
        self.max_snapshots = max_snapshots;
        while self.snapshots.len() > self.max_snapshots {
            self.snapshots.pop_front();
        }
    }
}

#[cfg(test)]
#[path = "window_tests.rs"]
mod tests;
