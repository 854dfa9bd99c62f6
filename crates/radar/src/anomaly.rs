// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Muster Contributors

//! Threshold-based anomaly detection over the latest snapshot.

use crate::config::{AnomalyThresholds, MetricThresholds};
use indexmap::IndexMap;
use muster_core::{AlertKind, MetricSnapshot, Severity};
use serde::{Deserialize, Serialize};

/// Classification of one tracked metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricStatus {
    pub kind: AlertKind,
    pub value: f64,
    pub severity: Severity,
    /// The threshold the value breached (warning or critical), or the
    /// warning threshold when healthy.
    pub threshold: f64,
}

/// Overall anomaly picture for one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AnomalyStatus {
    /// Worst of the per-metric severities OR-ed with the budget level.
    pub overall: Severity,
    /// Keyed by semantic metric id, in evaluation order.
    pub metrics: IndexMap<String, MetricStatus>,
    pub computed_at_ms: u64,
}

pub struct AnomalyDetector {
    thresholds: AnomalyThresholds,
}

impl AnomalyDetector {
    pub fn new(thresholds: AnomalyThresholds) -> Self {
        Self { thresholds }
    }

    pub fn set_thresholds(&mut self, thresholds: AnomalyThresholds) {
        self.thresholds = thresholds;
    }

    /// Classify the latest snapshot; `budget_level` folds into the overall
    /// status (critical dominates warning dominates info dominates healthy).
    pub fn evaluate(
        &self,
        latest: &MetricSnapshot,
        budget_level: Severity,
        now_ms: u64,
    ) -> AnomalyStatus {
        let mut metrics = IndexMap::new();
        let mut overall = budget_level;

        let entries = [
            (AlertKind::ErrorRate, latest.error_rate, self.thresholds.error_rate),
            (AlertKind::BacklogGrowth, latest.backlog_growth, self.thresholds.backlog_growth),
            (AlertKind::LatencyP95, latest.p95_ms, self.thresholds.latency_p95_ms),
        ];
        for (kind, value, thresholds) in entries {
            let status = classify(kind, value, thresholds);
            overall = overall.max(status.severity);
            metrics.insert(kind.id().to_string(), status);
        }

        AnomalyStatus { overall, metrics, computed_at_ms: now_ms }
    }
}

fn classify(kind: AlertKind, value: f64, thresholds: MetricThresholds) -> MetricStatus {
    let (severity, threshold) = if value >= thresholds.critical {
        (Severity::Critical, thresholds.critical)
    } else if value >= thresholds.warning {
        (Severity::Warning, thresholds.warning)
    } else {
        (Severity::None, thresholds.warning)
    };
    MetricStatus { kind, value, severity, threshold }
}

#[cfg(test)]
#[path = "anomaly_tests.rs"]
mod tests;
