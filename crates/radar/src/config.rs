// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Muster Contributors

//! Radar configuration and validation.

use crate::error::RadarError;
use muster_core::SloConfig;
use serde::{Deserialize, Serialize};

/// Warning/critical pair for one tracked metric.
///
/// Warning must be strictly below critical.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricThresholds {
    pub warning: f64,
    pub critical: f64,
}

impl MetricThresholds {
    fn validate(&self, field: &str) -> Result<(), RadarError> {
        if !self.warning.is_finite() || !self.critical.is_finite() {
            return Err(RadarError::invalid(field, "thresholds must be finite"));
        }
        if self.warning >= self.critical {
            return Err(RadarError::invalid(field, "warning must be below critical"));
        }
        Ok(())
    }
}

/// Thresholds for the three tracked metrics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyThresholds {
    pub error_rate: MetricThresholds,
    /// Items per second of backlog growth.
    pub backlog_growth: MetricThresholds,
    pub latency_p95_ms: MetricThresholds,
}

impl Default for AnomalyThresholds {
    fn default() -> Self {
        Self {
            error_rate: MetricThresholds { warning: 0.01, critical: 0.05 },
            backlog_growth: MetricThresholds { warning: 10.0, critical: 50.0 },
            latency_p95_ms: MetricThresholds { warning: 500.0, critical: 1000.0 },
        }
    }
}

/// Anomaly radar configuration, validated at ingress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadarConfig {
    pub monitoring_interval_ms: u64,
    /// Snapshots older than this fall out of the rolling window.
    pub metric_retention_ms: u64,
    pub max_snapshots: usize,
    /// Fraction of traffic the collector samples, in (0, 1]. Counts are
    /// used as-is in SLO math.
    pub sampling_rate: f64,
    pub slo: SloConfig,
    pub thresholds: AnomalyThresholds,
}

impl Default for RadarConfig {
    fn default() -> Self {
        Self {
            monitoring_interval_ms: 10_000,
            metric_retention_ms: 60 * 60 * 1000,
            max_snapshots: 1_000,
            sampling_rate: 1.0,
            slo: SloConfig::default(),
            thresholds: AnomalyThresholds::default(),
        }
    }
}

impl RadarConfig {
    pub fn validate(&self) -> Result<(), RadarError> {
        if self.monitoring_interval_ms == 0 {
            return Err(RadarError::invalid("monitoring_interval_ms", "must be positive"));
        }
        if self.metric_retention_ms == 0 {
            return Err(RadarError::invalid("metric_retention_ms", "must be positive"));
        }
        if self.max_snapshots == 0 {
            return Err(RadarError::invalid("max_snapshots", "must be at least 1"));
        }
        if !(self.sampling_rate > 0.0 && self.sampling_rate <= 1.0) {
            return Err(RadarError::invalid("sampling_rate", "must be in (0, 1]"));
        }
        if !(self.slo.availability_target > 0.0 && self.slo.availability_target < 1.0) {
            return Err(RadarError::invalid("slo.availability_target", "must be in (0, 1)"));
        }
        if !(self.slo.latency_percentile > 0.0 && self.slo.latency_percentile < 1.0) {
            return Err(RadarError::invalid("slo.latency_percentile", "must be in (0, 1)"));
        }
        if !(self.slo.latency_threshold_ms > 0.0) {
            return Err(RadarError::invalid("slo.latency_threshold_ms", "must be positive"));
        }
        if self.slo.window_ms == 0 {
            return Err(RadarError::invalid("slo.window_ms", "must be positive"));
        }
        // The alert ladder checks the fast threshold first, so it must sit
        // above the slow one.
        if !(self.slo.burn_rate_slow > 0.0 && self.slo.burn_rate_slow < self.slo.burn_rate_fast) {
            return Err(RadarError::invalid(
                "slo.burn_rate_thresholds",
                "slow must be positive and below fast",
            ));
        }
        self.thresholds.error_rate.validate("thresholds.error_rate")?;
        self.thresholds.backlog_growth.validate("thresholds.backlog_growth")?;
        self.thresholds.latency_p95_ms.validate("thresholds.latency_p95_ms")?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
