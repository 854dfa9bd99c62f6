// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Muster Contributors

//! SLO error-budget accounting types.

use crate::alert::Severity;
use serde::{Deserialize, Serialize};

/// SLO parameters for the budget engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SloConfig {
    /// Target availability, exclusive (0, 1).
    pub availability_target: f64,
    /// Which latency percentile the threshold applies to, exclusive (0, 1).
    pub latency_percentile: f64,
    /// Latency threshold in milliseconds; snapshots whose p95 exceeds it
    /// count their whole request batch as violations.
    pub latency_threshold_ms: f64,
    /// Measurement window in milliseconds.
    pub window_ms: u64,
    /// Burn rate at or above which the budget alert is critical.
    pub burn_rate_fast: f64,
    /// Burn rate at or above which the budget alert is warning.
    pub burn_rate_slow: f64,
}

impl Default for SloConfig {
    fn default() -> Self {
        Self {
            availability_target: 0.99,
            latency_percentile: 0.95,
            latency_threshold_ms: 1000.0,
            window_ms: 60 * 60 * 1000,
            burn_rate_fast: 14.4,
            burn_rate_slow: 6.0,
        }
    }
}

/// Error-budget state for one evaluation tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SloBudget {
    /// requests · (1 − target) over the window.
    pub total: f64,
    /// errors + latency violations over the window.
    pub consumed: f64,
    /// max(0, total − consumed).
    pub remaining: f64,
    /// consumed / total, clamped to [0, 1].
    pub utilization: f64,
    /// Budget consumption rate over the trailing hour.
    pub burn_rate: f64,
    /// remaining / burn_rate; 0 when nothing is burning.
    pub time_to_exhaustion: f64,
    pub is_healthy: bool,
    /// Alert level derived from burn rate and utilization.
    pub alert_level: Severity,
    pub computed_at_ms: u64,
}

impl SloBudget {
    /// Derive the alert ladder from burn rate and utilization.
    pub fn derive_alert_level(burn_rate: f64, utilization: f64, config: &SloConfig) -> Severity {
        if burn_rate >= config.burn_rate_fast || utilization >= 0.9 {
            Severity::Critical
        } else if burn_rate >= config.burn_rate_slow || utilization >= 0.75 {
            Severity::Warning
        } else if utilization >= 0.5 {
            Severity::Info
        } else {
            Severity::None
        }
    }
}

#[cfg(test)]
#[path = "slo_tests.rs"]
mod tests;
