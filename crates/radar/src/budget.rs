// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Muster Contributors

//! SLO error-budget engine.

use crate::window::RollingWindow;
use muster_core::{MetricSnapshot, SloBudget, SloConfig};

/// Burn rate is always measured over the trailing hour, independent of the
/// SLO window.
const BURN_WINDOW_MS: u64 = 60 * 60 * 1000;

pub struct BudgetEngine {
    config: SloConfig,
}

impl BudgetEngine {
    pub fn new(config: SloConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SloConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: SloConfig) {
        self.config = config;
    }

    /// Evaluate the budget over the SLO window.
    ///
    /// Returns `None` when the window carries no requests; utilization is
    /// undefined then and the previous budget stands.
    pub fn evaluate(&self, window: &RollingWindow, now_ms: u64) -> Option<SloBudget> {
        let in_window = window.within(self.config.window_ms, now_ms);
        let total_requests: u64 = in_window.iter().map(|s| s.request_count).sum();
        if total_requests == 0 {
            return None;
        }
        let total_errors: u64 = in_window.iter().map(|s| s.error_count).sum();
        let latency_violations: u64 = in_window
            .iter()
            .filter(|s| s.p95_ms > self.config.latency_threshold_ms)
            .map(|s| s.request_count)
            .sum();

        let total = total_requests as f64 * (1.0 - self.config.availability_target);
        let consumed = (total_errors + latency_violations) as f64;
        let remaining = (total - consumed).max(0.0);
        let utilization = (consumed / total).clamp(0.0, 1.0);

        let burn_rate = self.burn_rate(window, now_ms);
        let time_to_exhaustion = if burn_rate > 0.0 { remaining / burn_rate } else { 0.0 };

        Some(SloBudget {
            total,
            consumed,
            remaining,
            utilization,
            burn_rate,
            time_to_exhaustion,
            is_healthy: utilization < 1.0,
            alert_level: SloBudget::derive_alert_level(burn_rate, utilization, &self.config),
            computed_at_ms: now_ms,
        })
    }

    /// Trailing-hour burn rate:
    /// `(errorRate · requests) / (requests · (1 − target))`.
    fn burn_rate(&self, window: &RollingWindow, now_ms: u64) -> f64 {
        let hour: Vec<&MetricSnapshot> = window.within(BURN_WINDOW_MS, now_ms);
        let requests: u64 = hour.iter().map(|s| s.request_count).sum();
        if requests == 0 {
            return 0.0;
        }
        let errors: u64 = hour.iter().map(|s| s.error_count).sum();
        let error_rate = errors as f64 / requests as f64;
        let expected = requests as f64 * (1.0 - self.config.availability_target);
        if expected <= 0.0 {
            return 0.0;
        }
        (error_rate * requests as f64) / expected
    }
}

#[cfg(test)]
#[path = "budget_tests.rs"]
mod tests;
