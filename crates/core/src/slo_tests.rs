// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Muster Contributors

use super::*;

#[yare::parameterized(
    quiet          = { 0.0, 0.0, Severity::None },
    info_at_half   = { 0.0, 0.5, Severity::Info },
    warn_util      = { 0.0, 0.75, Severity::Warning },
    warn_slow_burn = { 6.0, 0.0, Severity::Warning },
    crit_util      = { 0.0, 0.9, Severity::Critical },
    crit_fast_burn = { 14.4, 0.0, Severity::Critical },
    crit_dominates = { 20.0, 0.95, Severity::Critical },
)]
fn alert_ladder(burn_rate: f64, utilization: f64, expected: Severity) {
    let config = SloConfig::default();
    assert_eq!(SloBudget::derive_alert_level(burn_rate, utilization, &config), expected);
}

#[test]
fn default_config_is_coherent() {
    let config = SloConfig::default();
    assert!(config.availability_target > 0.0 && config.availability_target < 1.0);
    assert!(config.burn_rate_slow < config.burn_rate_fast);
    assert!(config.latency_threshold_ms > 0.0);
}

#[test]
fn budget_default_is_empty() {
    let budget = SloBudget::default();
    assert_eq!(budget.total, 0.0);
    assert_eq!(budget.alert_level, Severity::None);
    assert!(!budget.is_healthy);
}
