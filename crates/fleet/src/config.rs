// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Muster Contributors

//! Controller configuration.

use crate::error::FleetError;
use serde::{Deserialize, Serialize};

/// Hard ceiling on list page size; requests above it are clamped.
pub const MAX_PAGE_SIZE: usize = 1000;

/// Tunables for the fleet controller, validated at ingress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// A worker silent longer than this is marked offline by the sweeper.
    pub heartbeat_timeout_ms: u64,
    /// How often the heartbeat sweeper runs.
    pub sweep_interval_ms: u64,
    /// How long a dispatched signal waits for its confirmation.
    pub signal_ack_timeout_ms: u64,
    /// Safety floor: workers that must remain running after any action.
    pub min_running: usize,
    /// Drain deadlines closer than this are rejected outright.
    pub min_drain_duration_ms: u64,
    /// When set, control actions refuse targets older than this version.
    pub require_version: Option<String>,
    /// Audit entries older than this are purged.
    pub audit_retention_ms: u64,
    /// Offline workers silent longer than this are removed entirely.
    pub offline_retention_ms: u64,
    pub default_page_size: usize,
    /// Store retry budget for transient outages.
    pub max_retries: u32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            heartbeat_timeout_ms: 90_000,
            sweep_interval_ms: 30_000,
            signal_ack_timeout_ms: 5_000,
            min_running: 1,
            min_drain_duration_ms: 10_000,
            require_version: None,
            audit_retention_ms: 30 * 24 * 60 * 60 * 1000,
            offline_retention_ms: 24 * 60 * 60 * 1000,
            default_page_size: 50,
            max_retries: 3,
        }
    }
}

impl ControllerConfig {
    pub fn validate(&self) -> Result<(), FleetError> {
        fn invalid(field: &str, reason: &str) -> FleetError {
            FleetError::ConfigInvalid { field: field.to_string(), reason: reason.to_string() }
        }

        if self.heartbeat_timeout_ms == 0 {
            return Err(invalid("heartbeat_timeout_ms", "must be positive"));
        }
        if self.sweep_interval_ms == 0 {
            return Err(invalid("sweep_interval_ms", "must be positive"));
        }
        if self.signal_ack_timeout_ms == 0 {
            return Err(invalid("signal_ack_timeout_ms", "must be positive"));
        }
        if self.audit_retention_ms == 0 {
            return Err(invalid("audit_retention_ms", "must be positive"));
        }
        if self.offline_retention_ms < self.heartbeat_timeout_ms {
            return Err(invalid(
                "offline_retention_ms",
                "must be at least heartbeat_timeout_ms",
            ));
        }
        if self.default_page_size == 0 || self.default_page_size > MAX_PAGE_SIZE {
            return Err(invalid(
                "default_page_size",
                "must be between 1 and the max page size",
            ));
        }
        if self.max_retries == 0 {
            return Err(invalid("max_retries", "must be at least 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
