// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Muster Contributors

//! Alert types and severity ordering.

use serde::{Deserialize, Serialize};

/// Severity ladder; `Ord` so "worst wins" is `max()`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[default]
    None,
    Info,
    Warning,
    Critical,
}

crate::simple_display! {
    Severity {
        None => "none",
        Info => "info",
        Warning => "warning",
        Critical => "critical",
    }
}

/// What kind of condition an alert describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    ErrorRate,
    BacklogGrowth,
    LatencyP95,
    BurnRate,
}

crate::simple_display! {
    AlertKind {
        ErrorRate => "error_rate",
        BacklogGrowth => "backlog_growth",
        LatencyP95 => "latency_p95",
        BurnRate => "burn_rate",
    }
}

impl AlertKind {
    /// The semantic alert id used for cross-cycle dedup.
    pub fn id(self) -> &'static str {
        match self {
            Self::ErrorRate => "error_rate",
            Self::BacklogGrowth => "backlog_growth",
            Self::LatencyP95 => "latency_p95",
            Self::BurnRate => "burn_rate",
        }
    }
}

/// One active alert.
///
/// The id is semantic ("error_rate"), so the same condition raised across
/// consecutive cycles is one alert whose `updated_at_ms` advances while
/// `created_at_ms` is preserved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub kind: AlertKind,
    pub severity: Severity,
    pub message: String,
    pub value: f64,
    pub threshold: f64,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
}

/// What alert callbacks receive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AlertNotification {
    /// Raised for the first time, or its severity changed.
    Raised(Alert),
    /// No longer present in the current cycle.
    Resolved(Alert),
}

impl AlertNotification {
    pub fn alert(&self) -> &Alert {
        match self {
            Self::Raised(a) | Self::Resolved(a) => a,
        }
    }
}

#[cfg(test)]
#[path = "alert_tests.rs"]
mod tests;
