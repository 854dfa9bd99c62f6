// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Muster Contributors

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! muster-radar: queue-health anomaly radar and SLO budget engine.
//!
//! Rolling-window metrics ingestion, error-budget accounting, threshold
//! anomaly detection, and the alert lifecycle, driven by a periodic
//! monitoring loop over an external metrics collector.

pub mod alerts;
pub mod anomaly;
pub mod budget;
pub mod collector;
pub mod config;
pub mod error;
pub mod monitor;
pub mod window;

pub use alerts::AlertManager;
pub use anomaly::{AnomalyDetector, AnomalyStatus, MetricStatus};
pub use budget::BudgetEngine;
pub use collector::MetricsCollector;
pub use config::{AnomalyThresholds, MetricThresholds, RadarConfig};
pub use error::RadarError;
pub use monitor::Radar;
pub use window::RollingWindow;
