// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Muster Contributors

//! Radar errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RadarError {
    /// The external collector failed; the monitoring loop logs this and
    /// skips the cycle without touching state.
    #[error("metrics collection failed: {0}")]
    CollectionFailed(String),

    #[error("invalid config field {field}: {reason}")]
    ConfigInvalid { field: String, reason: String },
}

impl RadarError {
    pub fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::ConfigInvalid { field: field.to_string(), reason: reason.into() }
    }
}
