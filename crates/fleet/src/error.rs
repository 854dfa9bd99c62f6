// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Muster Contributors

//! Fleet controller errors.

use muster_core::{ActionId, WorkerId, WorkerState};
use muster_store::StoreError;
use thiserror::Error;

/// Control-plane error taxonomy.
///
/// `Store` wraps the transient kind (retried before surfacing); everything
/// else is surfaced immediately and mirrored into the audit journal by the
/// controller.
#[derive(Debug, Error)]
pub enum FleetError {
    #[error("worker not found: {0}")]
    NotFound(WorkerId),

    #[error("illegal transition: {from} -> {to}")]
    IllegalTransition { from: WorkerState, to: WorkerState },

    #[error("safety violation ({rule}): {hint}")]
    SafetyViolation { rule: String, hint: String },

    #[error("no ack for action {action_id} within {timeout_ms}ms")]
    SignalTimeout { action_id: ActionId, timeout_ms: u64 },

    #[error("invalid config field {field}: {reason}")]
    ConfigInvalid { field: String, reason: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("internal error [{id}]: {message}")]
    Internal { id: String, message: String },
}

impl FleetError {
    /// Tag an unexpected condition with an opaque id for log correlation.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { id: opaque_id(), message: message.into() }
    }

    /// Machine-readable rule code for audit records.
    pub fn rule_code(&self) -> Option<&str> {
        match self {
            Self::SafetyViolation { rule, .. } => Some(rule),
            _ => None,
        }
    }
}

fn opaque_id() -> String {
    ActionId::new().suffix().to_string()
}
