// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Muster Contributors

//! Immutable audit records.

use crate::action::ControlKind;
use crate::id::ActionId;
use crate::worker::WorkerState;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How a control action concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Accepted,
    Rejected,
    /// Signal dispatch timed out or only some targets confirmed.
    Partial,
}

crate::simple_display! {
    AuditOutcome {
        Accepted => "accepted",
        Rejected => "rejected",
        Partial => "partial",
    }
}

/// What a control-path decision gets audited as.
///
/// `kind` is a free string rather than [`ControlKind`] so system-originated
/// entries ("heartbeat-timeout", "remove") share the journal with operator
/// actions. Entries are immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub action_id: ActionId,
    /// Assigned by the journal on append; strictly increasing.
    #[serde(default)]
    pub seq: u64,
    pub timestamp_ms: u64,
    pub initiator: String,
    pub kind: String,
    /// Worker id or selector description the action addressed.
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_state: Option<WorkerState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_state: Option<WorkerState>,
    pub outcome: AuditOutcome,
    pub reason: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, String>,
}

impl AuditRecord {
    /// Start a record for an operator control action.
    pub fn for_action(
        action_id: ActionId,
        kind: ControlKind,
        initiator: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            action_id,
            seq: 0,
            timestamp_ms: 0,
            initiator: initiator.into(),
            kind: kind.to_string(),
            target: target.into(),
            pre_state: None,
            post_state: None,
            outcome: AuditOutcome::Accepted,
            reason: String::new(),
            details: BTreeMap::new(),
        }
    }

    /// Start a record for a system-originated transition.
    pub fn system(kind: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            action_id: ActionId::new(),
            seq: 0,
            timestamp_ms: 0,
            initiator: "system".to_string(),
            kind: kind.into(),
            target: target.into(),
            pre_state: None,
            post_state: None,
            outcome: AuditOutcome::Accepted,
            reason: String::new(),
            details: BTreeMap::new(),
        }
    }

    crate::setters! {
        into {
            reason: String,
        }
        set {
            outcome: AuditOutcome,
        }
        option {
            pre_state: WorkerState,
            post_state: WorkerState,
        }
    }

    pub fn detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

/// Journal query: every `Some` predicate must match.
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub from_ms: Option<u64>,
    pub to_ms: Option<u64>,
    pub initiator: Option<String>,
    pub kind: Option<String>,
}

impl AuditFilter {
    pub fn matches(&self, record: &AuditRecord) -> bool {
        if self.from_ms.is_some_and(|t| record.timestamp_ms < t) {
            return false;
        }
        if self.to_ms.is_some_and(|t| record.timestamp_ms > t) {
            return false;
        }
        if self.initiator.as_deref().is_some_and(|i| record.initiator != i) {
            return false;
        }
        if self.kind.as_deref().is_some_and(|k| record.kind != k) {
            return false;
        }
        true
    }
}

#[cfg(test)]
#[path = "audit_tests.rs"]
mod tests;
