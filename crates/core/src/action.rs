// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Muster Contributors

//! Operator control actions.

use crate::id::ActionId;
use crate::worker::WorkerId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What the operator asked the fleet to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlKind {
    Pause,
    Resume,
    Drain,
    Stop,
    RollingRestart,
}

crate::simple_display! {
    ControlKind {
        Pause => "pause",
        Resume => "resume",
        Drain => "drain",
        Stop => "stop",
        RollingRestart => "rolling-restart",
    }
}

/// Which workers a control action addresses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetSelector {
    /// One specific worker.
    Worker(WorkerId),
    /// An explicit set of workers.
    Workers(Vec<WorkerId>),
    /// Every worker matching all of these labels.
    Labels(BTreeMap<String, String>),
}

impl TargetSelector {
    /// Human-oriented description for audit records.
    pub fn describe(&self) -> String {
        match self {
            Self::Worker(id) => id.to_string(),
            Self::Workers(ids) => {
                let names: Vec<&str> = ids.iter().map(|w| w.as_str()).collect();
                names.join(",")
            }
            Self::Labels(labels) => labels
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join(","),
        }
    }
}

impl From<WorkerId> for TargetSelector {
    fn from(id: WorkerId) -> Self {
        Self::Worker(id)
    }
}

/// An operator-issued command.
///
/// Created per request, never mutated; its outcome lives in the audit journal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlAction {
    pub id: ActionId,
    pub kind: ControlKind,
    pub target: TargetSelector,
    pub reason: String,
    pub initiator: String,
    pub requested_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline_ms: Option<u64>,
    #[serde(default)]
    pub force: bool,
}

impl ControlAction {
    pub fn builder(kind: ControlKind, target: impl Into<TargetSelector>) -> ControlActionBuilder {
        ControlActionBuilder {
            kind,
            target: target.into(),
            reason: String::new(),
            initiator: "operator".to_string(),
            requested_at_ms: 0,
            deadline_ms: None,
            force: false,
        }
    }
}

/// Builder for [`ControlAction`]; `build` stamps a fresh [`ActionId`].
pub struct ControlActionBuilder {
    kind: ControlKind,
    target: TargetSelector,
    reason: String,
    initiator: String,
    requested_at_ms: u64,
    deadline_ms: Option<u64>,
    force: bool,
}

impl ControlActionBuilder {
    crate::setters! {
        into {
            reason: String,
            initiator: String,
        }
        set {
            requested_at_ms: u64,
            force: bool,
        }
        option {
            deadline_ms: u64,
        }
    }

    pub fn build(self) -> ControlAction {
        ControlAction {
            id: ActionId::new(),
            kind: self.kind,
            target: self.target,
            reason: self.reason,
            initiator: self.initiator,
            requested_at_ms: self.requested_at_ms,
            deadline_ms: self.deadline_ms,
            force: self.force,
        }
    }
}

#[cfg(test)]
#[path = "action_tests.rs"]
mod tests;
