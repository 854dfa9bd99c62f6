// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Muster Contributors

//! Logical key layout.
//!
//! Every key the control plane writes is built here, so the layout is
//! greppable in one place.

/// Set of currently-known worker ids.
pub const ACTIVE_WORKERS: &str = "workers:active";

/// Ordered audit journal (sorted set scored by sequence number).
pub const AUDIT_LOG: &str = "audit:log";

/// Scan pattern matching every worker record.
pub const WORKER_SCAN: &str = "worker:registry:*";

/// Record for one worker.
pub fn worker(id: &str) -> String {
    format!("worker:registry:{id}")
}

/// Per-worker control-signal channel.
pub fn signal_channel(id: &str) -> String {
    format!("signals:{id}")
}

/// Per-action reply channel.
pub fn reply_channel(action_id: &str) -> String {
    format!("signals:reply:{action_id}")
}
