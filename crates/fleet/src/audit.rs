// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Muster Contributors

//! Append-only audit journal.
//!
//! The system of record for "who did what and when". Entries are keyed by a
//! monotonic sequence number; there is no update path.

use crate::error::FleetError;
use crate::retry;
use muster_core::{AuditFilter, AuditRecord, Clock};
use muster_store::{keys, SharedStore};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

pub struct AuditJournal<C: Clock> {
    store: SharedStore,
    clock: C,
    seq: AtomicU64,
    retention_ms: u64,
    max_retries: u32,
}

impl<C: Clock> AuditJournal<C> {
    pub fn new(store: SharedStore, clock: C, retention_ms: u64, max_retries: u32) -> Self {
        Self { store, clock, seq: AtomicU64::new(0), retention_ms, max_retries }
    }

    /// Append a record, assigning the next sequence number and stamping the
    /// timestamp when the caller didn't.
    ///
    /// Readers observe entries in append (accepted) order because the
    /// sequence is the sorted-set score.
    pub async fn append(&self, mut record: AuditRecord) -> Result<u64, FleetError> {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        record.seq = seq;
        if record.timestamp_ms == 0 {
            record.timestamp_ms = self.clock.epoch_ms();
        }
        let value = serde_json::to_value(&record)
            .map_err(|e| FleetError::internal(format!("encode audit record: {e}")))?;
        let store = &self.store;
        retry::with_retry(self.max_retries, || store.sorted_add(keys::AUDIT_LOG, seq, value.clone()))
            .await?;
        debug!(seq, kind = %record.kind, target = %record.target, outcome = %record.outcome, "audit");
        Ok(seq)
    }

    /// Entries matching the filter, in accepted order.
    pub async fn query(&self, filter: &AuditFilter) -> Result<Vec<AuditRecord>, FleetError> {
        let store = &self.store;
        let values =
            retry::with_retry(self.max_retries, || store.sorted_range(keys::AUDIT_LOG, 0, u64::MAX))
                .await?;
        let mut records = Vec::new();
        for value in values {
            let record: AuditRecord = serde_json::from_value(value)
                .map_err(|e| FleetError::internal(format!("decode audit record: {e}")))?;
            if filter.matches(&record) {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Drop entries older than the retention window.
    ///
    /// Sequence order equals time order for an append-only journal, so the
    /// expired prefix is a contiguous score range.
    pub async fn purge_expired(&self) -> Result<u64, FleetError> {
        let cutoff = self.clock.epoch_ms().saturating_sub(self.retention_ms);
        let all = self.query(&AuditFilter::default()).await?;
        let last_expired = all.iter().take_while(|r| r.timestamp_ms < cutoff).last().map(|r| r.seq);
        let Some(max_seq) = last_expired else {
            return Ok(0);
        };
        let store = &self.store;
        let removed = retry::with_retry(self.max_retries, || {
            store.sorted_remove_range(keys::AUDIT_LOG, 0, max_seq)
        })
        .await?;
        if removed > 0 {
            debug!(removed, cutoff, "purged expired audit entries");
        }
        Ok(removed)
    }
}

#[cfg(test)]
#[path = "audit_tests.rs"]
mod tests;
