// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Muster Contributors

//! The store capability set.

use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

/// Store errors.
///
/// `Unavailable` is the transient kind: callers retry with backoff before
/// surfacing it.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("malformed record at {key}: {reason}")]
    Corrupt { key: String, reason: String },
}

/// One operation inside an atomic pipeline.
///
/// A pipeline either applies every op or none; the registry relies on this
/// to keep a worker record and the membership set from diverging.
#[derive(Debug, Clone)]
pub enum Op {
    Set { key: String, value: Value },
    Del { key: String },
    SetAdd { key: String, member: String },
    SetRemove { key: String, member: String },
    SortedAdd { key: String, score: u64, value: Value },
    SortedRemoveRange { key: String, min: u64, max: u64 },
}

/// Receiver half of a channel subscription.
pub type Subscription = mpsc::UnboundedReceiver<Value>;

/// Shared handle to a store implementation.
pub type SharedStore = Arc<dyn Store>;

/// Key/value + sorted-set + set + pub/sub capability set.
///
/// Sorted sets are score-ordered (u64 scores); `scan` supports only
/// `prefix:*` patterns, which is all the key layout needs.
#[async_trait::async_trait]
pub trait Store: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;
    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;

    /// Apply every op atomically, in order.
    async fn pipeline(&self, ops: Vec<Op>) -> Result<(), StoreError>;

    async fn sorted_add(&self, key: &str, score: u64, value: Value) -> Result<(), StoreError>;
    /// Members with `min <= score <= max`, ascending by score then insertion.
    async fn sorted_range(&self, key: &str, min: u64, max: u64) -> Result<Vec<Value>, StoreError>;
    async fn sorted_remove_range(&self, key: &str, min: u64, max: u64) -> Result<u64, StoreError>;

    async fn set_add(&self, key: &str, member: &str) -> Result<(), StoreError>;
    async fn set_remove(&self, key: &str, member: &str) -> Result<(), StoreError>;
    async fn set_members(&self, key: &str) -> Result<Vec<String>, StoreError>;

    /// Keys matching a `prefix:*` pattern.
    async fn scan(&self, pattern: &str) -> Result<Vec<String>, StoreError>;

    /// Deliver `payload` to every current subscriber of `channel`.
    async fn publish(&self, channel: &str, payload: Value) -> Result<(), StoreError>;
    /// Subscribe to a named channel; the subscription ends when dropped.
    fn subscribe(&self, channel: &str) -> Subscription;
}
