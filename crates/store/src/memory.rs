// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Muster Contributors

//! In-memory store backend.

use crate::store::{Op, Store, StoreError, Subscription};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;

#[derive(Default)]
struct Inner {
    kv: HashMap<String, Value>,
    sets: HashMap<String, BTreeSet<String>>,
    // Sorted ascending by score; equal scores keep insertion order.
    sorted: HashMap<String, Vec<(u64, Value)>>,
    channels: HashMap<String, Vec<mpsc::UnboundedSender<Value>>>,
}

impl Inner {
    fn apply(&mut self, op: Op) {
        match op {
            Op::Set { key, value } => {
                self.kv.insert(key, value);
            }
            Op::Del { key } => {
                self.kv.remove(&key);
            }
            Op::SetAdd { key, member } => {
                self.sets.entry(key).or_default().insert(member);
            }
            Op::SetRemove { key, member } => {
                if let Some(set) = self.sets.get_mut(&key) {
                    set.remove(&member);
                }
            }
            Op::SortedAdd { key, score, value } => {
                let entries = self.sorted.entry(key).or_default();
                let at = entries.partition_point(|(s, _)| *s <= score);
                entries.insert(at, (score, value));
            }
            Op::SortedRemoveRange { key, min, max } => {
                if let Some(entries) = self.sorted.get_mut(&key) {
                    entries.retain(|(s, _)| *s < min || *s > max);
                }
            }
        }
    }
}

/// Single-process store; one mutex over all maps makes pipelines atomic
/// without any further coordination.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::Relaxed) {
            return Err(StoreError::Unavailable("injected outage".to_string()));
        }
        Ok(())
    }
}

#[cfg(any(test, feature = "test-support"))]
impl MemoryStore {
    /// Make every subsequent operation fail with `Unavailable` (or recover).
    pub fn set_unavailable(&self, down: bool) {
        self.unavailable.store(down, Ordering::Relaxed);
    }
}

#[async_trait::async_trait]
impl Store for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        self.check_available()?;
        Ok(self.inner.lock().kv.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.check_available()?;
        self.inner.lock().kv.insert(key.to_string(), value);
        Ok(())
    }

    async fn pipeline(&self, ops: Vec<Op>) -> Result<(), StoreError> {
        self.check_available()?;
        let mut inner = self.inner.lock();
        for op in ops {
            inner.apply(op);
        }
        Ok(())
    }

    async fn sorted_add(&self, key: &str, score: u64, value: Value) -> Result<(), StoreError> {
        self.check_available()?;
        self.inner.lock().apply(Op::SortedAdd { key: key.to_string(), score, value });
        Ok(())
    }

    async fn sorted_range(&self, key: &str, min: u64, max: u64) -> Result<Vec<Value>, StoreError> {
        self.check_available()?;
        let inner = self.inner.lock();
        let Some(entries) = inner.sorted.get(key) else {
            return Ok(Vec::new());
        };
        Ok(entries
            .iter()
            .filter(|(s, _)| *s >= min && *s <= max)
            .map(|(_, v)| v.clone())
            .collect())
    }

    async fn sorted_remove_range(&self, key: &str, min: u64, max: u64) -> Result<u64, StoreError> {
        self.check_available()?;
        let mut inner = self.inner.lock();
        let Some(entries) = inner.sorted.get_mut(key) else {
            return Ok(0);
        };
        let before = entries.len();
        entries.retain(|(s, _)| *s < min || *s > max);
        Ok((before - entries.len()) as u64)
    }

    async fn set_add(&self, key: &str, member: &str) -> Result<(), StoreError> {
        self.check_available()?;
        self.inner.lock().sets.entry(key.to_string()).or_default().insert(member.to_string());
        Ok(())
    }

    async fn set_remove(&self, key: &str, member: &str) -> Result<(), StoreError> {
        self.check_available()?;
        if let Some(set) = self.inner.lock().sets.get_mut(key) {
            set.remove(member);
        }
        Ok(())
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>, StoreError> {
        self.check_available()?;
        Ok(self
            .inner
            .lock()
            .sets
            .get(key)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn scan(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        self.check_available()?;
        let prefix = pattern.trim_end_matches('*');
        let mut keys: Vec<String> = self
            .inner
            .lock()
            .kv
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn publish(&self, channel: &str, payload: Value) -> Result<(), StoreError> {
        self.check_available()?;
        let mut inner = self.inner.lock();
        if let Some(subscribers) = inner.channels.get_mut(channel) {
            // Send to everyone still listening; prune closed receivers.
            subscribers.retain(|tx| tx.send(payload.clone()).is_ok());
        }
        Ok(())
    }

    fn subscribe(&self, channel: &str) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.lock().channels.entry(channel.to_string()).or_default().push(tx);
        rx
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
