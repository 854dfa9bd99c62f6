// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Muster Contributors

//! Control signal dispatch over the store's pub/sub.

use muster_core::{ActionId, ControlKind, WorkerId};
use muster_store::{keys, SharedStore, StoreError, Subscription};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Envelope published on a worker's signal channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalEnvelope {
    pub action: ControlKind,
    pub action_id: ActionId,
    pub worker_id: WorkerId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline_ms: Option<u64>,
}

/// Confirmation published by the worker on the reply channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalReply {
    pub action_id: ActionId,
    pub status: ReplyStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyStatus {
    Acked,
    Rejected,
}

/// How a dispatch concluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalOutcome {
    Acked,
    Rejected { detail: Option<String> },
    Timeout,
}

impl std::fmt::Display for SignalOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Acked => "acked",
            Self::Rejected { .. } => "rejected",
            Self::Timeout => "timeout",
        })
    }
}

/// Transport seam: the backing store's pub/sub suffices, but tests and
/// alternative fabrics plug in here.
#[async_trait::async_trait]
pub trait SignalTransport: Send + Sync {
    async fn publish(&self, channel: &str, payload: Value) -> Result<(), StoreError>;
    fn subscribe(&self, channel: &str) -> Subscription;
}

/// Pub/sub transport over the backing store.
pub struct StoreSignalTransport {
    store: SharedStore,
}

impl StoreSignalTransport {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl SignalTransport for StoreSignalTransport {
    async fn publish(&self, channel: &str, payload: Value) -> Result<(), StoreError> {
        self.store.publish(channel, payload).await
    }

    fn subscribe(&self, channel: &str) -> Subscription {
        self.store.subscribe(channel)
    }
}

/// Publishes control envelopes and waits (bounded) for confirmations.
///
/// Holds no registry locks: a dispatch may block for the full ack timeout.
pub struct SignalDispatcher {
    transport: Arc<dyn SignalTransport>,
    ack_timeout: Duration,
}

impl SignalDispatcher {
    pub fn new(transport: Arc<dyn SignalTransport>, ack_timeout: Duration) -> Self {
        Self { transport, ack_timeout }
    }

    pub fn ack_timeout_ms(&self) -> u64 {
        self.ack_timeout.as_millis() as u64
    }

    /// Deliver one envelope and await its confirmation.
    ///
    /// The reply channel is subscribed before publishing so a fast worker
    /// cannot ack into the void.
    pub async fn dispatch(&self, envelope: &SignalEnvelope) -> Result<SignalOutcome, StoreError> {
        let reply_channel = keys::reply_channel(envelope.action_id.as_str());
        let mut replies = self.transport.subscribe(&reply_channel);

        let payload = serde_json::to_value(envelope).map_err(|e| StoreError::Corrupt {
            key: keys::signal_channel(envelope.worker_id.as_str()),
            reason: e.to_string(),
        })?;
        let channel = keys::signal_channel(envelope.worker_id.as_str());
        self.transport.publish(&channel, payload).await?;
        debug!(
            worker_id = %envelope.worker_id,
            action = %envelope.action,
            action_id = %envelope.action_id,
            "signal published"
        );

        match tokio::time::timeout(self.ack_timeout, recv_reply(&mut replies, &envelope.action_id))
            .await
        {
            Ok(Some(reply)) => match reply.status {
                ReplyStatus::Acked => Ok(SignalOutcome::Acked),
                ReplyStatus::Rejected => Ok(SignalOutcome::Rejected { detail: reply.detail }),
            },
            // Channel closed or nothing parseable arrived in time.
            Ok(None) | Err(_) => {
                warn!(
                    worker_id = %envelope.worker_id,
                    action_id = %envelope.action_id,
                    timeout_ms = self.ack_timeout_ms(),
                    "signal ack timeout"
                );
                Ok(SignalOutcome::Timeout)
            }
        }
    }

    /// Broadcast to a pre-computed target set, in order.
    ///
    /// No server-side wildcards: each worker gets its own envelope on its
    /// own channel.
    pub async fn broadcast(
        &self,
        envelopes: &[SignalEnvelope],
    ) -> Result<Vec<(WorkerId, SignalOutcome)>, StoreError> {
        let mut outcomes = Vec::with_capacity(envelopes.len());
        for envelope in envelopes {
            let outcome = self.dispatch(envelope).await?;
            outcomes.push((envelope.worker_id.clone(), outcome));
        }
        Ok(outcomes)
    }
}

/// Drain the subscription until a reply for this action appears.
async fn recv_reply(replies: &mut Subscription, action_id: &ActionId) -> Option<SignalReply> {
    while let Some(value) = replies.recv().await {
        match serde_json::from_value::<SignalReply>(value) {
            Ok(reply) if reply.action_id == *action_id => return Some(reply),
            Ok(_) => continue,
            Err(err) => {
                warn!(%err, "malformed signal reply ignored");
                continue;
            }
        }
    }
    None
}

#[cfg(test)]
#[path = "signal_tests.rs"]
mod tests;
