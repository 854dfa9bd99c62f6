// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Muster Contributors

//! Retry-with-backoff for transient store outages.

use muster_store::StoreError;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

const BASE_DELAY: Duration = Duration::from_millis(100);
const MAX_DELAY: Duration = Duration::from_secs(30);

/// Run `op` until it succeeds or a non-transient error appears, retrying
/// `Unavailable` up to `max_retries` extra attempts with exponential delay.
pub(crate) async fn with_retry<T, F, Fut>(max_retries: u32, mut op: F) -> Result<T, StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let mut attempt: u32 = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(StoreError::Unavailable(reason)) if attempt < max_retries => {
                let delay = backoff(attempt);
                warn!(attempt, delay_ms = delay.as_millis() as u64, %reason, "store unavailable, retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

fn backoff(attempt: u32) -> Duration {
    let exp = BASE_DELAY.saturating_mul(2u32.saturating_pow(attempt));
    exp.min(MAX_DELAY)
}
