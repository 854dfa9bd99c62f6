// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Muster Contributors

//! External metrics source seam.

use crate::error::RadarError;
use muster_core::MetricSnapshot;
use tokio_util::sync::CancellationToken;

/// Caller-defined metrics source.
///
/// The monitoring loop calls this once per interval; a `CollectionFailed`
/// is logged and the cycle skipped. Implementations should honor the
/// cancellation token for any I/O they do.
#[async_trait::async_trait]
pub trait MetricsCollector: Send + Sync {
    async fn collect(&self, cancel: &CancellationToken) -> Result<MetricSnapshot, RadarError>;
}
