// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Muster Contributors

//! Built-in metrics collector placeholder.

use muster_core::MetricSnapshot;
use muster_radar::{MetricsCollector, RadarError};
use tokio_util::sync::CancellationToken;

/// Collector reporting an idle queue.
///
/// The real collector is owned by whichever queue system this control plane
/// fronts; deployments wire theirs into [`crate::Service`]. This one keeps
/// the radar loop alive (and the budget untouched, since zero requests skip
/// the SLO update) when nothing else is plugged in.
#[derive(Default)]
pub struct ZeroCollector;

#[async_trait::async_trait]
impl MetricsCollector for ZeroCollector {
    async fn collect(&self, _cancel: &CancellationToken) -> Result<MetricSnapshot, RadarError> {
        Ok(MetricSnapshot::default())
    }
}
