//! Visibility extension for long-running jobs
//!
//! An estimator guesses how long a job will take from its file count and
//! aggregate size. When the guess is longer than the configured visibility
//! timeout, the message is hidden for longer so another worker does not pick
//! it up mid-run. No model ships; [`NoEstimate`] makes the stage a no-op.

use std::time::Duration;
use tracing::{debug, info, warn};

use crate::queue::JobQueue;

pub trait DurationEstimator: Send + Sync {
    fn estimate(&self, file_count: usize, aggregate_size: u64) -> Option<Duration>;
}

/// Never produces an estimate.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEstimate;

impl DurationEstimator for NoEstimate {
    fn estimate(&self, _file_count: usize, _aggregate_size: u64) -> Option<Duration> {
        None
    }
}

/// Extend the message's visibility if the estimate exceeds `current`.
///
/// Failures are logged and swallowed. Returns the timeout that was requested,
/// if any.
pub async fn extend_visibility(
    queue: &dyn JobQueue,
    estimator: &dyn DurationEstimator,
    receipt_handle: &str,
    file_count: usize,
    aggregate_size: u64,
    current: Duration,
) -> Option<Duration> {
    let Some(estimate) = estimator.estimate(file_count, aggregate_size) else {
        debug!("No duration estimate, keeping visibility timeout");
        return None;
    };

    if estimate <= current {
        debug!(estimate_secs = estimate.as_secs(), "Estimate within visibility timeout");
        return None;
    }

    match queue.change_visibility(receipt_handle, estimate).await {
        Ok(()) => {
            info!(timeout_secs = estimate.as_secs(), "Extended message visibility");
            Some(estimate)
        },
        Err(e) => {
            warn!("Failed to extend message visibility: {}", e);
            None
        },
    }
}
