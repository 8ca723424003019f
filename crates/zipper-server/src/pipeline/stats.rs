use chrono::{DateTime, Utc};
use serde::Serialize;

/// Statistics for one job run
#[derive(Debug, Clone, Default, Serialize)]
pub struct JobStats {
    /// Files in the job
    pub files: usize,
    /// Sum of the source objects' content lengths
    pub aggregate_size: u64,
    /// Bytes actually written to the workspace
    pub bytes_downloaded: u64,
    /// Size of the produced archive
    pub archive_size: u64,
    /// Notifications delivered successfully
    pub notifications_sent: usize,
    /// Duration in seconds
    pub duration_secs: f64,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl JobStats {
    pub fn new() -> Self {
        Self {
            started_at: Some(Utc::now()),
            ..Default::default()
        }
    }

    /// Mark stats as completed
    pub fn complete(&mut self) {
        self.completed_at = Some(Utc::now());
        if let (Some(start), Some(end)) = (self.started_at, self.completed_at) {
            self.duration_secs = (end - start).num_milliseconds() as f64 / 1000.0;
        }
    }

    /// Archive size over aggregate source size; `None` when nothing was read.
    pub fn compression_ratio(&self) -> Option<f64> {
        if self.aggregate_size == 0 {
            None
        } else {
            Some(self.archive_size as f64 / self.aggregate_size as f64)
        }
    }

    pub fn megabytes_per_second(&self) -> f64 {
        if self.duration_secs > 0.0 {
            (self.bytes_downloaded as f64 / 1_000_000.0) / self.duration_secs
        } else {
            0.0
        }
    }
}
