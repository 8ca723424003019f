//! Queue polling loop
//!
//! Long-polls the queue, decodes each message into a [`JobDescriptor`] and
//! runs the batch with at most `concurrency` jobs in flight. Job failures
//! never stop the loop; only a workspace cleanup failure does.

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use zipper_common::types::JobDescriptor;

use super::orchestrator::{JobOutcome, JobRunner};
use crate::config::QueueConfig;
use crate::error::{CleanupError, JobError};
use crate::queue::{JobQueue, ReceiveRequest};

/// What one poll iteration did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub received: usize,
    pub malformed: usize,
    pub completed: usize,
    pub failed: usize,
    pub receive_failed: bool,
}

pub struct QueuePoller {
    queue: Arc<dyn JobQueue>,
    runner: Arc<JobRunner>,
    request: ReceiveRequest,
    concurrency: usize,
    error_backoff: Duration,
}

impl QueuePoller {
    pub fn new(
        queue: Arc<dyn JobQueue>,
        runner: Arc<JobRunner>,
        config: &QueueConfig,
        concurrency: usize,
    ) -> Self {
        Self {
            queue,
            runner,
            request: ReceiveRequest {
                max_messages: config.max_messages,
                wait_time_secs: config.wait_time_secs,
                visibility_timeout_secs: config.visibility_timeout_secs,
            },
            concurrency: concurrency.max(1),
            error_backoff: config.poll_error_backoff(),
        }
    }

    /// Run the loop on a background task.
    pub fn start(self) -> JoinHandle<Result<(), CleanupError>> {
        tokio::spawn(async move { self.run().await })
    }

    /// Poll until a cleanup failure occurs.
    pub async fn run(&self) -> Result<(), CleanupError> {
        info!(
            concurrency = self.concurrency,
            max_messages = self.request.max_messages,
            wait_time_secs = self.request.wait_time_secs,
            visibility_timeout_secs = self.request.visibility_timeout_secs,
            "Queue poller started"
        );

        loop {
            let summary = self.poll_once().await?;

            if summary.receive_failed {
                tokio::time::sleep(self.error_backoff).await;
            }
        }
    }

    /// Receive one batch and run every job in it.
    pub async fn poll_once(&self) -> Result<BatchSummary, CleanupError> {
        let mut summary = BatchSummary::default();

        let messages = match self.queue.receive(&self.request).await {
            Ok(messages) => messages,
            Err(e) => {
                warn!(
                    "Failed to receive messages, retrying in {}s: {}",
                    self.error_backoff.as_secs(),
                    e
                );
                summary.receive_failed = true;
                return Ok(summary);
            },
        };

        summary.received = messages.len();
        if messages.is_empty() {
            debug!("No messages received");
            return Ok(summary);
        }

        let mut jobs = Vec::with_capacity(messages.len());
        for message in messages {
            match JobDescriptor::from_message_body(&message.body, message.delivery()) {
                Ok(job) => jobs.push(job),
                Err(e) => {
                    let e = JobError::from(e);
                    error!(
                        message_id = %message.message_id,
                        receive_count = message.receive_count,
                        stage = e.stage(),
                        "Skipping malformed job, leaving message for dead-letter: {}",
                        e
                    );
                    summary.malformed += 1;
                },
            }
        }

        let results: Vec<Result<JobOutcome, CleanupError>> = stream::iter(jobs)
            .map(|job| {
                let runner = self.runner.clone();
                async move { runner.run(&job).await }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut cleanup_failure = None;
        for result in results {
            match result {
                Ok(JobOutcome::Completed(_)) => summary.completed += 1,
                Ok(JobOutcome::Failed(_)) => summary.failed += 1,
                Err(e) => {
                    summary.failed += 1;
                    cleanup_failure.get_or_insert(e);
                },
            }
        }

        info!(
            received = summary.received,
            completed = summary.completed,
            failed = summary.failed,
            malformed = summary.malformed,
            "Batch finished"
        );

        match cleanup_failure {
            Some(e) => Err(e),
            None => Ok(summary),
        }
    }
}
