//! Job orchestrator
//!
//! Runs one job through its stages, in order:
//!
//! ```text
//! ValidateReceiveCount -> FetchHeaders -> ExtendVisibility -> PrepareWorkspace
//!   -> DownloadAll -> Archive -> MeasureArchive -> Upload -> Notify
//!   -> AcknowledgeDelete -> Cleanup
//! ```
//!
//! The first failing stage ends the job and the message stays on the queue.
//! Cleanup runs on every path. A cleanup failure is returned as `Err` and is
//! fatal to the worker; job failures come back as [`JobOutcome::Failed`].

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, info_span, Instrument};
use zipper_common::types::JobDescriptor;

use super::archive::ArchiveCommand;
use super::stats::JobStats;
use super::transfer::download_all;
use super::upload::{measure_archive, upload_archive};
use super::visibility::{extend_visibility, DurationEstimator, NoEstimate};
use super::workspace::{Workspace, WorkspaceManager};
use crate::error::{CleanupError, JobError};
use crate::notify::{DispatchReport, NotificationContext, NotifierRegistry};
use crate::queue::{JobQueue, QueueAttributes};
use crate::storage::{ObjectStore, ObjectStoreFactory};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStage {
    ValidateReceiveCount,
    FetchHeaders,
    ExtendVisibility,
    PrepareWorkspace,
    DownloadAll,
    Archive,
    MeasureArchive,
    Upload,
    Notify,
    AcknowledgeDelete,
    Cleanup,
}

impl JobStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStage::ValidateReceiveCount => "validate_receive_count",
            JobStage::FetchHeaders => "fetch_headers",
            JobStage::ExtendVisibility => "extend_visibility",
            JobStage::PrepareWorkspace => "prepare_workspace",
            JobStage::DownloadAll => "download_all",
            JobStage::Archive => "archive",
            JobStage::MeasureArchive => "measure_archive",
            JobStage::Upload => "upload",
            JobStage::Notify => "notify",
            JobStage::AcknowledgeDelete => "acknowledge_delete",
            JobStage::Cleanup => "cleanup",
        }
    }
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary of a completed job.
#[derive(Debug)]
pub struct JobReport {
    pub location: String,
    pub stats: JobStats,
    pub notifications: DispatchReport,
}

#[derive(Debug)]
pub enum JobOutcome {
    Completed(JobReport),
    Failed(JobError),
}

impl JobOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, JobOutcome::Completed(_))
    }
}

/// Runs jobs against shared, read-only collaborators.
pub struct JobRunner {
    queue: Arc<dyn JobQueue>,
    stores: Arc<dyn ObjectStoreFactory>,
    workspaces: WorkspaceManager,
    archiver: ArchiveCommand,
    notifiers: NotifierRegistry,
    limits: QueueAttributes,
    estimator: Arc<dyn DurationEstimator>,
    visibility_timeout: Duration,
}

impl JobRunner {
    pub fn new(
        queue: Arc<dyn JobQueue>,
        stores: Arc<dyn ObjectStoreFactory>,
        workspaces: WorkspaceManager,
        archiver: ArchiveCommand,
        notifiers: NotifierRegistry,
        limits: QueueAttributes,
    ) -> Self {
        Self {
            queue,
            stores,
            workspaces,
            archiver,
            notifiers,
            limits,
            estimator: Arc::new(NoEstimate),
            visibility_timeout: Duration::from_secs(
                crate::config::DEFAULT_VISIBILITY_TIMEOUT_SECS as u64,
            ),
        }
    }

    pub fn with_estimator(mut self, estimator: Arc<dyn DurationEstimator>) -> Self {
        self.estimator = estimator;
        self
    }

    /// Visibility timeout the messages were received with.
    pub fn with_visibility_timeout(mut self, timeout: Duration) -> Self {
        self.visibility_timeout = timeout;
        self
    }

    pub async fn run(&self, job: &JobDescriptor) -> Result<JobOutcome, CleanupError> {
        let span = info_span!("job", job_id = %job.id, receive_count = job.receive_count);

        async move {
            info!(
                files = job.files.len(),
                destination = %job.destination.object,
                "Starting job"
            );

            let mut stats = JobStats::new();
            let mut workspace = None;

            let result = self.execute(job, &mut stats, &mut workspace).await;

            enter(JobStage::Cleanup);
            if let Some(workspace) = workspace.take() {
                if let Err(e) = workspace.release() {
                    if let Err(job_error) = &result {
                        error!(stage = job_error.stage(), "Job failed: {}", job_error);
                    }
                    error!("Workspace cleanup failed: {}", e);
                    return Err(e);
                }
            }

            stats.complete();

            match result {
                Ok((location, notifications)) => {
                    info!(
                        location = %location,
                        files = stats.files,
                        aggregate_size = stats.aggregate_size,
                        archive_size = stats.archive_size,
                        duration_secs = stats.duration_secs,
                        mb_per_sec = %format!("{:.2}", stats.megabytes_per_second()),
                        "Job completed"
                    );
                    Ok(JobOutcome::Completed(JobReport {
                        location,
                        stats,
                        notifications,
                    }))
                },
                Err(e) => {
                    error!(
                        stage = e.stage(),
                        duration_secs = stats.duration_secs,
                        "Job failed, message left for redelivery: {}",
                        e
                    );
                    Ok(JobOutcome::Failed(e))
                },
            }
        }
        .instrument(span)
        .await
    }

    async fn execute(
        &self,
        job: &JobDescriptor,
        stats: &mut JobStats,
        slot: &mut Option<Workspace>,
    ) -> Result<(String, DispatchReport), JobError> {
        enter(JobStage::ValidateReceiveCount);
        self.validate_receive_count(job)?;

        let store = self.stores.connect(&job.credentials);

        enter(JobStage::FetchHeaders);
        let aggregate_size = fetch_headers(store.as_ref(), job).await?;
        job.artifacts.set_aggregate_size(aggregate_size);
        stats.files = job.files.len();
        stats.aggregate_size = aggregate_size;

        enter(JobStage::ExtendVisibility);
        extend_visibility(
            self.queue.as_ref(),
            self.estimator.as_ref(),
            &job.delete_token,
            job.files.len(),
            aggregate_size,
            self.visibility_timeout,
        )
        .await;

        enter(JobStage::PrepareWorkspace);
        let workspace = slot.insert(self.workspaces.acquire(&job.id).map_err(JobError::Workspace)?);
        let files_dir = workspace.files_dir();
        let archive_path = workspace.archive_path(job.archive_name());

        enter(JobStage::DownloadAll);
        let transfer = download_all(store.as_ref(), &job.files, &files_dir).await?;
        stats.bytes_downloaded = transfer.bytes;

        enter(JobStage::Archive);
        self.archiver.run(&files_dir, &archive_path).await?;
        job.artifacts.set_archive_path(archive_path.clone());

        enter(JobStage::MeasureArchive);
        let archive_size = measure_archive(&archive_path).await?;
        job.artifacts.set_archive_size(archive_size);
        stats.archive_size = archive_size;
        if let Some(ratio) = stats.compression_ratio() {
            info!(
                archive_size,
                aggregate_size,
                ratio = %format!("{:.3}", ratio),
                "Archive measured"
            );
        }

        enter(JobStage::Upload);
        let location = upload_archive(store.as_ref(), &job.destination, &archive_path, archive_size).await?;
        job.artifacts.set_location(location.clone());

        enter(JobStage::Notify);
        let context = NotificationContext::success(&job.id, &location, archive_size);
        let notifications = self.notifiers.dispatch(&job.notifications, &context).await;
        stats.notifications_sent = notifications.delivered;

        enter(JobStage::AcknowledgeDelete);
        self.queue
            .delete(&job.delete_token)
            .await
            .map_err(JobError::Acknowledge)?;

        Ok((location, notifications))
    }

    fn validate_receive_count(&self, job: &JobDescriptor) -> Result<(), JobError> {
        match self.limits.max_receive_count {
            Some(ceiling) if job.receive_count > ceiling => Err(JobError::RetryCeilingExceeded {
                receive_count: job.receive_count,
                ceiling,
            }),
            _ => Ok(()),
        }
    }
}

fn enter(stage: JobStage) {
    debug!(stage = %stage, "Entering stage");
}

/// Content lengths of every file, one request at a time.
async fn fetch_headers(store: &dyn ObjectStore, job: &JobDescriptor) -> Result<u64, JobError> {
    let mut total = 0u64;

    for object in &job.files {
        let metadata = store
            .head(object)
            .await
            .map_err(|source| JobError::HeaderFetch {
                object: object.to_string(),
                source,
            })?;
        debug!(object = %object, size = metadata.size, "Fetched header");
        total += metadata.size;
    }

    Ok(total)
}
