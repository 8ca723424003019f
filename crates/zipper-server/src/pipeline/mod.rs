//! Job processing pipeline
//!
//! - **workspace**: per-job temporary directory with guaranteed removal
//! - **transfer**: sequential streamed download of source objects
//! - **archive**: external archiver invocation
//! - **upload**: archive measurement and upload
//! - **visibility**: optional visibility-timeout extension
//! - **stats**: per-job statistics
//! - **orchestrator**: the per-job state machine
//! - **poller**: the queue loop feeding the orchestrator

pub mod archive;
pub mod orchestrator;
pub mod poller;
pub mod stats;
pub mod transfer;
pub mod upload;
pub mod visibility;
pub mod workspace;

pub use archive::ArchiveCommand;
pub use orchestrator::{JobOutcome, JobReport, JobRunner, JobStage};
pub use poller::{BatchSummary, QueuePoller};
pub use stats::JobStats;
pub use visibility::{DurationEstimator, NoEstimate};
pub use workspace::{Workspace, WorkspaceManager};
