//! Zipper Server Library
//!
//! Queue-driven archive worker with an HTTP submission endpoint.
//!
//! # Overview
//!
//! A job names a set of objects in an S3-compatible store, a destination
//! object, and optional notifications. The server:
//!
//! - **Accepts** jobs over HTTP, validates them and enqueues them unchanged
//! - **Polls** the queue, decoding each message into a job descriptor
//! - **Runs** each job: fetch object headers, download into a private
//!   workspace, archive with an external program, upload the archive,
//!   notify, and delete the message
//! - **Cleans up** the workspace on every path
//!
//! # Architecture
//!
//! Delivery, retry and dead-lettering belong to the queue. A failed job is
//! never deleted; it becomes visible again after the visibility timeout and
//! the queue's redrive policy caps how often that happens. The worker reads
//! that cap once at startup and refuses jobs that exceed it.
//!
//! ## Modules
//!
//! - **config**: environment configuration
//! - **features**: HTTP submission routes
//! - **middleware**: CORS and request tracing
//! - **queue**: queue client seam and SQS implementation
//! - **storage**: object store seam and S3 implementation
//! - **pipeline**: workspace, transfer, archive, upload, orchestrator, poller
//! - **notify**: notification registry with `http` and `email` handlers
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use zipper_server::{
//!     config::Config,
//!     notify::NotifierRegistry,
//!     pipeline::{ArchiveCommand, JobRunner, QueuePoller, WorkspaceManager},
//!     queue::{JobQueue, SqsQueue},
//!     storage::S3StoreFactory,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let queue: Arc<dyn JobQueue> = Arc::new(SqsQueue::new(&config.queue).await);
//!     let limits = queue.attributes().await?;
//!
//!     let runner = JobRunner::new(
//!         queue.clone(),
//!         Arc::new(S3StoreFactory::new(config.storage.clone())),
//!         WorkspaceManager::new(&config.worker.workspace_root),
//!         ArchiveCommand::zip(),
//!         NotifierRegistry::with_defaults(std::time::Duration::from_secs(30))?,
//!         limits,
//!     );
//!
//!     QueuePoller::new(queue, Arc::new(runner), &config.queue, 1).run().await?;
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod config;
pub mod error;
pub mod features;
pub mod middleware;
pub mod notify;
pub mod pipeline;
pub mod queue;
pub mod storage;

// Re-export commonly used types
pub use error::{AppError, CleanupError, JobError};
