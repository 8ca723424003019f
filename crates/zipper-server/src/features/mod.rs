//! Feature modules implementing the submission API
//!
//! Each feature is a vertical slice with its own commands, queries and
//! routes:
//!
//! - `commands/` - write operations (enqueue)
//! - `queries/` - read operations
//! - `routes.rs` - HTTP route definitions
//!
//! # Features
//!
//! - **jobs**: job submission and the health probe

pub mod jobs;

use axum::{extract::DefaultBodyLimit, Router};
use std::sync::Arc;

use crate::queue::{JobQueue, QueueAttributes};

/// Shared state for all feature routes
#[derive(Clone)]
pub struct FeatureState {
    /// Queue new jobs are sent to
    pub queue: Arc<dyn JobQueue>,
    /// Limits read from the queue at startup
    pub limits: Arc<QueueAttributes>,
}

/// Creates the API router with all feature routes mounted at the root
///
/// Request bodies larger than `body_limit` bytes are rejected with 413 before
/// reaching a handler.
pub fn router(state: FeatureState, body_limit: usize) -> Router<()> {
    Router::new()
        .merge(jobs::jobs_routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
