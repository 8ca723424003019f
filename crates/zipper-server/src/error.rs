//! Server-specific error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::path::PathBuf;
use thiserror::Error;
use zipper_common::ZipperError;

use crate::queue::QueueError;
use crate::storage::StorageError;

/// HTTP-facing error types for the submission API
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Payload too large: {size} bytes exceeds queue limit of {limit} bytes")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<ZipperError> for AppError {
    fn from(err: ZipperError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Validation(ref message) => (StatusCode::BAD_REQUEST, message.clone()),
            AppError::PayloadTooLarge { .. } => (StatusCode::PAYLOAD_TOO_LARGE, self.to_string()),
            AppError::Queue(ref e) => {
                tracing::error!("Queue error: {:?}", e);
                (StatusCode::BAD_GATEWAY, "Failed to enqueue job".to_string())
            },
            AppError::Internal(ref message) => {
                tracing::error!("Internal error: {}", message);
                (StatusCode::INTERNAL_SERVER_ERROR, message.clone())
            },
        };

        let body = Json(json!({
            "error": {
                "message": error_message,
                "status": status.as_u16(),
            }
        }));

        (status, body).into_response()
    }
}

/// Why a job stopped before completing.
///
/// Any of these aborts the remaining stages of that job only. The queue
/// message is left in place so the redrive policy decides what happens next.
#[derive(Error, Debug)]
pub enum JobError {
    #[error(transparent)]
    Malformed(#[from] ZipperError),

    #[error("Receive count {receive_count} exceeds retry ceiling {ceiling}")]
    RetryCeilingExceeded { receive_count: u32, ceiling: u32 },

    #[error("Header fetch failed for {object}: {source}")]
    HeaderFetch {
        object: String,
        #[source]
        source: StorageError,
    },

    #[error("Failed to prepare workspace: {0}")]
    Workspace(#[source] std::io::Error),

    #[error("Transfer failed for {object}: {source}")]
    Transfer {
        object: String,
        #[source]
        source: StorageError,
    },

    #[error("Archive process {}", describe_exit(.code))]
    ArchiveProcess { code: Option<i32>, stderr: String },

    #[error("Failed to start archive process '{program}': {source}")]
    ArchiveSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to measure archive {}: {source}", .path.display())]
    MeasureArchive {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Upload failed: {0}")]
    Upload(#[source] StorageError),

    #[error("Failed to acknowledge message: {0}")]
    Acknowledge(#[source] QueueError),
}

impl JobError {
    /// Name of the pipeline stage that raised the error.
    pub fn stage(&self) -> &'static str {
        match self {
            JobError::Malformed(_) => "decode",
            JobError::RetryCeilingExceeded { .. } => "validate_receive_count",
            JobError::HeaderFetch { .. } => "fetch_headers",
            JobError::Workspace(_) => "prepare_workspace",
            JobError::Transfer { .. } => "download_all",
            JobError::ArchiveProcess { .. } | JobError::ArchiveSpawn { .. } => "archive",
            JobError::MeasureArchive { .. } => "measure_archive",
            JobError::Upload(_) => "upload",
            JobError::Acknowledge(_) => "acknowledge_delete",
        }
    }
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exited with code {}", code),
        None => "terminated by signal".to_string(),
    }
}

/// Workspace removal failed. Fatal to the worker process.
#[derive(Error, Debug)]
#[error("Failed to remove workspace {}: {source}", .path.display())]
pub struct CleanupError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}
