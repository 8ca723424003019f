//! Object store access used by the job pipeline
//!
//! The pipeline only needs three operations: read an object's metadata,
//! stream an object's bytes, and stream a local file up as a new object.
//! [`ObjectStore`] is that seam; [`s3::S3Storage`] implements it against S3
//! and S3-compatible stores.
//!
//! Every job carries its own credentials, so stores are created per job
//! through an [`ObjectStoreFactory`] rather than shared.

use async_trait::async_trait;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::AsyncRead;
use zipper_common::types::{Credentials, Destination, ObjectRef};

pub mod config;
pub mod s3;

pub use s3::{S3Storage, S3StoreFactory};

/// Streaming reader over an object's body.
pub type ObjectReader = Pin<Box<dyn AsyncRead + Send>>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Object store request failed for {key}: {message}")]
    Request { key: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    pub fn request(key: impl Into<String>, message: impl Into<String>) -> Self {
        StorageError::Request {
            key: key.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMetadata {
    pub size: u64,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Metadata only; no body is transferred.
    async fn head(&self, object: &ObjectRef) -> Result<ObjectMetadata, StorageError>;

    /// Open a streamed read of the object's body.
    async fn open_read(&self, object: &ObjectRef) -> Result<ObjectReader, StorageError>;

    /// Stream `path` to `destination`, returning the object's location.
    async fn put_file(
        &self,
        destination: &Destination,
        path: &Path,
        size: u64,
    ) -> Result<String, StorageError>;
}

/// Builds an object store scoped to one job's credentials.
pub trait ObjectStoreFactory: Send + Sync {
    fn connect(&self, credentials: &Credentials) -> Arc<dyn ObjectStore>;
}
