use serde::{Deserialize, Serialize};
use std::env;

/// Object-store connection settings shared by every job.
///
/// Credentials and region are not here: each job brings its own.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Endpoint override for S3-compatible stores (MinIO, LocalStack)
    pub endpoint: Option<String>,
    pub path_style: bool,
}

impl StorageConfig {
    pub fn from_env() -> Self {
        Self {
            endpoint: env::var("ZIPPER_S3_ENDPOINT")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            path_style: env::var("ZIPPER_S3_PATH_STYLE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
        }
    }

    pub fn for_minio(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: Some(endpoint.into()),
            path_style: true,
        }
    }
}
