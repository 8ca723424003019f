//! Measure and upload stages

use std::path::Path;
use tracing::info;
use zipper_common::types::Destination;

use crate::error::JobError;
use crate::storage::ObjectStore;

/// Size of the produced archive on disk.
pub async fn measure_archive(path: &Path) -> Result<u64, JobError> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|source| JobError::MeasureArchive {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(metadata.len())
}

/// Stream the archive to its destination and return the object's location.
pub async fn upload_archive(
    store: &dyn ObjectStore,
    destination: &Destination,
    path: &Path,
    size: u64,
) -> Result<String, JobError> {
    info!(
        destination = %destination.object,
        acl = %destination.acl,
        storage_class = %destination.storage_class,
        bytes = size,
        "Uploading archive"
    );

    store
        .put_file(destination, path, size)
        .await
        .map_err(JobError::Upload)
}
