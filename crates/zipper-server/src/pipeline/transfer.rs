//! Download stage: stream every source object into the workspace

use std::path::Path;
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info};
use zipper_common::types::ObjectRef;

use crate::error::JobError;
use crate::storage::{ObjectStore, StorageError};

/// Bytes moved by the download stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferReport {
    pub files: usize,
    pub bytes: u64,
}

/// Copy each file, in order, into `files_dir` under its local name.
///
/// The first failure stops the stage. Partially written files are left for
/// workspace cleanup.
pub async fn download_all(
    store: &dyn ObjectStore,
    files: &[ObjectRef],
    files_dir: &Path,
) -> Result<TransferReport, JobError> {
    let mut report = TransferReport::default();

    for (index, object) in files.iter().enumerate() {
        let bytes = download_one(store, object, files_dir)
            .await
            .map_err(|source| JobError::Transfer {
                object: object.to_string(),
                source,
            })?;

        report.files += 1;
        report.bytes += bytes;

        debug!(
            object = %object,
            bytes,
            total_bytes = report.bytes,
            "Downloaded file {} / {}",
            index + 1,
            files.len()
        );
    }

    info!(files = report.files, bytes = report.bytes, "All files downloaded");
    Ok(report)
}

async fn download_one(
    store: &dyn ObjectStore,
    object: &ObjectRef,
    files_dir: &Path,
) -> Result<u64, StorageError> {
    let target = files_dir.join(&object.local_name);
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).await?;
    }

    let mut reader = store.open_read(object).await?;
    let mut writer = BufWriter::new(File::create(&target).await?);

    let bytes = tokio::io::copy(&mut reader, &mut writer).await?;
    writer.flush().await?;

    Ok(bytes)
}
