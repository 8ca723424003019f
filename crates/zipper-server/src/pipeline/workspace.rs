//! Per-job temporary workspace
//!
//! A [`Workspace`] is an exclusively owned directory under the configured
//! root. Downloaded files go into [`Workspace::files_dir`]; the archive is
//! written to a sibling directory so it never becomes a member of itself.
//!
//! [`Workspace::release`] removes the directory and reports failure. If a
//! workspace is dropped without being released (a panicking stage), the
//! directory is still removed, best-effort.

use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

use crate::error::CleanupError;

const FILES_DIR: &str = "files";
const OUTPUT_DIR: &str = "out";

#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    root: PathBuf,
}

impl WorkspaceManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create a uniquely named directory for one job.
    ///
    /// On error nothing is left behind.
    pub fn acquire(&self, job_id: &str) -> io::Result<Workspace> {
        std::fs::create_dir_all(&self.root)?;

        let dir = tempfile::Builder::new()
            .prefix(&format!("zipper-{}-", sanitize(job_id)))
            .tempdir_in(&self.root)?;

        // TempDir removes itself if either fails
        std::fs::create_dir(dir.path().join(FILES_DIR))?;
        std::fs::create_dir(dir.path().join(OUTPUT_DIR))?;

        debug!(path = %dir.path().display(), "Workspace acquired");
        Ok(Workspace { dir: Some(dir) })
    }
}

/// Keep only characters that are safe in a directory name.
fn sanitize(job_id: &str) -> String {
    job_id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .take(36)
        .collect()
}

#[derive(Debug)]
pub struct Workspace {
    dir: Option<TempDir>,
}

impl Workspace {
    pub fn path(&self) -> &Path {
        self.dir.as_ref().map(TempDir::path).unwrap_or_else(|| Path::new(""))
    }

    /// Directory the archive is built from.
    pub fn files_dir(&self) -> PathBuf {
        self.path().join(FILES_DIR)
    }

    /// Archive output path, outside [`Self::files_dir`].
    pub fn archive_path(&self, archive_name: &str) -> PathBuf {
        self.path().join(OUTPUT_DIR).join(archive_name)
    }

    /// Remove the directory and everything under it.
    pub fn release(mut self) -> Result<(), CleanupError> {
        let Some(dir) = self.dir.take() else {
            return Ok(());
        };

        let path = dir.path().to_path_buf();
        dir.close().map_err(|source| CleanupError {
            path: path.clone(),
            source,
        })?;

        debug!(path = %path.display(), "Workspace released");
        Ok(())
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            let path = dir.path().to_path_buf();
            if let Err(e) = dir.close() {
                warn!(path = %path.display(), "Failed to remove abandoned workspace: {}", e);
            }
        }
    }
}
