//! Archive stage: run the external archiver over the workspace

use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::JobError;

/// External archiving command.
///
/// Invoked as `<program> <args...> <archive path> .` with the working
/// directory set to the directory being archived, so member paths are
/// relative to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveCommand {
    program: String,
    args: Vec<String>,
}

impl ArchiveCommand {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// `zip -r -q -D`: recursive, quiet, no directory entries
    pub fn zip() -> Self {
        Self::new(
            crate::config::DEFAULT_ARCHIVE_PROGRAM,
            crate::config::DEFAULT_ARCHIVE_ARGS
                .split_whitespace()
                .map(str::to_string)
                .collect(),
        )
    }

    /// Archive everything under `source_dir` into `archive_path`.
    pub async fn run(&self, source_dir: &Path, archive_path: &Path) -> Result<(), JobError> {
        debug!(
            program = %self.program,
            args = ?self.args,
            source = %source_dir.display(),
            archive = %archive_path.display(),
            "Starting archive process"
        );

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(archive_path)
            .arg(".")
            .current_dir(source_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| JobError::ArchiveSpawn {
                program: self.program.clone(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if !stdout.trim().is_empty() {
            debug!(stdout = %stdout.trim(), "Archive process output");
        }

        if !output.status.success() {
            warn!(code = ?output.status.code(), stderr = %stderr, "Archive process failed");
            return Err(JobError::ArchiveProcess {
                code: output.status.code(),
                stderr,
            });
        }

        info!(archive = %archive_path.display(), "Archive created");
        Ok(())
    }
}
