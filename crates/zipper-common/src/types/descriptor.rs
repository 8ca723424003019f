//! Normalized job descriptor built from a payload plus queue delivery metadata

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use super::payload::{Credentials, JobPayload, NotificationSpec, DEFAULT_ACL, DEFAULT_STORAGE_CLASS};
use super::reference::ObjectRef;
use crate::error::{Result, ZipperError};

/// Metadata the queue attaches to a delivered message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryMetadata {
    pub message_id: String,
    pub receipt_handle: String,
    pub receive_count: u32,
}

impl DeliveryMetadata {
    pub fn new(
        message_id: impl Into<String>,
        receipt_handle: impl Into<String>,
        receive_count: u32,
    ) -> Self {
        Self {
            message_id: message_id.into(),
            receipt_handle: receipt_handle.into(),
            receive_count,
        }
    }
}

/// Where the finished archive goes and how it is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub object: ObjectRef,
    pub acl: String,
    pub storage_class: String,
}

/// Values produced while the pipeline runs.
///
/// Each one is set by exactly one stage; later writes are ignored and logged.
#[derive(Debug, Default)]
pub struct JobArtifacts {
    aggregate_size: OnceLock<u64>,
    archive_path: OnceLock<PathBuf>,
    archive_size: OnceLock<u64>,
    location: OnceLock<String>,
}

impl JobArtifacts {
    pub fn set_aggregate_size(&self, value: u64) {
        write_once(&self.aggregate_size, value, "aggregate_size");
    }

    pub fn aggregate_size(&self) -> Option<u64> {
        self.aggregate_size.get().copied()
    }

    pub fn set_archive_path(&self, value: PathBuf) {
        write_once(&self.archive_path, value, "archive_path");
    }

    pub fn archive_path(&self) -> Option<&Path> {
        self.archive_path.get().map(PathBuf::as_path)
    }

    pub fn set_archive_size(&self, value: u64) {
        write_once(&self.archive_size, value, "archive_size");
    }

    pub fn archive_size(&self) -> Option<u64> {
        self.archive_size.get().copied()
    }

    pub fn set_location(&self, value: String) {
        write_once(&self.location, value, "location");
    }

    pub fn location(&self) -> Option<&str> {
        self.location.get().map(String::as_str)
    }
}

fn write_once<T>(cell: &OnceLock<T>, value: T, field: &'static str) {
    if cell.set(value).is_err() {
        tracing::warn!(field, "Ignoring second write to job artifact");
    }
}

/// One archive job ready for execution.
#[derive(Debug)]
pub struct JobDescriptor {
    pub id: String,
    pub delete_token: String,
    pub receive_count: u32,
    pub credentials: Credentials,
    pub files: Vec<ObjectRef>,
    pub destination: Destination,
    pub notifications: Vec<NotificationSpec>,
    pub artifacts: JobArtifacts,
}

impl JobDescriptor {
    /// Decode a queue message body and build the descriptor.
    pub fn from_message_body(body: &str, delivery: DeliveryMetadata) -> Result<Self> {
        Self::from_payload(JobPayload::from_json(body)?, delivery)
    }

    /// Build a descriptor from a decoded payload.
    ///
    /// Pure transformation: no network or filesystem access. Two files that
    /// would land on the same workspace path are rejected.
    pub fn from_payload(payload: JobPayload, delivery: DeliveryMetadata) -> Result<Self> {
        payload.validate()?;

        let credentials = payload
            .credentials
            .ok_or_else(|| ZipperError::malformed("credentials missing"))?;

        let files = payload
            .files
            .iter()
            .map(|f| ObjectRef::parse(f))
            .collect::<Result<Vec<_>>>()?;

        check_workspace_paths(&files)?;

        let destination = Destination {
            object: ObjectRef::parse(payload.destination.as_deref().unwrap_or_default())?,
            acl: non_blank(payload.acl).unwrap_or_else(|| DEFAULT_ACL.to_string()),
            storage_class: non_blank(payload.storage_class)
                .unwrap_or_else(|| DEFAULT_STORAGE_CLASS.to_string()),
        };

        Ok(Self {
            id: delivery.message_id,
            delete_token: delivery.receipt_handle,
            receive_count: delivery.receive_count,
            credentials,
            files,
            destination,
            notifications: payload.notifications,
            artifacts: JobArtifacts::default(),
        })
    }

    /// File name of the archive, taken from the destination key.
    pub fn archive_name(&self) -> &str {
        self.destination.object.file_name()
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Every file must map to its own workspace path, and no file's path may be
/// a directory another file sits under (`a` and `a/b`).
fn check_workspace_paths(files: &[ObjectRef]) -> Result<()> {
    let mut seen = HashSet::new();
    for file in files {
        if !seen.insert(file.local_name.as_path()) {
            return Err(ZipperError::malformed(format!(
                "files collide on workspace path '{}'",
                file.local_name.display()
            )));
        }
    }

    for file in files {
        if let Some(parent) = file
            .local_name
            .ancestors()
            .skip(1)
            .find(|ancestor| seen.contains(ancestor))
        {
            return Err(ZipperError::malformed(format!(
                "files collide on workspace path '{}': '{}' is both a file and a directory",
                file.local_name.display(),
                parent.display()
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(files: serde_json::Value) -> String {
        json!({
            "credentials": {"accessKeyId": "id", "secretAccessKey": "secret", "region": "us-east-1"},
            "files": files,
            "destination": "bucketB/archives/out.zip",
            "notifications": [{"type": "http", "url": "https://h/{:id}"}]
        })
        .to_string()
    }

    fn delivery() -> DeliveryMetadata {
        DeliveryMetadata::new("msg-1", "receipt-1", 2)
    }

    #[test]
    fn test_from_message_body() {
        let job = JobDescriptor::from_message_body(
            &body(json!(["bucketA/x.txt", "bucketA/y.txt"])),
            delivery(),
        )
        .unwrap();

        assert_eq!(job.id, "msg-1");
        assert_eq!(job.delete_token, "receipt-1");
        assert_eq!(job.receive_count, 2);
        assert_eq!(job.files.len(), 2);
        assert_eq!(job.files[1].key, "y.txt");
        assert_eq!(job.destination.object.container, "bucketB");
        assert_eq!(job.destination.object.key, "archives/out.zip");
        assert_eq!(job.destination.acl, "private");
        assert_eq!(job.destination.storage_class, "STANDARD");
        assert_eq!(job.archive_name(), "out.zip");
        assert_eq!(job.notifications.len(), 1);
    }

    #[test]
    fn test_acl_and_storage_class_overrides() {
        let raw = json!({
            "credentials": {"accessKeyId": "id", "secretAccessKey": "secret", "region": "r"},
            "files": ["a/b"],
            "destination": "c/d.zip",
            "acl": "public-read",
            "storageClass": "STANDARD_IA"
        });
        let job = JobDescriptor::from_message_body(&raw.to_string(), delivery()).unwrap();
        assert_eq!(job.destination.acl, "public-read");
        assert_eq!(job.destination.storage_class, "STANDARD_IA");
    }

    #[test]
    fn test_same_key_in_two_containers_collides() {
        let err = JobDescriptor::from_message_body(
            &body(json!(["bucketA/x.txt", "bucketC/x.txt"])),
            delivery(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("collide"));
    }

    #[test]
    fn test_file_and_directory_of_same_name_collide() {
        for files in [json!(["bucketA/a", "bucketA/a/b"]), json!(["bucketA/a/b", "bucketA/a"])] {
            let err = JobDescriptor::from_message_body(&body(files), delivery()).unwrap_err();
            assert!(err.is_malformed());
            assert!(err.to_string().contains("both a file and a directory"));
        }
    }

    #[test]
    fn test_deep_prefix_collides_across_containers() {
        let err = JobDescriptor::from_message_body(
            &body(json!(["bucketA/reports/2024/q1.csv", "bucketC/reports"])),
            delivery(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("'reports'"));
    }

    #[test]
    fn test_shared_directory_prefix_is_allowed() {
        let job = JobDescriptor::from_message_body(
            &body(json!(["bucketA/a/b", "bucketA/a/c", "bucketA/ab"])),
            delivery(),
        )
        .unwrap();
        assert_eq!(job.files.len(), 3);
    }

    #[test]
    fn test_same_basename_in_different_directories_is_allowed() {
        let job = JobDescriptor::from_message_body(
            &body(json!(["bucketA/a/x.txt", "bucketA/b/x.txt"])),
            delivery(),
        )
        .unwrap();
        assert_ne!(job.files[0].local_name, job.files[1].local_name);
    }

    #[test]
    fn test_invalid_json_is_malformed() {
        let err = JobDescriptor::from_message_body("not json", delivery()).unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn test_artifacts_are_write_once() {
        let artifacts = JobArtifacts::default();
        assert_eq!(artifacts.aggregate_size(), None);

        artifacts.set_aggregate_size(10);
        artifacts.set_aggregate_size(20);
        assert_eq!(artifacts.aggregate_size(), Some(10));

        artifacts.set_location("https://first".to_string());
        artifacts.set_location("https://second".to_string());
        assert_eq!(artifacts.location(), Some("https://first"));

        artifacts.set_archive_path(PathBuf::from("/tmp/a.zip"));
        assert_eq!(artifacts.archive_path(), Some(Path::new("/tmp/a.zip")));
    }
}
