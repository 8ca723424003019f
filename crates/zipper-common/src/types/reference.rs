//! Object-store references of the form `container/key/with/segments`

use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

use crate::error::{Result, ZipperError};

/// A single object reference split on its first path segment.
///
/// `local_name` is the key relative to its container with the directory
/// structure kept, so it is the path the object lands on inside a job
/// workspace and the member path it gets inside the archive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    pub container: String,
    pub key: String,
    pub fully_qualified_key: String,
    pub local_name: PathBuf,
}

impl ObjectRef {
    /// Parse `"bucket/path/to/key"` into its parts.
    ///
    /// Rejects references without a key, and keys whose segments would
    /// escape the workspace (`.` / `..`).
    pub fn parse(reference: &str) -> Result<Self> {
        let reference = reference.trim();
        let (container, key) = reference.split_once('/').ok_or_else(|| {
            ZipperError::malformed(format!("reference '{}' has no key", reference))
        })?;

        if container.is_empty() {
            return Err(ZipperError::malformed(format!(
                "reference '{}' has no container",
                reference
            )));
        }

        let local_name = local_name_for(key).map_err(|reason| {
            ZipperError::malformed(format!("reference '{}' {}", reference, reason))
        })?;

        Ok(Self {
            container: container.to_string(),
            key: key.to_string(),
            fully_qualified_key: reference.to_string(),
            local_name,
        })
    }

    /// Final path segment of the key, e.g. `out.zip` for `bucket/a/out.zip`.
    pub fn file_name(&self) -> &str {
        self.local_name
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(self.key.as_str())
    }
}

impl std::fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.fully_qualified_key)
    }
}

fn local_name_for(key: &str) -> std::result::Result<PathBuf, &'static str> {
    let mut local = PathBuf::new();

    for segment in key.split('/').filter(|s| !s.is_empty()) {
        match Path::new(segment).components().next() {
            Some(Component::Normal(_)) if segment != "." => local.push(segment),
            _ => return Err("has a key segment that escapes the workspace"),
        }
    }

    if local.as_os_str().is_empty() {
        return Err("has no key");
    }

    Ok(local)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flat_key() {
        let r = ObjectRef::parse("bucketA/x.txt").unwrap();
        assert_eq!(r.container, "bucketA");
        assert_eq!(r.key, "x.txt");
        assert_eq!(r.fully_qualified_key, "bucketA/x.txt");
        assert_eq!(r.local_name, PathBuf::from("x.txt"));
        assert_eq!(r.file_name(), "x.txt");
    }

    #[test]
    fn test_parse_splits_on_first_segment_only() {
        let r = ObjectRef::parse("bucket/reports/2024/q1.csv").unwrap();
        assert_eq!(r.container, "bucket");
        assert_eq!(r.key, "reports/2024/q1.csv");
        assert_eq!(r.local_name, PathBuf::from("reports/2024/q1.csv"));
        assert_eq!(r.file_name(), "q1.csv");
    }

    #[test]
    fn test_parse_collapses_empty_segments() {
        let r = ObjectRef::parse("bucket/a//b.txt").unwrap();
        assert_eq!(r.key, "a//b.txt");
        assert_eq!(r.local_name, PathBuf::from("a/b.txt"));
    }

    #[test]
    fn test_parse_rejects_missing_key() {
        assert!(ObjectRef::parse("bucket").is_err());
        assert!(ObjectRef::parse("bucket/").is_err());
        assert!(ObjectRef::parse("/x.txt").is_err());
    }

    #[test]
    fn test_parse_rejects_traversal() {
        let err = ObjectRef::parse("bucket/../etc/passwd").unwrap_err();
        assert!(err.to_string().contains("escapes the workspace"));
        assert!(ObjectRef::parse("bucket/a/./b").is_err());
    }
}
