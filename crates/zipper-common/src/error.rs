//! Error types for Zipper

use thiserror::Error;

/// Result type alias for Zipper operations
pub type Result<T> = std::result::Result<T, ZipperError>;

/// Main error type for Zipper
#[derive(Error, Debug)]
pub enum ZipperError {
    /// The payload is missing required fields or carries unusable references.
    /// Never retried: the same payload fails the same way on every delivery.
    #[error("Malformed job: {0}")]
    MalformedJob(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ZipperError {
    pub fn malformed(message: impl Into<String>) -> Self {
        ZipperError::MalformedJob(message.into())
    }

    /// True for errors that describe the payload itself rather than the worker.
    pub fn is_malformed(&self) -> bool {
        matches!(self, ZipperError::MalformedJob(_) | ZipperError::Serialization(_))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_display() {
        let err = ZipperError::malformed("files missing");
        assert_eq!(err.to_string(), "Malformed job: files missing");
        assert!(err.is_malformed());
    }

    #[test]
    fn test_serialization_is_malformed() {
        let err: ZipperError = serde_json::from_str::<serde_json::Value>("{not json")
            .map_err(ZipperError::from)
            .unwrap_err();
        assert!(err.is_malformed());
        assert!(err.to_string().starts_with("Serialization error"));
    }
}
