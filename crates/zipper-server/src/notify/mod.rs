//! Job outcome notifications
//!
//! Each notification in a job names a `type`; the [`NotifierRegistry`] maps
//! that type to a [`Notifier`]. Built in:
//!
//! - `http`: request to a URL with a JSON body describing the archive
//! - `email`: accepted and logged, nothing is sent
//!
//! Notifications for one job are delivered in order. The first failure stops
//! the rest; unknown types are skipped with a warning.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};
use zipper_common::types::NotificationSpec;

pub mod email;
pub mod http;

pub use email::EmailNotifier;
pub use http::HttpNotifier;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Notification transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),

    #[error("{kind} notification missing field '{field}'")]
    MissingField { kind: String, field: &'static str },
}

/// What the notification reports about the job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationContext {
    pub id: String,
    pub status: &'static str,
    pub location: String,
    pub size: u64,
}

impl NotificationContext {
    pub fn success(id: impl Into<String>, location: impl Into<String>, size: u64) -> Self {
        Self {
            id: id.into(),
            status: "success",
            location: location.into(),
            size,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyOutcome {
    /// Request completed with this status code; any code counts as delivered
    HttpStatus(u16),
    /// Accepted without sending anything
    Accepted,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(
        &self,
        spec: &NotificationSpec,
        context: &NotificationContext,
    ) -> Result<NotifyOutcome, NotifyError>;
}

/// Result of delivering one job's notifications.
#[derive(Debug, Default)]
pub struct DispatchReport {
    pub delivered: usize,
    pub skipped: usize,
    /// Type and error of the notification that stopped delivery
    pub failure: Option<(String, NotifyError)>,
}

impl DispatchReport {
    pub fn is_complete(&self) -> bool {
        self.failure.is_none()
    }
}

#[derive(Clone, Default)]
pub struct NotifierRegistry {
    handlers: HashMap<String, Arc<dyn Notifier>>,
}

impl NotifierRegistry {
    /// Empty registry; every notification type is unknown.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the `http` and `email` handlers.
    pub fn with_defaults(timeout: Duration) -> Result<Self, NotifyError> {
        let mut registry = Self::new();
        registry.register("http", Arc::new(HttpNotifier::new(timeout)?));
        registry.register("email", Arc::new(EmailNotifier));
        Ok(registry)
    }

    pub fn register(&mut self, kind: impl Into<String>, notifier: Arc<dyn Notifier>) {
        self.handlers.insert(kind.into(), notifier);
    }

    pub fn get(&self, kind: &str) -> Option<&Arc<dyn Notifier>> {
        self.handlers.get(kind)
    }

    pub async fn dispatch(
        &self,
        specs: &[NotificationSpec],
        context: &NotificationContext,
    ) -> DispatchReport {
        let mut report = DispatchReport::default();

        for spec in specs {
            let Some(notifier) = self.get(&spec.kind) else {
                warn!(kind = %spec.kind, "Skipping unknown notification type");
                report.skipped += 1;
                continue;
            };

            match notifier.deliver(spec, context).await {
                Ok(outcome) => {
                    debug!(kind = %spec.kind, outcome = ?outcome, "Notification delivered");
                    report.delivered += 1;
                },
                Err(e) => {
                    warn!(kind = %spec.kind, "Notification failed, skipping the rest: {}", e);
                    report.failure = Some((spec.kind.clone(), e));
                    break;
                },
            }
        }

        if !specs.is_empty() {
            info!(
                delivered = report.delivered,
                skipped = report.skipped,
                failed = report.failure.is_some(),
                "Notifications dispatched"
            );
        }

        report
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording {
        seen: Mutex<Vec<String>>,
        fail_on: Option<&'static str>,
    }

    #[async_trait]
    impl Notifier for Recording {
        async fn deliver(
            &self,
            spec: &NotificationSpec,
            _context: &NotificationContext,
        ) -> Result<NotifyOutcome, NotifyError> {
            let name = spec.str_field("name").unwrap_or_default().to_string();
            self.seen.lock().unwrap().push(name.clone());
            if self.fail_on == Some(name.as_str()) {
                return Err(NotifyError::InvalidMethod("BOGUS".to_string()));
            }
            Ok(NotifyOutcome::Accepted)
        }
    }

    fn context() -> NotificationContext {
        NotificationContext::success("job-1", "https://b.s3.us-east-1.amazonaws.com/out.zip", 10)
    }

    fn spec(name: &str) -> NotificationSpec {
        NotificationSpec::new("rec").with_field("name", name)
    }

    #[tokio::test]
    async fn test_dispatch_in_order() {
        let recording = Arc::new(Recording::default());
        let mut registry = NotifierRegistry::new();
        registry.register("rec", recording.clone());

        let report = registry.dispatch(&[spec("a"), spec("b")], &context()).await;

        assert_eq!(report.delivered, 2);
        assert!(report.is_complete());
        assert_eq!(*recording.seen.lock().unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_first_failure_stops_dispatch() {
        let recording = Arc::new(Recording {
            fail_on: Some("a"),
            ..Default::default()
        });
        let mut registry = NotifierRegistry::new();
        registry.register("rec", recording.clone());

        let report = registry.dispatch(&[spec("a"), spec("b")], &context()).await;

        assert_eq!(report.delivered, 0);
        assert_eq!(report.failure.as_ref().map(|(kind, _)| kind.as_str()), Some("rec"));
        assert_eq!(*recording.seen.lock().unwrap(), vec!["a"]);
    }

    #[tokio::test]
    async fn test_unknown_type_is_skipped() {
        let recording = Arc::new(Recording::default());
        let mut registry = NotifierRegistry::new();
        registry.register("rec", recording.clone());

        let specs = [NotificationSpec::new("pager"), spec("a")];
        let report = registry.dispatch(&specs, &context()).await;

        assert_eq!(report.skipped, 1);
        assert_eq!(report.delivered, 1);
    }

    #[tokio::test]
    async fn test_email_stub_succeeds() {
        let registry = NotifierRegistry::with_defaults(Duration::from_secs(1)).unwrap();
        let specs = [NotificationSpec::new("email").with_field("to", "ops@example.com")];

        let report = registry.dispatch(&specs, &context()).await;
        assert_eq!(report.delivered, 1);
    }

    #[test]
    fn test_context_serializes_fixed_schema() {
        let json = serde_json::to_value(context()).unwrap();
        assert_eq!(json["id"], "job-1");
        assert_eq!(json["status"], "success");
        assert_eq!(json["size"], 10);
        assert!(json["location"].as_str().unwrap().ends_with("out.zip"));
    }
}
