use async_trait::async_trait;
use tracing::info;
use zipper_common::types::NotificationSpec;

use super::{NotificationContext, Notifier, NotifyError, NotifyOutcome};

/// Email delivery is not wired to a mail service; notifications are accepted
/// and logged.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmailNotifier;

#[async_trait]
impl Notifier for EmailNotifier {
    async fn deliver(
        &self,
        spec: &NotificationSpec,
        context: &NotificationContext,
    ) -> Result<NotifyOutcome, NotifyError> {
        info!(
            to = spec.str_field("to").unwrap_or("<unset>"),
            job_id = %context.id,
            "Email notification accepted (not sent)"
        );
        Ok(NotifyOutcome::Accepted)
    }
}
